//! The emitter throttle mechanism
//!
//! This library paces the emitter. Pacing is deliberately naive: a fixed pause
//! before every request, independent of how long requests take or whether they
//! succeed.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    task,
    time::{self, Duration},
};

pub mod fixed;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
/// Configuration of the throttle.
pub enum Config {
    /// Pause for `delay_micros` before every request.
    Fixed {
        /// The pause, in microseconds
        delay_micros: u64,
    },
    /// Never pause, produce as fast as the target accepts.
    AllOut,
}

impl Config {
    /// A fixed throttle pausing for `delay`, saturating at `u64::MAX`
    /// microseconds.
    #[must_use]
    pub fn fixed(delay: Duration) -> Self {
        Config::Fixed {
            delay_micros: u64::try_from(delay.as_micros()).unwrap_or(u64::MAX),
        }
    }
}

#[async_trait]
/// The `Clock` used for every throttle
pub trait Clock {
    /// Wait for `duration` to elapse
    async fn wait(&self, duration: Duration);
}

/// Granularity of the tokio timer wheel. Shorter sleeps are rounded up to it.
const TIMER_RESOLUTION: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, Default)]
/// A clock that operates with respect to real-clock time.
///
/// Waits shorter than a millisecond are served by a thread sleep on the
/// blocking pool, the tokio timer would stretch them to a full millisecond.
pub struct RealClock;

#[async_trait]
impl Clock for RealClock {
    async fn wait(&self, duration: Duration) {
        if duration >= TIMER_RESOLUTION {
            time::sleep(duration).await;
            return;
        }
        // A join error means the runtime is shutting down, the timer still
        // honours the pause.
        if task::spawn_blocking(move || std::thread::sleep(duration))
            .await
            .is_err()
        {
            time::sleep(duration).await;
        }
    }
}

/// The throttle mechanism
#[derive(Debug)]
pub enum Throttle<C = RealClock> {
    /// Pause a fixed amount of time before every unit of work
    Fixed(fixed::Fixed<C>),
    /// Never pause
    AllOut,
}

impl Throttle<RealClock> {
    /// Create a new instance of `Throttle` with a real-time clock
    #[must_use]
    pub fn new_with_config(config: Config) -> Self {
        Self::with_clock(config, RealClock)
    }
}

impl<C> Throttle<C>
where
    C: Clock + Sync + Send,
{
    /// Create a new instance of `Throttle` driven by `clock`
    #[must_use]
    pub fn with_clock(config: Config, clock: C) -> Self {
        match config {
            Config::Fixed { delay_micros } => {
                Throttle::Fixed(fixed::Fixed::with_clock(Duration::from_micros(delay_micros), clock))
            }
            Config::AllOut => Throttle::AllOut,
        }
    }

    /// Wait until the next unit of work may proceed.
    #[inline]
    pub async fn wait(&mut self) {
        match self {
            Throttle::Fixed(inner) => inner.wait().await,
            Throttle::AllOut => (),
        }
    }
}
