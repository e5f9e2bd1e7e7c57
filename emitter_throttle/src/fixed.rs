//! Fixed throttle
//!
//! This throttle pauses for the same duration on every call. It keeps no
//! history: a slow request does not shorten the next pause, a failed one does
//! not lengthen it.

use tokio::time::Duration;

use super::{Clock, RealClock};

#[derive(Debug)]
/// A throttle type.
///
/// This throttle is fixed in that it always waits a constant delay and does
/// not inspect the target in any way.
pub struct Fixed<C = RealClock> {
    delay: Duration,
    /// The clock that `Fixed` will use.
    clock: C,
}

impl<C> Fixed<C>
where
    C: Clock + Send + Sync,
{
    pub(crate) fn with_clock(delay: Duration, clock: C) -> Self {
        Self { delay, clock }
    }

    /// The pause taken on every call to `wait`.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    #[inline]
    pub(crate) async fn wait(&mut self) {
        if self.delay.is_zero() {
            return;
        }
        self.clock.wait(self.delay).await;
    }
}

#[cfg(test)]
mod test {
    use tokio::time::Duration;

    use crate::{Config, Throttle, test::RecordingClock};

    #[tokio::test]
    async fn every_wait_is_the_configured_delay() {
        let clock = RecordingClock::default();
        let mut throttle =
            Throttle::with_clock(Config::fixed(Duration::from_micros(300)), clock.clone());
        for _ in 0..50 {
            throttle.wait().await;
        }
        let waits = clock.waits.lock().expect("lock poisoned");
        assert_eq!(waits.len(), 50);
        assert!(waits.iter().all(|w| *w == Duration::from_micros(300)));
    }

    #[tokio::test]
    async fn zero_delay_does_not_touch_the_clock() {
        let clock = RecordingClock::default();
        let mut throttle = Throttle::with_clock(Config::Fixed { delay_micros: 0 }, clock.clone());
        throttle.wait().await;
        assert!(clock.waits.lock().expect("lock poisoned").is_empty());
    }

    #[test]
    fn delay_is_exposed() {
        let throttle = Throttle::new_with_config(Config::fixed(Duration::from_millis(30)));
        let Throttle::Fixed(inner) = throttle else {
            panic!("expected fixed throttle");
        };
        assert_eq!(inner.delay(), Duration::from_millis(30));
    }
}
