//! Simulated application event kinds.

use std::fmt;

use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use serde::{Deserialize, Serialize};

/// The kind of application event a record claims to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A post was created
    #[serde(rename = "event_post_create")]
    PostCreate,
    /// A post was deleted
    #[serde(rename = "event_post_delete")]
    PostDelete,
    /// A post was flagged
    #[serde(rename = "event_post_flag")]
    PostFlag,
    /// The active channel changed
    #[serde(rename = "event_channel_change")]
    ChannelChange,
    /// The right hand side panel was closed
    #[serde(rename = "event_rhs_close")]
    RhsClose,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 5] = [
        EventKind::PostCreate,
        EventKind::PostDelete,
        EventKind::PostFlag,
        EventKind::ChannelChange,
        EventKind::RhsClose,
    ];

    /// The literal that appears on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::PostCreate => "event_post_create",
            EventKind::PostDelete => "event_post_delete",
            EventKind::PostFlag => "event_post_flag",
            EventKind::ChannelChange => "event_channel_change",
            EventKind::RhsClose => "event_rhs_close",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Distribution<EventKind> for StandardUniform {
    fn sample<R>(&self, rng: &mut R) -> EventKind
    where
        R: Rng + ?Sized,
    {
        EventKind::ALL[rng.random_range(0..EventKind::ALL.len())]
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng, rngs::SmallRng};

    use super::EventKind;

    #[test]
    fn serializes_as_wire_literal() {
        for kind in EventKind::ALL {
            let encoded = serde_json::to_string(&kind).expect("failed to serialize");
            assert_eq!(encoded, format!("\"{}\"", kind.as_str()));
            let decoded: EventKind =
                serde_json::from_str(&encoded).expect("failed to deserialize");
            assert_eq!(decoded, kind);
        }
    }

    #[test]
    fn every_kind_is_eventually_drawn() {
        let mut rng = SmallRng::seed_from_u64(19);
        let mut seen = [false; 5];
        for _ in 0..1_000 {
            let kind: EventKind = rng.random();
            let idx = EventKind::ALL
                .iter()
                .position(|k| *k == kind)
                .expect("kind missing from ALL");
            seen[idx] = true;
        }
        assert!(seen.iter().all(|s| *s), "{seen:?}");
    }

    #[test]
    fn kinds_are_drawn_uniformly() {
        const DRAWS: usize = 5_000;
        let mut rng = SmallRng::seed_from_u64(23);
        let mut counts = [0_usize; 5];
        for _ in 0..DRAWS {
            let kind: EventKind = rng.random();
            let idx = EventKind::ALL
                .iter()
                .position(|k| *k == kind)
                .expect("kind missing from ALL");
            counts[idx] += 1;
        }
        // Expected 1000 per kind with a standard deviation near 28.
        let expected = DRAWS / EventKind::ALL.len();
        for count in counts {
            assert!(count.abs_diff(expected) < 150, "{counts:?}");
        }
    }

    proptest! {
        #[test]
        fn drawn_kind_is_one_of_five_literals(seed: u64) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let kind: EventKind = rng.random();
            prop_assert!([
                "event_post_create",
                "event_post_delete",
                "event_post_flag",
                "event_channel_change",
                "event_rhs_close",
            ]
            .contains(&kind.as_str()));
        }
    }
}
