//! Shard filter, with the original implementation's shard-0 bug fixed
//! (spec REDESIGN FLAG): gating is strictly `modulo > 0`, so `shard == 0`
//! is a valid, active selector whenever a positive modulo is configured.

use crate::model::RawEvent;

#[derive(Debug, Clone, Copy)]
pub struct ShardFilter {
    modulo: i64,
    shard: i64,
}

impl ShardFilter {
    /// Returns `None` when the filter is inactive (`modulo <= 0`), in which
    /// case the caller should keep every event unfiltered.
    pub fn new(modulo: i64, shard: i64) -> Option<Self> {
        if modulo > 0 {
            Some(Self { modulo, shard })
        } else {
            None
        }
    }

    /// An event is admitted when it carries `time_us` and
    /// `time_us mod modulo == shard`. Events without `time_us` are dropped
    /// while a filter is active.
    pub fn admits(&self, event: &RawEvent) -> bool {
        match event.time_us() {
            Some(t) => t.rem_euclid(self.modulo) == self.shard,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_with_time(t: i64) -> RawEvent {
        RawEvent(json!({ "did": "d", "time_us": t, "commit": {} }))
    }

    fn event_without_time() -> RawEvent {
        RawEvent(json!({ "did": "d", "commit": {} }))
    }

    #[test]
    fn inactive_when_modulo_is_zero_or_negative() {
        assert!(ShardFilter::new(0, 0).is_none());
        assert!(ShardFilter::new(-1, 0).is_none());
    }

    #[test]
    fn shard_zero_is_a_valid_active_selector() {
        // This is the bug the original implementation had: shard == 0 must
        // still filter, not be treated as "no filter".
        let f = ShardFilter::new(4, 0).unwrap();
        assert!(f.admits(&event_with_time(8)));
        assert!(!f.admits(&event_with_time(9)));
        assert!(!f.admits(&event_with_time(10)));
    }

    #[test]
    fn nonzero_shard_selects_its_residue_class() {
        let f = ShardFilter::new(4, 2).unwrap();
        assert!(f.admits(&event_with_time(6)));
        assert!(!f.admits(&event_with_time(7)));
    }

    #[test]
    fn events_without_time_us_are_dropped_while_filter_active() {
        let f = ShardFilter::new(4, 0).unwrap();
        assert!(!f.admits(&event_without_time()));
    }
}
