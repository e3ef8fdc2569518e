//! Leitner box maintenance.
//!
//! Boxes 0..=7 with review intervals doubling per box. Session outcomes
//! promote or demote one box; the recalibration pass demotes stale boxes
//! that sat unreviewed for a full extra interval.

use chrono::{DateTime, Utc};

use crate::types::MAX_BOX_LEVEL;

pub fn promote(box_level: u8) -> u8 {
    (box_level + 1).min(MAX_BOX_LEVEL)
}

pub fn demote(box_level: u8) -> u8 {
    box_level.saturating_sub(1)
}

pub fn apply_outcome(box_level: u8, success: bool) -> u8 {
    if success {
        promote(box_level)
    } else {
        demote(box_level)
    }
}

/// Days until a box is due again: 1, 2, 4, ... 128.
pub fn review_interval_days(box_level: u8) -> i64 {
    1_i64 << box_level.min(MAX_BOX_LEVEL)
}

/// Time-decay demotion: each time a box goes a full interval past due, it
/// drops one level. Box 0 never decays further; a problem never attempted
/// has nothing to decay from.
pub fn recalibrate_box_level(
    box_level: u8,
    last_attempt_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> u8 {
    let Some(last) = last_attempt_date else {
        return box_level;
    };
    let elapsed = (now - last).num_days().max(0);
    let interval = review_interval_days(box_level);
    let missed_intervals = (elapsed / interval - 1).max(0).min(i64::from(MAX_BOX_LEVEL));
    box_level.saturating_sub(missed_intervals as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn promotion_caps_at_top_box() {
        assert_eq!(promote(0), 1);
        assert_eq!(promote(7), 7);
    }

    #[test]
    fn demotion_floors_at_zero() {
        assert_eq!(demote(3), 2);
        assert_eq!(demote(0), 0);
    }

    #[test]
    fn intervals_double_per_box() {
        assert_eq!(review_interval_days(0), 1);
        assert_eq!(review_interval_days(3), 8);
        assert_eq!(review_interval_days(7), 128);
    }

    #[test]
    fn fresh_reviews_do_not_decay() {
        let now = Utc::now();
        assert_eq!(recalibrate_box_level(4, Some(now - Duration::days(10)), now), 4);
    }

    #[test]
    fn stale_boxes_drop_one_level_per_missed_interval() {
        let now = Utc::now();
        // Box 3 is due every 8 days; 16 days elapsed is one full extra
        // interval, so it drops once (to box 2, due every 4 days, not yet a
        // further full interval behind).
        assert_eq!(recalibrate_box_level(3, Some(now - Duration::days(16)), now), 2);
        // A long absence walks the box down several levels.
        assert_eq!(recalibrate_box_level(3, Some(now - Duration::days(60)), now), 0);
    }

    #[test]
    fn never_attempted_problems_keep_their_box() {
        assert_eq!(recalibrate_box_level(2, None, Utc::now()), 2);
    }
}
