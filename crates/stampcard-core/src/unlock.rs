//! Unlock rule evaluation.
//!
//! Each condition turns one metric into slots:
//! - `threshold > 0` → `floor(total / threshold)` slots
//! - anything else → 0 slots
//!
//! Conditions are summed independently, so the result does not depend on
//! their order.

use crate::error::{CoreError, Result};
use crate::metric::MetricKind;
use crate::progress::ProgressSummary;

/// Threshold of the default hours condition.
pub const DEFAULT_HOURS_THRESHOLD: f64 = 1.0;

/// Threshold of the default pages condition.
pub const DEFAULT_PAGES_THRESHOLD: f64 = 10.0;

/// One unlock rule: every `threshold` units of `metric` earn one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnlockCondition {
    #[cfg_attr(feature = "serde", serde(rename = "type", alias = "metric"))]
    pub metric: MetricKind,
    #[cfg_attr(feature = "serde", serde(rename = "value", alias = "threshold"))]
    pub threshold: f64,
}

impl UnlockCondition {
    /// Create a condition.
    pub const fn new(metric: MetricKind, threshold: f64) -> Self {
        Self { metric, threshold }
    }

    /// Whether this condition can unlock anything at all.
    pub fn is_valid(&self) -> bool {
        self.threshold.is_finite() && self.threshold > 0.0
    }

    /// Slots this condition alone unlocks for `summary`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stampcard_core::{MetricKind, ProgressSummary, UnlockCondition};
    ///
    /// let summary = ProgressSummary { total_hours: 3.5, ..ProgressSummary::zero() };
    /// assert_eq!(UnlockCondition::new(MetricKind::Hours, 1.0).slots_earned(&summary), 3);
    /// assert_eq!(UnlockCondition::new(MetricKind::Hours, 0.0).slots_earned(&summary), 0);
    /// ```
    pub fn slots_earned(&self, summary: &ProgressSummary) -> u64 {
        if !self.is_valid() {
            return 0;
        }
        let total = summary.get(self.metric);
        if !total.is_finite() || total <= 0.0 {
            return 0;
        }
        // `as` saturates at u64::MAX for huge quotients
        (total / self.threshold).floor() as u64
    }

    /// Amount of the metric still missing before this condition's next slot.
    ///
    /// `None` for conditions that can never unlock.
    pub fn remaining(&self, summary: &ProgressSummary) -> Option<f64> {
        if !self.is_valid() {
            return None;
        }
        let total = summary.get(self.metric).max(0.0);
        let progress = total % self.threshold;
        Some(self.threshold - progress)
    }
}

/// Total unlocked slots for a summary under a list of conditions.
///
/// # Examples
///
/// ```
/// use stampcard_core::{unlocked_count, MetricKind, ProgressSummary, UnlockCondition};
///
/// let conditions = [
///     UnlockCondition::new(MetricKind::Hours, 1.0),
///     UnlockCondition::new(MetricKind::Pages, 10.0),
/// ];
/// let summary = ProgressSummary { total_hours: 3.5, total_pages: 25.0, total_questions: 0.0 };
/// assert_eq!(unlocked_count(&summary, &conditions), 5);
/// ```
pub fn unlocked_count(summary: &ProgressSummary, conditions: &[UnlockCondition]) -> u64 {
    conditions
        .iter()
        .fold(0u64, |acc, c| acc.saturating_add(c.slots_earned(summary)))
}

/// Unlocked slots that do not hold a stamp yet.
pub fn unstamped_count(unlocked: u64, stamped: usize) -> u64 {
    unlocked.saturating_sub(stamped as u64)
}

/// Conditions given to every new user.
pub fn default_conditions() -> Vec<UnlockCondition> {
    vec![
        UnlockCondition::new(MetricKind::Hours, DEFAULT_HOURS_THRESHOLD),
        UnlockCondition::new(MetricKind::Pages, DEFAULT_PAGES_THRESHOLD),
    ]
}

/// Reject condition lists containing a non-positive or non-finite threshold.
pub fn validate_conditions(conditions: &[UnlockCondition]) -> Result<()> {
    match conditions.iter().find(|c| !c.is_valid()) {
        Some(bad) => Err(CoreError::InvalidThreshold {
            metric: bad.metric.as_str(),
            threshold: bad.threshold,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(hours: f64, pages: f64, questions: f64) -> ProgressSummary {
        ProgressSummary {
            total_hours: hours,
            total_pages: pages,
            total_questions: questions,
        }
    }

    #[test]
    fn default_scenario() {
        assert_eq!(unlocked_count(&summary(3.5, 25.0, 0.0), &default_conditions()), 5);
    }

    #[test]
    fn empty_conditions_unlock_nothing() {
        assert_eq!(unlocked_count(&summary(100.0, 100.0, 100.0), &[]), 0);
    }

    #[test]
    fn same_metric_conditions_add_up() {
        let conditions = [
            UnlockCondition::new(MetricKind::Hours, 1.0),
            UnlockCondition::new(MetricKind::Hours, 5.0),
        ];
        assert_eq!(unlocked_count(&summary(10.0, 0.0, 0.0), &conditions), 12);
    }

    #[test]
    fn degenerate_thresholds_contribute_nothing() {
        let s = summary(7.0, 7.0, 7.0);
        for threshold in [0.0, -1.0, f64::NAN, f64::NEG_INFINITY] {
            let c = UnlockCondition::new(MetricKind::Hours, threshold);
            assert_eq!(c.slots_earned(&s), 0, "threshold {}", threshold);
        }
        // an infinite threshold is never reached
        assert_eq!(
            UnlockCondition::new(MetricKind::Hours, f64::INFINITY).slots_earned(&s),
            0
        );
    }

    #[test]
    fn huge_quotient_saturates() {
        let conditions = [
            UnlockCondition::new(MetricKind::Pages, f64::MIN_POSITIVE),
            UnlockCondition::new(MetricKind::Pages, f64::MIN_POSITIVE),
        ];
        assert_eq!(unlocked_count(&summary(0.0, 1.0e10, 0.0), &conditions), u64::MAX);
    }

    #[test]
    fn remaining_until_next_slot() {
        let c = UnlockCondition::new(MetricKind::Pages, 10.0);
        assert_eq!(c.remaining(&summary(0.0, 25.0, 0.0)), Some(5.0));
        assert_eq!(c.remaining(&summary(0.0, 0.0, 0.0)), Some(10.0));
        assert_eq!(UnlockCondition::new(MetricKind::Pages, 0.0).remaining(&summary(0.0, 3.0, 0.0)), None);
    }

    #[test]
    fn unstamped_never_negative() {
        assert_eq!(unstamped_count(5, 2), 3);
        assert_eq!(unstamped_count(2, 5), 0);
    }

    #[test]
    fn validation() {
        assert!(validate_conditions(&default_conditions()).is_ok());
        assert!(validate_conditions(&[]).is_ok());
        let err = validate_conditions(&[UnlockCondition::new(MetricKind::Questions, 0.0)]).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidThreshold {
                metric: "questions",
                threshold: 0.0
            }
        );
    }
}
