//! Progress aggregation.
//!
//! A [`ProgressSummary`] holds one running total per metric. Records change
//! it only through signed [`Delta`]s: `+amount` when a record is created,
//! `-amount` when it is deleted. Totals never drop below zero.

use crate::error::{CoreError, Result};
use crate::metric::MetricKind;

/// Per-user running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ProgressSummary {
    pub total_hours: f64,
    pub total_pages: f64,
    pub total_questions: f64,
}

/// A signed change to one metric total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    pub metric: MetricKind,
    pub amount: f64,
}

impl Delta {
    /// Contribution of a newly created record.
    ///
    /// The amount must be positive and finite.
    pub fn creation(metric: MetricKind, amount: f64) -> Result<Self> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CoreError::InvalidAmount(amount));
        }
        Ok(Self { metric, amount })
    }

    /// Reversal for a deleted record.
    ///
    /// Returns `None` when the stored amount is absent or not a finite
    /// number, so a malformed record never corrupts the summary.
    pub fn reversal(metric: MetricKind, amount: Option<f64>) -> Option<Self> {
        match amount {
            Some(a) if a.is_finite() => Some(Self { metric, amount: -a }),
            _ => None,
        }
    }
}

impl ProgressSummary {
    /// All totals at zero.
    pub const fn zero() -> Self {
        Self {
            total_hours: 0.0,
            total_pages: 0.0,
            total_questions: 0.0,
        }
    }

    /// Running total for one metric.
    pub fn get(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Hours => self.total_hours,
            MetricKind::Pages => self.total_pages,
            MetricKind::Questions => self.total_questions,
        }
    }

    fn slot_mut(&mut self, metric: MetricKind) -> &mut f64 {
        match metric {
            MetricKind::Hours => &mut self.total_hours,
            MetricKind::Pages => &mut self.total_pages,
            MetricKind::Questions => &mut self.total_questions,
        }
    }

    /// Return a copy with `delta` added to one metric, clamped at zero.
    ///
    /// A non-finite delta leaves the summary unchanged.
    #[must_use]
    pub fn apply(&self, metric: MetricKind, delta: f64) -> Self {
        let mut next = *self;
        if delta.is_finite() {
            let slot = next.slot_mut(metric);
            *slot = (*slot + delta).max(0.0);
        }
        next
    }

    /// Apply a [`Delta`].
    #[must_use]
    pub fn apply_delta(&self, delta: Delta) -> Self {
        self.apply(delta.metric, delta.amount)
    }

    /// The part of `delta` that [`apply_delta`](Self::apply_delta) actually
    /// applies, so a reversal never takes a total below zero.
    ///
    /// ```
    /// use stampcard_core::{Delta, MetricKind, ProgressSummary};
    ///
    /// let s = ProgressSummary { total_pages: 5.0, ..ProgressSummary::zero() };
    /// let d = s.effective(Delta { metric: MetricKind::Pages, amount: -10.0 });
    /// assert_eq!(d.amount, -5.0);
    /// ```
    pub fn effective(&self, delta: Delta) -> Delta {
        Delta {
            metric: delta.metric,
            amount: self.apply_delta(delta).get(delta.metric) - self.get(delta.metric),
        }
    }

    /// Fold a sequence of deltas starting from zero.
    pub fn from_contributions<I>(deltas: I) -> Self
    where
        I: IntoIterator<Item = Delta>,
    {
        deltas
            .into_iter()
            .fold(Self::zero(), |summary, delta| summary.apply_delta(delta))
    }

    /// Replace negative or non-finite totals with zero.
    ///
    /// Stored summaries are updated through raw increments, which can
    /// overshoot below zero; readers normalise through this.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            total_hours: clean(self.total_hours),
            total_pages: clean(self.total_pages),
            total_questions: clean(self.total_questions),
        }
    }
}
