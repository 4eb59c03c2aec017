//! Study metrics.

use crate::error::CoreError;
use std::fmt;
use std::str::FromStr;

/// What a study record measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MetricKind {
    Hours,
    Pages,
    Questions,
}

impl MetricKind {
    /// All metrics, in summary field order.
    pub const ALL: [MetricKind; 3] = [MetricKind::Hours, MetricKind::Pages, MetricKind::Questions];

    /// Lowercase name, also the field a record stores its amount under.
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricKind::Hours => "hours",
            MetricKind::Pages => "pages",
            MetricKind::Questions => "questions",
        }
    }

    /// Field name of the running total in a progress summary.
    pub const fn total_field(self) -> &'static str {
        match self {
            MetricKind::Hours => "totalHours",
            MetricKind::Pages => "totalPages",
            MetricKind::Questions => "totalQuestions",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hours" => Ok(MetricKind::Hours),
            "pages" => Ok(MetricKind::Pages),
            "questions" => Ok(MetricKind::Questions),
            other => Err(CoreError::UnknownMetric(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_metric_names() {
        assert_eq!("hours".parse::<MetricKind>().unwrap(), MetricKind::Hours);
        assert_eq!(" Pages ".parse::<MetricKind>().unwrap(), MetricKind::Pages);
        assert_eq!("QUESTIONS".parse::<MetricKind>().unwrap(), MetricKind::Questions);
        assert_eq!(
            "minutes".parse::<MetricKind>(),
            Err(CoreError::UnknownMetric("minutes".to_string()))
        );
    }

    #[test]
    fn field_names() {
        for kind in MetricKind::ALL {
            assert!(kind.total_field().to_lowercase().ends_with(kind.as_str()));
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_lowercase() {
        let json = serde_json::to_string(&MetricKind::Questions).unwrap();
        assert_eq!(json, "\"questions\"");
    }
}
