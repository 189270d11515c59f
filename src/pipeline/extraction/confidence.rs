//! Confidence aggregation: five per-field labels → one overall level plus
//! a review flag for the dashboard.

use serde::Serialize;

use crate::models::ConfidenceLevel;

/// Overall confidence for a proposal and whether a human should look at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceSummary {
    pub overall: ConfidenceLevel,
    pub review_needed: bool,
}

/// Reduce field confidences: any LOW wins, else any MEDIUM, else HIGH.
/// Review is needed whenever the overall level is not HIGH. Total over any
/// input, including the empty set (no fields ⇒ nothing to doubt ⇒ HIGH);
/// callers that want "not yet extracted" semantics check for absence of
/// fields before calling.
pub fn aggregate<I>(levels: I) -> ConfidenceSummary
where
    I: IntoIterator<Item = ConfidenceLevel>,
{
    let mut has_medium = false;
    for level in levels {
        match level {
            ConfidenceLevel::Low => {
                return ConfidenceSummary {
                    overall: ConfidenceLevel::Low,
                    review_needed: true,
                }
            }
            ConfidenceLevel::Medium => has_medium = true,
            ConfidenceLevel::High => {}
        }
    }

    if has_medium {
        ConfidenceSummary {
            overall: ConfidenceLevel::Medium,
            review_needed: true,
        }
    } else {
        ConfidenceSummary {
            overall: ConfidenceLevel::High,
            review_needed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConfidenceLevel::{High, Low, Medium};

    #[test]
    fn any_low_dominates() {
        let summary = aggregate([High, High, Low, Medium, High]);
        assert_eq!(summary.overall, Low);
        assert!(summary.review_needed);
    }

    #[test]
    fn medium_without_low_yields_medium() {
        let summary = aggregate([High, Medium, High, High, High]);
        assert_eq!(summary.overall, Medium);
        assert!(summary.review_needed);
    }

    #[test]
    fn all_high_needs_no_review() {
        let summary = aggregate([High; 5]);
        assert_eq!(summary.overall, High);
        assert!(!summary.review_needed);
    }

    #[test]
    fn single_low_alone_is_low() {
        let summary = aggregate([Low]);
        assert_eq!(summary.overall, Low);
        assert!(summary.review_needed);
    }

    #[test]
    fn empty_input_is_high_no_review() {
        let summary = aggregate(std::iter::empty());
        assert_eq!(summary.overall, High);
        assert!(!summary.review_needed);
    }

    #[test]
    fn low_beats_medium_regardless_of_order() {
        assert_eq!(aggregate([Medium, Low]).overall, Low);
        assert_eq!(aggregate([Low, Medium]).overall, Low);
    }
}
