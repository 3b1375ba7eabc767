//! Mandatory-coverage verification
//!
//! A mandatory topic counts as covered when some test point either carries it
//! verbatim as `source_requirement` or mentions it inside its `name`. The
//! name match is a loose heuristic and can report false positives for short
//! or common topic strings.

use crate::types::{TestCase, TestPoint};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Mandatory topic -> covered, in topic order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageResult(pub IndexMap<String, bool>);

impl CoverageResult {
    /// Covered flag for one topic
    #[inline]
    #[must_use]
    pub fn is_covered(&self, item: &str) -> Option<bool> {
        self.0.get(item).copied()
    }

    /// Topics nobody covered
    #[must_use]
    pub fn uncovered(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, covered)| !**covered)
            .map(|(item, _)| item.as_str())
            .collect()
    }

    /// Number of topics checked
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no topics were checked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overall status
    #[inline]
    #[must_use]
    pub fn status(&self) -> CoverageStatus {
        overall_status(self)
    }
}

/// Overall coverage verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverageStatus {
    /// Every mandatory topic is covered
    #[serde(rename = "Completed")]
    Completed,
    /// At least one topic is uncovered
    #[serde(rename = "Partially Covered")]
    PartiallyCovered,
}

impl std::fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "Completed"),
            Self::PartiallyCovered => write!(f, "Partially Covered"),
        }
    }
}

/// Focus-case statistics for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FocusHitStats {
    /// Cases tied to a mandatory topic
    pub focus_cases: usize,
    /// All cases
    pub total_cases: usize,
    /// `focus_cases / total_cases`, rounded to 3 decimals
    pub focus_ratio: f64,
}

/// Check each mandatory topic against the test points
#[must_use]
pub fn check<S: AsRef<str>>(mandatory_items: &[S], test_points: &[TestPoint]) -> CoverageResult {
    let result = mandatory_items
        .iter()
        .map(|item| {
            let item = item.as_ref();
            let covered = test_points.iter().any(|tp| {
                tp.source_requirement.as_deref() == Some(item) || tp.name.contains(item)
            });
            (item.to_string(), covered)
        })
        .collect();
    CoverageResult(result)
}

/// `Completed` iff every topic is covered; an empty set is vacuously complete
#[must_use]
pub fn overall_status(result: &CoverageResult) -> CoverageStatus {
    if result.0.values().all(|covered| *covered) {
        CoverageStatus::Completed
    } else {
        CoverageStatus::PartiallyCovered
    }
}

/// Count cases that carry a mandatory origin or coverage topic
#[must_use]
pub fn focus_hit_stats(cases: &[TestCase]) -> FocusHitStats {
    if cases.is_empty() {
        return FocusHitStats::default();
    }
    let total = cases.len();
    let focus = cases.iter().filter(|c| c.is_focus_hit()).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = focus as f64 / total as f64;
    FocusHitStats {
        focus_cases: focus,
        total_cases: total,
        focus_ratio: (ratio * 1000.0).round() / 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Origin;
    use pretty_assertions::assert_eq;

    fn point(name: &str, source: Option<&str>) -> TestPoint {
        TestPoint {
            id: TestPoint::new_id(),
            name: name.to_string(),
            module: "m".into(),
            source_requirement: source.map(str::to_string),
            origin: if source.is_some() { Origin::Mandatory } else { Origin::Inferred },
            is_focus: source.is_some(),
            priority: "P2".into(),
            category: "functional".into(),
        }
    }

    fn case(origin: Option<Origin>, coverage_item: Option<&str>) -> TestCase {
        TestCase {
            case_name: "c".into(),
            module: "m".into(),
            test_point_id: None,
            test_point_name: None,
            origin,
            coverage_item: coverage_item.map(str::to_string),
            precondition: "p".into(),
            steps: vec![],
            expected: String::new(),
        }
    }

    #[test]
    fn market_order_example() {
        let points = vec![point("place market order - happy path", Some("market order"))];
        let result = check(&["market order"], &points);
        assert_eq!(result.is_covered("market order"), Some(true));
        assert_eq!(result.status(), CoverageStatus::Completed);
    }

    #[test]
    fn name_fallback_and_partial() {
        let points = vec![point("limit order rejected when price is zero", None)];
        let result = check(&["limit order", "stop loss"], &points);
        assert_eq!(result.is_covered("limit order"), Some(true));
        assert_eq!(result.uncovered(), vec!["stop loss"]);
        assert_eq!(overall_status(&result), CoverageStatus::PartiallyCovered);
    }

    #[test]
    fn empty_mandatory_set_is_complete() {
        let result = check::<&str>(&[], &[]);
        assert!(result.is_empty());
        assert_eq!(overall_status(&result), CoverageStatus::Completed);
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_value(CoverageStatus::PartiallyCovered).unwrap(),
            "Partially Covered"
        );
        assert_eq!(CoverageStatus::Completed.to_string(), "Completed");
    }

    #[test]
    fn result_serializes_as_ordered_map() {
        let result = check(&["b", "a"], &[point("a", None)]);
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"b":false,"a":true}"#
        );
    }

    #[test]
    fn focus_stats() {
        let cases = vec![
            case(Some(Origin::Mandatory), Some("x")),
            case(Some(Origin::Inferred), Some("y")),
            case(Some(Origin::Inferred), None),
        ];
        let stats = focus_hit_stats(&cases);
        assert_eq!(stats.focus_cases, 2);
        assert_eq!(stats.total_cases, 3);
        assert!((stats.focus_ratio - 0.667).abs() < f64::EPSILON);
        assert_eq!(focus_hit_stats(&[]), FocusHitStats::default());
    }
}
