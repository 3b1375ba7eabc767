//! Generation context merge
//!
//! Folds user focus, user requirement, prior analysis and the raw document
//! into the single requirement text embedded in case prompts. Blocks appear
//! in descending weight and are separated by a blank line.

use crate::analyzer::AnalysisResult;
use serde::{Deserialize, Serialize};

/// Relative weights quoted in each block header
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationWeights {
    /// User-specified focus topics
    pub focus_requirements: f64,
    /// Free-form user requirement
    pub user_requirement: f64,
    /// Suggestions from the analysis
    pub ai_suggestion: f64,
    /// Raw requirement document
    pub raw_requirement: f64,
}

impl Default for GenerationWeights {
    fn default() -> Self {
        Self {
            focus_requirements: 1.2,
            user_requirement: 1.0,
            ai_suggestion: 0.8,
            raw_requirement: 0.4,
        }
    }
}

/// Which sources contributed to a merged context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeMeta {
    /// Weights in effect
    pub weights: GenerationWeights,
    /// Focus block present
    pub has_focus_requirements: bool,
    /// User requirement block present
    pub has_user_requirement: bool,
    /// Analysis supplied
    pub has_analysis: bool,
}

/// Merged case-generation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedContext {
    /// Text embedded in case prompts
    pub merged_requirements: String,
    /// Contributing sources, highest priority first
    pub priority_items: Vec<String>,
    /// Provenance flags
    pub meta: MergeMeta,
}

/// Merge generation inputs into one context
#[must_use]
pub fn merge_generation_context(
    raw_requirements: &str,
    user_requirement: Option<&str>,
    focus_requirements: Option<&str>,
    analysis: Option<&AnalysisResult>,
    weights: GenerationWeights,
) -> MergedContext {
    let mut blocks: Vec<String> = Vec::new();
    let mut priority_items: Vec<String> = Vec::new();

    let focus = non_blank(focus_requirements);
    let user = non_blank(user_requirement);

    if let Some(focus) = focus {
        blocks.push(format!(
            "[User focus | weight {} | highest priority]\n{focus}\n\n\
             Requirements:\n\
             - the test cases must clearly lean toward the focus above\n\
             - happy-path-only coverage is not acceptable",
            weights.focus_requirements
        ));
        priority_items.push("focus_requirements".to_string());
    }

    if let Some(user) = user {
        blocks.push(format!(
            "[User requirement | weight {}]\n{user}",
            weights.user_requirement
        ));
        priority_items.push("user_requirement".to_string());
    }

    if let Some(analysis) = analysis {
        if !analysis.suggestions.is_empty() {
            blocks.push(format!(
                "[AI testing suggestions | weight {}]\n{}",
                weights.ai_suggestion,
                bullets(&analysis.suggestions)
            ));
            priority_items.push("ai_suggestions".to_string());
        }
        if !analysis.issues.is_empty() {
            blocks.push(format!(
                "[AI-identified requirement issues]\n{}",
                bullets(&analysis.issues)
            ));
        }
        if !analysis.risks.is_empty() {
            blocks.push(format!("[AI-identified risks]\n{}", bullets(&analysis.risks)));
        }
    }

    if let Some(raw) = non_blank(Some(raw_requirements)) {
        blocks.push(format!(
            "[Original requirement document | weight {}]\n{raw}",
            weights.raw_requirement
        ));
        priority_items.push("raw_requirement".to_string());
    }

    MergedContext {
        merged_requirements: blocks.join("\n\n"),
        priority_items,
        meta: MergeMeta {
            weights,
            has_focus_requirements: focus.is_some(),
            has_user_requirement: user.is_some(),
            has_analysis: analysis.is_some(),
        },
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn block_order_and_priorities() {
        let analysis = AnalysisResult {
            suggestions: vec!["test retries".into()],
            issues: vec!["ambiguous limits".into()],
            risks: vec!["double charge".into()],
            ..AnalysisResult::default()
        };
        let merged = merge_generation_context(
            "raw doc",
            Some("cover refunds"),
            Some("payment timeout"),
            Some(&analysis),
            GenerationWeights::default(),
        );

        let text = &merged.merged_requirements;
        let order: Vec<usize> = [
            "[User focus | weight 1.2",
            "[User requirement | weight 1]",
            "[AI testing suggestions | weight 0.8]",
            "[AI-identified requirement issues]",
            "[AI-identified risks]",
            "[Original requirement document | weight 0.4]",
        ]
        .iter()
        .map(|header| text.find(header).unwrap())
        .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(
            merged.priority_items,
            vec!["focus_requirements", "user_requirement", "ai_suggestions", "raw_requirement"]
        );
        assert!(merged.meta.has_analysis);
    }

    #[test]
    fn raw_only() {
        let merged =
            merge_generation_context("  raw doc  ", Some(" "), None, None, GenerationWeights::default());
        assert_eq!(
            merged.merged_requirements,
            "[Original requirement document | weight 0.4]\nraw doc"
        );
        assert!(!merged.meta.has_user_requirement);
        assert!(!merged.meta.has_focus_requirements);
    }
}
