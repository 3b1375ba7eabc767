//! Requirement analysis
//!
//! Two generator-backed operations:
//! - [`RequirementAnalyzer::analyze`] splits a document into modules and
//!   mandatory topics (modules stage content)
//! - [`RequirementAnalyzer::analyze_quality`] produces a quality summary,
//!   issues, risks and suggestions

use crate::types::{str_field, string_list, ModuleBreakdown, RequirementBreakdown, UNNAMED_MODULE};
use casegen_llm::{GenerationError, SharedClient, StructuredValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Quality score used when the generator omits a summary
pub const DEFAULT_QUALITY: i64 = 70;

/// Quality verdict for a requirement document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySummary {
    /// Score, nominally 0-100
    pub quality: i64,
    /// Free-form comment
    pub comment: String,
}

impl Default for QualitySummary {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            comment: "analysis completed".to_string(),
        }
    }
}

/// Requirement quality analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Overall verdict
    pub summary: QualitySummary,
    /// Defects found in the requirement
    #[serde(default)]
    pub issues: Vec<String>,
    /// Risks worth testing
    #[serde(default)]
    pub risks: Vec<String>,
    /// Testing suggestions
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Names of the test points derived from the requirement
    #[serde(default)]
    pub requirements: Vec<String>,
}

/// Generator-backed requirement analyzer
#[derive(Clone)]
pub struct RequirementAnalyzer {
    client: SharedClient,
}

impl std::fmt::Debug for RequirementAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequirementAnalyzer")
            .field("client", &self.client.name())
            .finish()
    }
}

impl RequirementAnalyzer {
    /// Create new analyzer
    #[inline]
    #[must_use]
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }

    /// Prompt for the module breakdown
    #[must_use]
    pub fn breakdown_prompt(text: &str, additional_requirements: Option<&str>) -> String {
        let mut prompt = String::from(
            "You are a test requirement analyst.\n\
             Split the requirement document into test modules. Every additional test \
             requirement supplied by the user is a mandatory coverage topic: output each \
             one verbatim in mandatory_coverage, never merge, drop or reinterpret them.\n\n\
             Return JSON shaped as:\n\
             {\"modules\": [{\"module\": \"module name\", \"requirements\": [\"requirement 1\"]}], \
             \"mandatory_coverage\": [\"additional requirement 1\"]}\n\n",
        );
        prompt.push_str("[Requirement document]\n");
        prompt.push_str(text);
        prompt.push('\n');
        if let Some(extra) = additional_requirements.filter(|s| !s.trim().is_empty()) {
            prompt.push_str("\n[Additional test requirements - all must be covered]\n");
            prompt.push_str(extra);
            prompt.push('\n');
        }
        prompt.push_str("\nReturn JSON only.\n");
        prompt
    }

    /// Prompt for the quality analysis
    #[must_use]
    pub fn quality_prompt(text: &str, focus: Option<&str>) -> String {
        format!(
            "You are a senior software testing expert.\n\
             Analyze the requirement below: overall quality, potential risks, testing \
             suggestions. Do not generate test cases.\n\n\
             [Requirement]\n{text}\n\n\
             [User focus - must be considered]\n{}\n\n\
             Return JSON:\n\
             {{\"summary\": {{\"quality\": 0, \"comment\": \"\"}}, \"issues\": [], \"risks\": [], \"suggestions\": []}}\n",
            focus.filter(|s| !s.trim().is_empty()).unwrap_or("none")
        )
    }

    /// Split a requirement document into modules and mandatory topics
    ///
    /// # Errors
    /// Returns the generator error, or `UnexpectedShape` if the response is
    /// not an object.
    pub async fn analyze(
        &self,
        text: &str,
        additional_requirements: Option<&str>,
    ) -> Result<RequirementBreakdown, GenerationError> {
        let value = self
            .client
            .generate(&Self::breakdown_prompt(text, additional_requirements))
            .await?;
        Self::parse_breakdown(&value)
    }

    /// Normalize a breakdown response
    ///
    /// # Errors
    /// Returns `UnexpectedShape` unless the response is an object.
    pub fn parse_breakdown(value: &StructuredValue) -> Result<RequirementBreakdown, GenerationError> {
        let map = value
            .as_object()
            .ok_or_else(|| GenerationError::unexpected_shape("object", value.kind()))?;

        let modules = map
            .get("modules")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|module| ModuleBreakdown {
                        module: str_field(module, "module")
                            .unwrap_or(UNNAMED_MODULE)
                            .to_string(),
                        requirements: string_list(module.get("requirements")),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(RequirementBreakdown {
            modules,
            mandatory_coverage: string_list(map.get("mandatory_coverage")),
        })
    }

    /// Assess requirement quality
    ///
    /// # Errors
    /// Returns the generator error, or `UnexpectedShape` if the response is
    /// not an object.
    pub async fn analyze_quality(
        &self,
        text: &str,
        focus: Option<&str>,
    ) -> Result<AnalysisResult, GenerationError> {
        let value = self.client.generate(&Self::quality_prompt(text, focus)).await?;
        Self::parse_quality(&value)
    }

    /// Normalize a quality response
    ///
    /// # Errors
    /// Returns `UnexpectedShape` unless the response is an object.
    pub fn parse_quality(value: &StructuredValue) -> Result<AnalysisResult, GenerationError> {
        let map = value
            .as_object()
            .ok_or_else(|| GenerationError::unexpected_shape("object", value.kind()))?;

        let summary = map
            .get("summary")
            .and_then(Value::as_object)
            .filter(|s| !s.is_empty())
            .map(|s| QualitySummary {
                quality: s
                    .get("quality")
                    .and_then(|q| q.as_i64().or_else(|| q.as_f64().map(|f| f.round() as i64)))
                    .unwrap_or(DEFAULT_QUALITY),
                comment: s
                    .get("comment")
                    .map(crate::types::value_text)
                    .unwrap_or_default(),
            })
            .unwrap_or_default();

        Ok(AnalysisResult {
            summary,
            issues: string_list(map.get("issues")),
            risks: string_list(map.get("risks")),
            suggestions: string_list(map.get("suggestions")),
            requirements: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubClient;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn structured(value: Value) -> StructuredValue {
        StructuredValue::from_value(value).unwrap()
    }

    #[test]
    fn breakdown_post_processing() {
        let value = structured(json!({
            "modules": [
                {"module": "Cart", "requirements": ["add item", "", "remove item"]},
                {"requirements": ["orphan"]},
                "not an object"
            ],
            "mandatory_coverage": ["  coupon  ", "", 42]
        }));
        let breakdown = RequirementAnalyzer::parse_breakdown(&value).unwrap();
        assert_eq!(breakdown.modules.len(), 2);
        assert_eq!(breakdown.modules[0].requirements, vec!["add item", "remove item"]);
        assert_eq!(breakdown.modules[1].module, UNNAMED_MODULE);
        assert_eq!(breakdown.mandatory_coverage, vec!["coupon", "42"]);
    }

    #[test]
    fn breakdown_without_mandatory_defaults_empty() {
        let value = structured(json!({"modules": []}));
        let breakdown = RequirementAnalyzer::parse_breakdown(&value).unwrap();
        assert!(breakdown.mandatory_coverage.is_empty());
    }

    #[test]
    fn array_breakdown_is_unexpected() {
        let err = RequirementAnalyzer::parse_breakdown(&structured(json!([1]))).unwrap_err();
        assert!(matches!(err, GenerationError::UnexpectedShape { .. }));
    }

    #[test]
    fn quality_summary_fallback() {
        let value = structured(json!({"issues": ["vague"], "risks": []}));
        let analysis = RequirementAnalyzer::parse_quality(&value).unwrap();
        assert_eq!(analysis.summary, QualitySummary::default());
        assert_eq!(analysis.issues, vec!["vague"]);
    }

    #[test]
    fn quality_summary_parsed() {
        let value = structured(json!({"summary": {"quality": 82.6, "comment": "clear"}}));
        let analysis = RequirementAnalyzer::parse_quality(&value).unwrap();
        assert_eq!(analysis.summary.quality, 83);
        assert_eq!(analysis.summary.comment, "clear");
    }

    #[test]
    fn prompts_embed_inputs() {
        let prompt = RequirementAnalyzer::breakdown_prompt("doc body", Some("refunds"));
        assert!(prompt.contains("doc body"));
        assert!(prompt.contains("refunds"));
        let prompt = RequirementAnalyzer::breakdown_prompt("doc body", Some("  "));
        assert!(!prompt.contains("Additional test requirements"));
        assert!(RequirementAnalyzer::quality_prompt("x", None).contains("none"));
    }

    #[tokio::test]
    async fn analyze_calls_generator_once() {
        let stub = Arc::new(StubClient::new(vec![Ok(json!({
            "modules": [{"module": "Login", "requirements": ["lockout"]}],
            "mandatory_coverage": ["2FA"]
        }))]));
        let analyzer = RequirementAnalyzer::new(stub.clone());
        let breakdown = analyzer.analyze("login spec", Some("2FA")).await.unwrap();
        assert_eq!(breakdown.modules[0].module, "Login");
        assert_eq!(breakdown.mandatory_coverage, vec!["2FA"]);
        assert_eq!(stub.calls(), 1);
    }
}
