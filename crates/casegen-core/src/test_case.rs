//! Test-case generation and normalization
//!
//! Normalization runs on every case regardless of where it came from:
//! - `steps` is always a list of non-empty strings
//! - `precondition` is never blank
//! - identifiers and provenance come from the source test point, never from
//!   generator output

use crate::error::WorkerError;
use crate::outcome::StageOutcome;
use crate::types::{str_field, Origin, TestCase, TestPoint, NO_PRECONDITION};
use crate::worker;
use casegen_llm::{GenerationError, SharedClient, StructuredValue};
use futures::stream::{self, Stream};
use serde_json::{Map, Value};
use tokio::time::Instant;

/// Keys under which an object response may carry its case list
const CASE_LIST_KEYS: &[&str] = &["cases", "test_cases"];

/// Scenario labels cycled through by the deterministic fallback
pub const FALLBACK_SCENARIOS: &[&str] = &["normal", "exception", "boundary"];

/// Module of the system placeholder case
pub const SYSTEM_MODULE: &str = "SYSTEM";

/// Cases produced for one test point
#[derive(Debug, Clone, PartialEq)]
pub struct PointCases {
    /// Source test point
    pub test_point: TestPoint,
    /// Normalized cases, generated or synthesized
    pub outcome: StageOutcome<Vec<TestCase>>,
}

/// Generator-backed test-case expander
#[derive(Clone)]
pub struct TestCaseGenerator {
    client: SharedClient,
    fallback_per_point: usize,
}

impl std::fmt::Debug for TestCaseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCaseGenerator")
            .field("client", &self.client.name())
            .field("fallback_per_point", &self.fallback_per_point)
            .finish()
    }
}

impl TestCaseGenerator {
    /// Create new generator synthesizing 3 fallback cases per point
    #[inline]
    #[must_use]
    pub fn new(client: SharedClient) -> Self {
        Self {
            client,
            fallback_per_point: FALLBACK_SCENARIOS.len(),
        }
    }

    /// With fallback cases per point
    #[inline]
    #[must_use]
    pub fn with_fallback_per_point(mut self, count: usize) -> Self {
        self.fallback_per_point = count;
        self
    }

    /// Prompt for a single case
    #[must_use]
    pub fn single_prompt(test_point: &TestPoint) -> String {
        let mut prompt = format!(
            "You are a senior test engineer. Write one executable test case for the test \
             point below.\n\n\
             [Test point]\nID: {}\nName: {}\nModule: {}\n",
            test_point.id, test_point.name, test_point.module
        );
        push_mandatory_directive(&mut prompt, test_point);
        push_case_rules(&mut prompt);
        prompt.push_str(
            "\nReturn one JSON object:\n\
             {\"case_name\": \"\", \"module\": \"\", \"precondition\": \"\", \"steps\": [], \"expected\": \"\"}\n",
        );
        prompt
    }

    /// Prompt for all cases of one test point within a run
    #[must_use]
    pub fn batch_prompt(requirement: &str, focus: Option<&str>, test_point: &TestPoint) -> String {
        let point_json =
            serde_json::to_string_pretty(test_point).unwrap_or_else(|_| test_point.name.clone());
        let mut prompt = format!(
            "You are a senior software testing expert. Generate test cases for the test \
             point below.\n\n\
             Rules:\n\
             1. at least 3 cases for the test point: normal, exceptional and boundary\n\
             2. return a JSON array\n\
             3. every case must contain case_name, module, precondition, steps (array) and expected\n\n\
             [User focus - must be covered]\n{}\n\n\
             [Requirement]\n{requirement}\n\n\
             [Test point]\n{point_json}\n",
            focus.filter(|f| !f.trim().is_empty()).unwrap_or("none"),
        );
        push_mandatory_directive(&mut prompt, test_point);
        push_case_rules(&mut prompt);
        prompt
    }

    /// Expand one test point into one normalized case
    ///
    /// # Errors
    /// Returns the generator error, or `UnexpectedShape` if the response holds
    /// no case object.
    pub async fn expand(&self, test_point: &TestPoint) -> Result<TestCase, GenerationError> {
        let value = self.client.generate(&Self::single_prompt(test_point)).await?;
        let raw = match &value {
            StructuredValue::Object(map) if !map.contains_key("cases") => Some(map),
            other => parse_cases(other).into_iter().next(),
        };
        raw.map(|raw| normalize_case(raw, test_point))
            .ok_or_else(|| GenerationError::unexpected_shape("test case object", value.kind()))
    }

    /// Generate all cases for one point, normalized
    ///
    /// # Errors
    /// Returns the generator error, or `UnexpectedShape` if no case list is
    /// present.
    pub async fn generate_for_point(
        &self,
        requirement: &str,
        focus: Option<&str>,
        test_point: &TestPoint,
    ) -> Result<Vec<TestCase>, GenerationError> {
        let prompt = Self::batch_prompt(requirement, focus, test_point);
        let value = self.client.generate(&prompt).await?;
        let raws = value
            .object_items(CASE_LIST_KEYS)
            .ok_or_else(|| GenerationError::unexpected_shape("test case list", value.kind()))?;
        Ok(raws.into_iter().map(|raw| normalize_case(raw, test_point)).collect())
    }

    /// Stream cases for every point, in point order.
    ///
    /// Each point's generator call runs on a detached worker raced against
    /// `deadline`, shared by the whole batch. A point whose call fails,
    /// returns nothing, or loses the race gets the deterministic fallback;
    /// points reached after the deadline skip the call entirely.
    pub fn expand_many(
        &self,
        requirement: String,
        focus: Option<String>,
        test_points: Vec<TestPoint>,
        deadline: Instant,
    ) -> impl Stream<Item = PointCases> + Send + 'static {
        let this = self.clone();
        stream::unfold(test_points.into_iter(), move |mut points| {
            let this = this.clone();
            let requirement = requirement.clone();
            let focus = focus.clone();
            async move {
                let point = points.next()?;
                let outcome = this.bounded_point(requirement, focus, &point, deadline).await;
                Some((
                    PointCases {
                        test_point: point,
                        outcome,
                    },
                    points,
                ))
            }
        })
    }

    async fn bounded_point(
        &self,
        requirement: String,
        focus: Option<String>,
        point: &TestPoint,
        deadline: Instant,
    ) -> StageOutcome<Vec<TestCase>> {
        if Instant::now() >= deadline {
            return self.fall_back(point, "cases stage deadline already elapsed");
        }

        let this = self.clone();
        let owned = point.clone();
        let call = async move {
            this.generate_for_point(&requirement, focus.as_deref(), &owned)
                .await
        };

        match worker::run_until(call, deadline).await {
            Ok(Ok(cases)) if !cases.is_empty() => StageOutcome::generated(cases),
            Ok(Ok(_)) => self.fall_back(point, "generator returned no cases"),
            Ok(Err(e)) => self.fall_back(point, &e.to_string()),
            Err(WorkerError::DeadlineElapsed) => {
                tracing::warn!(test_point = %point.id, "case generation hit the stage deadline");
                self.fall_back(point, "cases stage deadline elapsed")
            }
            Err(e) => self.fall_back(point, &e.to_string()),
        }
    }

    fn fall_back(&self, point: &TestPoint, reason: &str) -> StageOutcome<Vec<TestCase>> {
        tracing::warn!(test_point = %point.id, reason, "case generation fell back");
        StageOutcome::fell_back(fallback_cases(point, self.fallback_per_point), reason)
    }
}

fn push_mandatory_directive(prompt: &mut String, test_point: &TestPoint) {
    if test_point.origin == Origin::Mandatory {
        prompt.push_str(&format!(
            "\n[User-mandated focus - must be covered]\nCoverage source: {}\n\
             - cover normal, exceptional, boundary and extreme scenarios\n\
             - happy-path-only cases are forbidden\n",
            test_point.source_requirement.as_deref().unwrap_or(&test_point.name)
        ));
    }
}

fn push_case_rules(prompt: &mut String) {
    prompt.push_str(&format!(
        "\nprecondition describes the state required before execution. It must not contain \
         operation steps and must never be empty; write \"{NO_PRECONDITION}\" when nothing \
         special is required.\n"
    ));
}

/// Accept a bare list of case objects or an object carrying one under `cases`
#[must_use]
pub fn parse_cases(value: &StructuredValue) -> Vec<&Map<String, Value>> {
    value.object_items(CASE_LIST_KEYS).unwrap_or_default()
}

/// Normalize one raw case against its source test point
#[must_use]
pub fn normalize_case(raw: &Map<String, Value>, test_point: &TestPoint) -> TestCase {
    TestCase {
        case_name: str_field(raw, "case_name")
            .map_or_else(|| format!("{} - test case", test_point.name), str::to_string),
        module: str_field(raw, "module").unwrap_or(&test_point.module).to_string(),
        test_point_id: Some(test_point.id.clone()),
        test_point_name: Some(test_point.name.clone()),
        origin: Some(test_point.origin),
        coverage_item: test_point.source_requirement.clone(),
        precondition: normalize_precondition(raw.get("precondition")),
        steps: normalize_steps(raw.get("steps")),
        expected: raw.get("expected").map(crate::types::value_text).unwrap_or_default(),
    }
}

/// Steps as a list: a single string becomes one step, non-string and blank
/// entries are dropped
#[must_use]
pub fn normalize_steps(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(step)) if !step.trim().is_empty() => vec![step.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Precondition text, with blank or absent values replaced by the sentinel
#[must_use]
pub fn normalize_precondition(value: Option<&Value>) -> String {
    let text = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    if text.is_empty() {
        NO_PRECONDITION.to_string()
    } else {
        text
    }
}

/// Deterministic cases built from the point's name alone
#[must_use]
pub fn fallback_cases(point: &TestPoint, count: usize) -> Vec<TestCase> {
    (0..count)
        .map(|i| {
            let label = FALLBACK_SCENARIOS[i % FALLBACK_SCENARIOS.len()];
            let round = i / FALLBACK_SCENARIOS.len();
            let case_name = if round == 0 {
                format!("{} - {label} scenario", point.name)
            } else {
                format!("{} - {label} scenario {}", point.name, round + 1)
            };
            TestCase {
                case_name,
                module: point.module.clone(),
                test_point_id: Some(point.id.clone()),
                test_point_name: Some(point.name.clone()),
                origin: Some(point.origin),
                coverage_item: point.source_requirement.clone(),
                precondition: NO_PRECONDITION.to_string(),
                steps: vec![
                    format!("Prepare the environment for: {}", point.name),
                    format!("Execute the {label} scenario"),
                    "Observe and record the system response".to_string(),
                ],
                expected: format!("System behaves as specified in the {label} scenario"),
            }
        })
        .collect()
}

/// Single case emitted when a run produced nothing at all
#[must_use]
pub fn placeholder_case(reason: &str) -> TestCase {
    TestCase {
        case_name: "[System fallback] failed to generate test cases".to_string(),
        module: SYSTEM_MODULE.to_string(),
        test_point_id: None,
        test_point_name: None,
        origin: None,
        coverage_item: None,
        precondition: NO_PRECONDITION.to_string(),
        steps: vec![
            "The generator failed or timed out while producing test cases".to_string(),
            format!("Check the generation service status and prompt output ({reason})"),
        ],
        expected: "The system reports why generation failed".to_string(),
    }
}
