//! Test-point generation
//!
//! Expands one plan into verifiable test points. Generator output is
//! untrusted: ids are always fresh, provenance is forced from the plan, and
//! mandatory plans are padded up to a minimum point count.

use crate::outcome::StageOutcome;
use crate::types::{
    str_field, Origin, Plan, TestPoint, TestPointGroup, UNCLASSIFIED_MODULE,
};
use casegen_llm::{GenerationError, SharedClient, StructuredValue};
use serde_json::{Map, Value};

/// Keys under which an object response may carry its point list
const POINT_LIST_KEYS: &[&str] = &["test_points", "points"];

const DEFAULT_PRIORITY: &str = "P2";
const DEFAULT_CATEGORY: &str = "functional";
const PADDING_PRIORITY: &str = "P1";
const PADDING_CATEGORY: &str = "edge";

/// Generator-backed test-point expander
#[derive(Clone)]
pub struct TestPointGenerator {
    client: SharedClient,
    min_mandatory_points: usize,
}

impl std::fmt::Debug for TestPointGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestPointGenerator")
            .field("client", &self.client.name())
            .field("min_mandatory_points", &self.min_mandatory_points)
            .finish()
    }
}

impl TestPointGenerator {
    /// Create new generator with a floor of 4 points per mandatory plan
    #[inline]
    #[must_use]
    pub fn new(client: SharedClient) -> Self {
        Self {
            client,
            min_mandatory_points: 4,
        }
    }

    /// With mandatory point floor
    #[inline]
    #[must_use]
    pub fn with_min_mandatory_points(mut self, min: usize) -> Self {
        self.min_mandatory_points = min;
        self
    }

    /// Build the prompt for one plan
    #[must_use]
    pub fn build_prompt(&self, plan: &Plan) -> String {
        let mut prompt = format!(
            "You are a senior test engineer. Generate verifiable, executable test points \
             for the sub-task below. Do not generate test cases.\n\
             Every test point must carry source_requirement.\n\n\
             [Sub-task]\n{}\n",
            plan.instruction
        );

        if let Some(item) = plan.coverage_item.as_deref().filter(|_| plan.is_mandatory()) {
            prompt.push_str(&format!(
                "\n[Mandatory coverage topic - highest priority, must not be weakened]\n{item}\n\n\
                 Requirements:\n\
                 - split this topic into multiple executable test points\n\
                 - every test point must reflect this topic\n\
                 - cover normal flow, exceptional flow and boundary conditions\n\
                 - produce no fewer than {} test points\n",
                self.min_mandatory_points
            ));
        }

        prompt.push_str(
            "\nReturn JSON only, shaped as:\n\
             {\"module\": \"\", \"test_points\": [{\"name\": \"\", \"source_requirement\": null, \
             \"priority\": \"P2\", \"category\": \"functional\"}]}\n",
        );
        prompt
    }

    /// Expand a plan into test points
    ///
    /// Never fails: on generator error or unusable output the group is built
    /// from padding alone and the outcome records why.
    pub async fn expand(&self, plan: &Plan) -> StageOutcome<TestPointGroup> {
        let result = self.client.generate(&self.build_prompt(plan)).await;
        match result {
            Ok(value) => match value.object_items(POINT_LIST_KEYS) {
                Some(items) => {
                    StageOutcome::generated(self.post_process(module_of(&value), &items, plan))
                }
                None => self.fall_back(
                    plan,
                    &GenerationError::unexpected_shape("test point list", value.kind()),
                ),
            },
            Err(e) => self.fall_back(plan, &e),
        }
    }

    fn fall_back(&self, plan: &Plan, error: &GenerationError) -> StageOutcome<TestPointGroup> {
        tracing::warn!(
            plan = ?plan.kind,
            coverage_item = plan.coverage_item.as_deref().unwrap_or(""),
            error = %error,
            "test point generation fell back"
        );
        StageOutcome::fell_back(self.fallback_group(plan), error.to_string())
    }

    /// Group used when the generator produced nothing usable.
    ///
    /// Mandatory plans get the full padding floor; other plans get one
    /// synthetic point named after the plan.
    #[must_use]
    pub fn fallback_group(&self, plan: &Plan) -> TestPointGroup {
        let mut group = self.post_process(None, &[], plan);
        if group.test_points.is_empty() {
            group.test_points.push(TestPoint {
                id: TestPoint::new_id(),
                name: format!("{} - fallback test point", instruction_head(&plan.instruction)),
                module: group.module.clone(),
                source_requirement: None,
                origin: Origin::Inferred,
                is_focus: false,
                priority: PADDING_PRIORITY.to_string(),
                category: PADDING_CATEGORY.to_string(),
            });
        }
        group
    }

    /// Turn raw generator items into test points for `plan`
    #[must_use]
    pub fn post_process(
        &self,
        output_module: Option<&str>,
        items: &[&Map<String, Value>],
        plan: &Plan,
    ) -> TestPointGroup {
        let module = output_module
            .or(plan.module.as_deref())
            .unwrap_or(UNCLASSIFIED_MODULE)
            .to_string();
        let mandatory = plan.is_mandatory();

        let mut points: Vec<TestPoint> = items
            .iter()
            .enumerate()
            .map(|(idx, raw)| TestPoint {
                id: TestPoint::new_id(),
                name: str_field(raw, "name")
                    .map_or_else(|| format!("unnamed test point-{}", idx + 1), str::to_string),
                module: module.clone(),
                source_requirement: if mandatory {
                    plan.coverage_item.clone()
                } else {
                    str_field(raw, "source_requirement").map(str::to_string)
                },
                origin: if mandatory { Origin::Mandatory } else { Origin::Inferred },
                is_focus: mandatory,
                priority: str_field(raw, "priority").unwrap_or(DEFAULT_PRIORITY).to_string(),
                category: str_field(raw, "category").unwrap_or(DEFAULT_CATEGORY).to_string(),
            })
            .collect();

        if mandatory && points.len() < self.min_mandatory_points {
            let item = plan.coverage_item.clone().unwrap_or_default();
            let missing = self.min_mandatory_points - points.len();
            tracing::debug!(coverage_item = %item, missing, "padding mandatory test points");
            points.extend((0..missing).map(|i| TestPoint {
                id: TestPoint::new_id(),
                name: format!("{item} - supplementary test point-{}", i + 1),
                module: module.clone(),
                source_requirement: Some(item.clone()),
                origin: Origin::Mandatory,
                is_focus: true,
                priority: PADDING_PRIORITY.to_string(),
                category: PADDING_CATEGORY.to_string(),
            }));
        }

        TestPointGroup {
            module,
            test_points: points,
        }
    }
}

fn module_of(value: &StructuredValue) -> Option<&str> {
    value.as_object().and_then(|map| str_field(map, "module"))
}

fn instruction_head(instruction: &str) -> String {
    let line = instruction.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    line.chars().take(60).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubClient;
    use crate::types::PlanKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn generator(responses: Vec<Result<Value, GenerationError>>) -> TestPointGenerator {
        TestPointGenerator::new(Arc::new(StubClient::new(responses)))
    }

    fn mandatory_plan() -> Plan {
        Plan::mandatory("Mandatory Coverage", "market order", "cover market orders")
    }

    #[tokio::test]
    async fn mandatory_forces_provenance_and_pads() {
        let gen = generator(vec![Ok(json!({
            "module": "Trading",
            "test_points": [
                {"name": "market buy", "source_requirement": "something else"},
                {"priority": "P0"}
            ]
        }))]);
        let outcome = gen.expand(&mandatory_plan()).await;
        assert!(!outcome.is_fallback());
        let group = outcome.into_value();

        assert_eq!(group.module, "Trading");
        assert_eq!(group.test_points.len(), 4);
        assert!(group.test_points.iter().all(|p| p.origin == Origin::Mandatory
            && p.is_focus
            && p.source_requirement.as_deref() == Some("market order")));
        assert_eq!(group.test_points[1].name, "unnamed test point-2");
        assert_eq!(group.test_points[1].priority, "P0");
        assert_eq!(group.test_points[2].name, "market order - supplementary test point-1");
        assert_eq!(group.test_points[3].category, "edge");
        assert_eq!(group.test_points[3].priority, "P1");
    }

    #[tokio::test]
    async fn inferred_points_pass_source_through() {
        let gen = generator(vec![Ok(json!([
            {"name": "valid login", "source_requirement": "login"},
            {"name": "bad password"}
        ]))]);
        let plan = Plan::for_module(PlanKind::ModuleRequirement, "Auth", "login works");
        let group = gen.expand(&plan).await.into_value();

        assert_eq!(group.module, "Auth");
        assert_eq!(group.test_points.len(), 2);
        assert_eq!(group.test_points[0].source_requirement.as_deref(), Some("login"));
        assert_eq!(group.test_points[1].source_requirement, None);
        assert!(group.test_points.iter().all(|p| p.origin == Origin::Inferred && !p.is_focus));
        assert_eq!(group.test_points[1].category, "functional");
    }

    #[tokio::test]
    async fn failure_on_mandatory_yields_floor() {
        let gen = generator(vec![Err(GenerationError::Timeout { duration_secs: 120 })]);
        let outcome = gen.expand(&mandatory_plan()).await;
        assert!(outcome.is_fallback());
        assert!(outcome.reason().unwrap().contains("timed out"));
        assert_eq!(outcome.value().test_points.len(), 4);
    }

    #[tokio::test]
    async fn failure_on_general_yields_one_point() {
        let gen = generator(vec![Ok(json!({"unexpected": true}))]);
        let outcome = gen.expand(&Plan::general("decompose back-end validation checks")).await;
        assert!(outcome.is_fallback());
        let group = outcome.into_value();
        assert_eq!(group.module, UNCLASSIFIED_MODULE);
        assert_eq!(group.test_points.len(), 1);
        assert_eq!(
            group.test_points[0].name,
            "decompose back-end validation checks - fallback test point"
        );
    }

    #[test]
    fn ids_are_unique() {
        let gen = generator(vec![]);
        let raw = json!({"name": "x"});
        let map = raw.as_object().unwrap();
        let items = vec![map; 10];
        let group = gen.post_process(None, &items, &mandatory_plan());
        let ids: HashSet<_> = group.test_points.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn prompt_amplifies_mandatory() {
        let gen = generator(vec![]);
        let prompt = gen.build_prompt(&mandatory_plan());
        assert!(prompt.contains("market order"));
        assert!(prompt.contains("no fewer than 4"));
        let prompt = gen.build_prompt(&Plan::general("x"));
        assert!(!prompt.contains("Mandatory coverage topic"));
    }
}
