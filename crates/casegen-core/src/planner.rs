//! Task planning
//!
//! Decomposes a requirement into ordered sub-tasks for the test-point
//! generator. Plain text gets four fixed general sub-tasks; a structured
//! breakdown gets one sub-task per module and per requirement line. Both
//! paths append one mandatory sub-task per coverage topic.

use crate::config::DEFAULT_FOCUS_SEPARATORS;
use crate::types::{
    Plan, PlanKind, RequirementBreakdown, RequirementInput, MANDATORY_COVERAGE_MODULE,
    UNNAMED_MODULE, USER_FOCUS_MODULE,
};

/// Planner for breaking a requirement into sub-tasks
#[derive(Debug, Clone)]
pub struct TaskPlanner {
    separators: Vec<String>,
}

impl TaskPlanner {
    /// Create new planner with the default focus separators
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            separators: DEFAULT_FOCUS_SEPARATORS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// With custom focus separators
    #[inline]
    #[must_use]
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    /// Split free-form focus text into trimmed, non-blank topics
    #[must_use]
    pub fn parse_focus_items(&self, focus: Option<&str>) -> Vec<String> {
        let Some(focus) = focus else {
            return Vec::new();
        };
        let mut normalized = focus.to_string();
        for sep in self.separators.iter().filter(|s| !s.is_empty()) {
            normalized = normalized.replace(sep.as_str(), "\n");
        }
        normalized
            .split('\n')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Decompose a requirement into plans
    ///
    /// # Arguments
    /// * `requirement` - Plain text or a structured breakdown
    /// * `focus` - Free-form mandatory topics supplied by the user
    #[must_use]
    pub fn make_plan(&self, requirement: &RequirementInput, focus: Option<&str>) -> Vec<Plan> {
        let focus_items = self.parse_focus_items(focus);
        let plans = match requirement {
            RequirementInput::Text(text) => Self::plan_text(text, &focus_items),
            RequirementInput::Structured(breakdown) => Self::plan_structured(breakdown, &focus_items),
        };
        tracing::debug!(
            plans = plans.len(),
            mandatory = plans.iter().filter(|p| p.is_mandatory()).count(),
            "requirement planned"
        );
        plans
    }

    /// Mandatory topics for a requirement: breakdown topics, then focus topics,
    /// de-duplicated by exact match in first-seen order
    #[must_use]
    pub fn mandatory_items(&self, requirement: &RequirementInput, focus: Option<&str>) -> Vec<String> {
        let focus_items = self.parse_focus_items(focus);
        match requirement {
            RequirementInput::Text(_) => dedup(focus_items),
            RequirementInput::Structured(breakdown) => dedup(
                breakdown
                    .mandatory_coverage
                    .iter()
                    .cloned()
                    .chain(focus_items),
            ),
        }
    }

    fn plan_text(text: &str, focus_items: &[String]) -> Vec<Plan> {
        let mut plans = vec![
            Plan::general(format!("analyze requirement: {text}")),
            Plan::general("decompose front-end validation checks"),
            Plan::general("decompose back-end validation checks"),
            Plan::general("generate test points and boundary conditions"),
        ];

        plans.extend(
            dedup(focus_items.iter().cloned())
                .into_iter()
                .map(|item| mandatory_plan(USER_FOCUS_MODULE, item)),
        );
        plans
    }

    fn plan_structured(breakdown: &RequirementBreakdown, focus_items: &[String]) -> Vec<Plan> {
        let mut plans = Vec::new();

        for module in &breakdown.modules {
            let name = if module.module.trim().is_empty() {
                UNNAMED_MODULE
            } else {
                module.module.trim()
            };
            plans.push(Plan::for_module(
                PlanKind::Module,
                name,
                format!("analyze module: {name}"),
            ));
            for requirement in &module.requirements {
                plans.push(Plan::for_module(
                    PlanKind::ModuleRequirement,
                    name,
                    format!("generate test points for the following requirement: {requirement}"),
                ));
            }
        }

        let merged = dedup(
            breakdown
                .mandatory_coverage
                .iter()
                .cloned()
                .chain(focus_items.iter().cloned()),
        );
        plans.extend(
            merged
                .into_iter()
                .map(|item| mandatory_plan(MANDATORY_COVERAGE_MODULE, item)),
        );
        plans
    }
}

impl Default for TaskPlanner {
    fn default() -> Self {
        Self::new()
    }
}

fn mandatory_plan(module: &str, item: String) -> Plan {
    let instruction = format!(
        "Test points MUST be generated to cover this mandatory topic:\n\
         [{item}]\n\
         \n\
         Requirements:\n\
         - split the topic into several test points, never a single sentence\n\
         - normal flow, exceptional cases and boundary conditions must all be represented\n\
         - happy-path-only output is not acceptable\n\
         - for networking, ordering or financial calculations include failure and extreme scenarios"
    );
    Plan::mandatory(module, item, instruction)
}

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}
