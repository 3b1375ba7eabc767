//! Core types for casegen
//!
//! Defines the data model shared by every stage:
//! - run identifiers
//! - plans emitted by the planner
//! - test points and test cases
//! - structured requirement breakdowns

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ulid::Ulid;

/// Precondition written when the generator leaves it blank
pub const NO_PRECONDITION: &str = "no special precondition";

/// Module name used when neither the generator nor the plan names one
pub const UNCLASSIFIED_MODULE: &str = "unclassified module";

/// Module name for breakdown modules the generator left unnamed
pub const UNNAMED_MODULE: &str = "unnamed module";

/// Module attached to focus plans derived from plain-text requirements
pub const USER_FOCUS_MODULE: &str = "User Focus";

/// Module attached to mandatory plans derived from a structured breakdown
pub const MANDATORY_COVERAGE_MODULE: &str = "Mandatory Coverage";

/// Unique run identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of sub-task produced by the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// Fixed general-purpose sub-task for plain-text requirements
    General,
    /// Whole-module analysis
    Module,
    /// One requirement line inside a module
    ModuleRequirement,
    /// Mandatory coverage topic
    Mandatory,
}

/// One planner sub-task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Sub-task kind
    pub kind: PlanKind,
    /// Owning module, if any
    pub module: Option<String>,
    /// Instruction handed to the test-point generator
    pub instruction: String,
    /// Mandatory topic (set only for `PlanKind::Mandatory`)
    pub coverage_item: Option<String>,
}

impl Plan {
    /// Create a general plan
    #[inline]
    #[must_use]
    pub fn general(instruction: impl Into<String>) -> Self {
        Self {
            kind: PlanKind::General,
            module: None,
            instruction: instruction.into(),
            coverage_item: None,
        }
    }

    /// Create a module-scoped plan
    #[inline]
    #[must_use]
    pub fn for_module(
        kind: PlanKind,
        module: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            module: Some(module.into()),
            instruction: instruction.into(),
            coverage_item: None,
        }
    }

    /// Create a mandatory plan
    #[inline]
    #[must_use]
    pub fn mandatory(
        module: impl Into<String>,
        coverage_item: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            kind: PlanKind::Mandatory,
            module: Some(module.into()),
            instruction: instruction.into(),
            coverage_item: Some(coverage_item.into()),
        }
    }

    /// Check if this plan forces coverage of a topic
    #[inline]
    #[must_use]
    pub fn is_mandatory(&self) -> bool {
        self.kind == PlanKind::Mandatory
    }
}

/// Provenance of a test point or case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Forced by a mandatory coverage topic
    Mandatory,
    /// Inferred by the generator
    Inferred,
}

/// A verifiable test point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPoint {
    /// Globally unique id (`TP-xxxxxxxx`)
    pub id: String,
    /// Display name
    pub name: String,
    /// Owning module
    pub module: String,
    /// Mandatory topic this point covers
    pub source_requirement: Option<String>,
    /// Provenance
    pub origin: Origin,
    /// Highlight flag, true exactly for mandatory points
    pub is_focus: bool,
    /// Priority label (`P0`..`P3`)
    pub priority: String,
    /// Category label (`functional`, `edge`, ...)
    pub category: String,
}

impl TestPoint {
    /// Fresh test point id
    #[must_use]
    pub fn new_id() -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        format!("TP-{}", &hex[..8])
    }

    /// Check if this point was forced by a mandatory topic
    #[inline]
    #[must_use]
    pub fn is_mandatory(&self) -> bool {
        self.origin == Origin::Mandatory
    }
}

/// Test points produced for one plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPointGroup {
    /// Module shared by every point in the group
    pub module: String,
    /// Points in generator order, padding last
    pub test_points: Vec<TestPoint>,
}

/// A fully populated test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Case title
    pub case_name: String,
    /// Owning module
    pub module: String,
    /// Source test point id (absent only on the system placeholder)
    pub test_point_id: Option<String>,
    /// Source test point name
    pub test_point_name: Option<String>,
    /// Provenance copied from the test point
    pub origin: Option<Origin>,
    /// Mandatory topic copied from the test point
    pub coverage_item: Option<String>,
    /// State required before execution, never empty
    pub precondition: String,
    /// Ordered execution steps
    pub steps: Vec<String>,
    /// Expected result
    pub expected: String,
}

impl TestCase {
    /// Check if this case counts toward focus statistics
    #[inline]
    #[must_use]
    pub fn is_focus_hit(&self) -> bool {
        self.origin == Some(Origin::Mandatory)
            || self.coverage_item.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// One module in a structured requirement breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleBreakdown {
    /// Module name
    pub module: String,
    /// Requirement lines for the module
    #[serde(default)]
    pub requirements: Vec<String>,
}

/// Requirement document split into modules plus mandatory topics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementBreakdown {
    /// Modules in document order
    #[serde(default)]
    pub modules: Vec<ModuleBreakdown>,
    /// Topics that must be covered
    #[serde(default)]
    pub mandatory_coverage: Vec<String>,
}

/// Planner input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementInput {
    /// Free-form requirement text
    Text(String),
    /// Already-structured breakdown
    Structured(RequirementBreakdown),
}

impl From<&str> for RequirementInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<RequirementBreakdown> for RequirementInput {
    fn from(breakdown: RequirementBreakdown) -> Self {
        Self::Structured(breakdown)
    }
}

/// Read a non-blank string field from a generator object
pub(crate) fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Render a JSON scalar or structure as display text
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Collect a JSON list into trimmed, non-blank strings
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| value_text(item).trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
