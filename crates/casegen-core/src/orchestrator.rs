//! Streaming orchestrator
//!
//! Drives one run through `modules -> test_points -> cases -> done`:
//! 1. modules: requirement breakdown, one synthetic module on failure
//! 2. test points: one expansion per plan, grouped by module in plan order
//! 3. cases: per-point expansion under one stage-wide deadline
//! 4. done: coverage verdict and focus statistics
//!
//! Generator failures inside a stage become fallbacks. A run ends early only
//! on an empty requirement, a vanished consumer, or a dead producer task, and
//! then with an explicit `error` event.

use crate::analyzer::{AnalysisResult, RequirementAnalyzer};
use crate::config::{PipelineConfig, MAX_CASES_TIMEOUT_SECS};
use crate::context::{merge_generation_context, GenerationWeights};
use crate::coverage::{self, CoverageResult, CoverageStatus, FocusHitStats};
use crate::display::display_case;
use crate::error::{PipelineError, WorkerError};
use crate::outcome::StageOutcome;
use crate::planner::TaskPlanner;
use crate::stream::{self, EventSender, EventStream, StreamEvent};
use crate::test_case::{placeholder_case, TestCaseGenerator};
use crate::test_point::TestPointGenerator;
use crate::types::{
    ModuleBreakdown, Plan, RequirementBreakdown, RequirementInput, RunId, TestCase, TestPoint,
    TestPointGroup, UNCLASSIFIED_MODULE,
};
use casegen_llm::SharedClient;
use futures::StreamExt;
use indexmap::IndexMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Characters of requirement text kept in synthetic module requirements
const SYNTHETIC_REQUIREMENT_CHARS: usize = 500;

/// Input for one run
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Run id
    pub run_id: RunId,
    /// Requirement document text
    pub requirement: String,
    /// Raw user focus topics
    pub focus: Option<String>,
    /// Free-form user requirement
    pub user_requirement: Option<String>,
    /// Prior quality analysis
    pub analysis: Option<AnalysisResult>,
    /// Test points from a prior analysis; skips the modules and test-points stages
    pub test_points: Option<Vec<TestPoint>>,
}

impl RunRequest {
    /// Create new request
    #[inline]
    #[must_use]
    pub fn new(requirement: impl Into<String>) -> Self {
        Self {
            requirement: requirement.into(),
            ..Self::default()
        }
    }

    /// With focus topics
    #[inline]
    #[must_use]
    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }

    /// With user requirement
    #[inline]
    #[must_use]
    pub fn with_user_requirement(mut self, text: impl Into<String>) -> Self {
        self.user_requirement = Some(text.into());
        self
    }

    /// With prior analysis
    #[inline]
    #[must_use]
    pub fn with_analysis(mut self, analysis: AnalysisResult) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// With precomputed test points
    #[inline]
    #[must_use]
    pub fn with_test_points(mut self, test_points: Vec<TestPoint>) -> Self {
        self.test_points = Some(test_points);
        self
    }
}

/// Test-points stage result
#[derive(Debug, Clone, PartialEq)]
pub struct TestPointsReport {
    /// Non-empty groups in plan order
    pub groups: Vec<TestPointGroup>,
    /// Plans whose expansion fell back
    pub fallbacks: usize,
}

impl TestPointsReport {
    /// All points, group by group
    #[must_use]
    pub fn test_points(&self) -> Vec<TestPoint> {
        self.groups
            .iter()
            .flat_map(|g| g.test_points.iter().cloned())
            .collect()
    }
}

/// Cases stage input
#[derive(Debug, Clone, Default)]
pub struct CasesInput {
    /// Raw requirement text
    pub requirement: String,
    /// Focus topics
    pub focus: Option<String>,
    /// Free-form user requirement
    pub user_requirement: Option<String>,
    /// Prior analysis
    pub analysis: Option<AnalysisResult>,
    /// Points to expand, in order
    pub test_points: Vec<TestPoint>,
    /// Topics checked for coverage
    pub mandatory_items: Vec<String>,
}

/// Cases stage result
#[derive(Debug, Clone, PartialEq)]
pub struct CasesReport {
    /// Collected cases, uncleaned
    pub cases: Vec<TestCase>,
    /// Per-topic coverage
    pub coverage: CoverageResult,
    /// Overall verdict
    pub status: CoverageStatus,
    /// Focus statistics
    pub focus: FocusHitStats,
    /// Points whose cases were synthesized
    pub fallbacks: usize,
}

/// Everything a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Run id
    pub run_id: RunId,
    /// Modules stage output; `None` when test points were supplied
    pub breakdown: Option<RequirementBreakdown>,
    /// Points expanded into cases
    pub test_points: Vec<TestPoint>,
    /// Collected cases
    pub cases: Vec<TestCase>,
    /// Per-topic coverage
    pub coverage: CoverageResult,
    /// Overall verdict
    pub status: CoverageStatus,
    /// Focus statistics
    pub focus: FocusHitStats,
}

/// Quality analysis plus derived test points
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Quality analysis
    pub analysis: AnalysisResult,
    /// Test points planned from the plain text
    pub test_points: Vec<TestPoint>,
    /// Mandatory topics from the focus text
    pub mandatory_items: Vec<String>,
}

/// A run in flight
#[derive(Debug)]
pub struct RunHandle {
    /// Run id
    pub run_id: RunId,
    /// Consumer side of the event channel
    pub events: EventStream,
    /// Producer task
    pub outcome: JoinHandle<Result<RunSummary, PipelineError>>,
}

impl RunHandle {
    /// Drain every event, then wait for the producer; heartbeats are dropped
    pub async fn collect(mut self) -> (Vec<StreamEvent>, Result<RunSummary, PipelineError>) {
        let mut events = Vec::new();
        while let Some(event) = self.events.next_event().await {
            if event != StreamEvent::Heartbeat {
                events.push(event);
            }
        }
        (events, join_outcome(self.outcome).await)
    }

    /// Discard events and wait for the summary
    ///
    /// # Errors
    /// Whatever the run failed with.
    pub async fn finish(self) -> Result<RunSummary, PipelineError> {
        self.collect().await.1
    }
}

pub(crate) async fn join_outcome<T>(
    handle: JoinHandle<Result<T, PipelineError>>,
) -> Result<T, PipelineError> {
    handle
        .await
        .unwrap_or_else(|e| Err(WorkerError::Panicked(e.to_string()).into()))
}

/// Pipeline driver
#[derive(Clone)]
pub struct Orchestrator {
    client: SharedClient,
    config: PipelineConfig,
    weights: GenerationWeights,
    planner: TaskPlanner,
    analyzer: RequirementAnalyzer,
    points: TestPointGenerator,
    cases: TestCaseGenerator,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("client", &self.client.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create new orchestrator
    ///
    /// # Errors
    /// Returns `PipelineError::Config` if `config` is invalid.
    pub fn new(client: SharedClient, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            planner: TaskPlanner::new().with_separators(config.focus_separators.clone()),
            analyzer: RequirementAnalyzer::new(client.clone()),
            points: TestPointGenerator::new(client.clone())
                .with_min_mandatory_points(config.mandatory_min_points),
            cases: TestCaseGenerator::new(client.clone())
                .with_fallback_per_point(config.fallback_cases_per_point),
            weights: GenerationWeights::default(),
            client,
            config,
        })
    }

    /// With context weights
    #[inline]
    #[must_use]
    pub fn with_weights(mut self, weights: GenerationWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Planner used for runs
    #[inline]
    #[must_use]
    pub fn planner(&self) -> &TaskPlanner {
        &self.planner
    }

    /// Start a run on a new task. Must be called inside a tokio runtime.
    #[must_use]
    pub fn run(&self, request: RunRequest) -> RunHandle {
        let (tx, events) = stream::channel(&self.config);
        let run_id = request.run_id;
        let this = self.clone();
        let outcome = tokio::spawn(async move {
            let result = this.execute(&tx, request).await;
            match &result {
                Err(e) if e.is_cancelled() => {
                    tracing::info!(run_id = %run_id, "run cancelled by consumer");
                }
                Err(e) => {
                    tracing::error!(run_id = %run_id, error = %e, "run failed");
                    let event = StreamEvent::Error {
                        message: e.to_string(),
                    };
                    if tx.emit(event).await.is_err() {
                        tracing::debug!(run_id = %run_id, "consumer gone before error event");
                    }
                }
                Ok(_) => {}
            }
            result
        });
        RunHandle {
            run_id,
            events,
            outcome,
        }
    }

    async fn execute(
        &self,
        tx: &EventSender,
        request: RunRequest,
    ) -> Result<RunSummary, PipelineError> {
        let run_id = request.run_id;
        let requirement = request.requirement.trim().to_string();
        if requirement.is_empty() {
            return Err(PipelineError::EmptyRequirement);
        }
        let focus = request
            .focus
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        tracing::info!(run_id = %run_id, client = self.client.name(), "run started");
        tx.emit(StreamEvent::Meta {
            run_id,
            message: format!("generating with {}", self.client.name()),
        })
        .await?;

        let (breakdown, test_points, mandatory_items) = match request.test_points {
            Some(points) if !points.is_empty() => {
                let input = RequirementInput::Text(requirement.clone());
                let mandatory = self.planner.mandatory_items(&input, focus.as_deref());
                tx.emit(StreamEvent::TestPoints {
                    groups: group_by_module(&points),
                    fallbacks: 0,
                })
                .await?;
                (None, points, mandatory)
            }
            _ => {
                let modules = self
                    .stage_modules(&requirement, request.user_requirement.as_deref())
                    .await;
                let fallback_reason = modules.reason().map(str::to_string);
                let breakdown = modules.into_value();
                let input = RequirementInput::Structured(breakdown.clone());
                let mandatory = self.planner.mandatory_items(&input, focus.as_deref());
                tx.emit(StreamEvent::Modules {
                    modules: breakdown.modules.clone(),
                    mandatory_coverage: mandatory.clone(),
                    fallback_reason,
                })
                .await?;

                let plans = self.planner.make_plan(&input, focus.as_deref());
                let report = self.expand_plans(&plans, &|| tx.is_cancelled()).await?;
                tx.emit(StreamEvent::TestPoints {
                    groups: report.groups.clone(),
                    fallbacks: report.fallbacks,
                })
                .await?;
                (Some(breakdown), report.test_points(), mandatory)
            }
        };

        tracing::info!(
            run_id = %run_id,
            test_points = test_points.len(),
            mandatory = mandatory_items.len(),
            "entering cases stage"
        );
        let report = self
            .stream_cases(
                tx,
                CasesInput {
                    requirement,
                    focus,
                    user_requirement: request.user_requirement,
                    analysis: request.analysis,
                    test_points: test_points.clone(),
                    mandatory_items,
                },
            )
            .await?;
        tracing::info!(
            run_id = %run_id,
            total = report.cases.len(),
            fallbacks = report.fallbacks,
            status = %report.status,
            "run finished"
        );

        Ok(RunSummary {
            run_id,
            breakdown,
            test_points,
            cases: report.cases,
            coverage: report.coverage,
            status: report.status,
            focus: report.focus,
        })
    }

    /// Modules stage. Never fails.
    pub async fn stage_modules(
        &self,
        requirement: &str,
        user_requirement: Option<&str>,
    ) -> StageOutcome<RequirementBreakdown> {
        match self.analyzer.analyze(requirement, user_requirement).await {
            Ok(breakdown) if !breakdown.modules.is_empty() => {
                tracing::debug!(modules = breakdown.modules.len(), "modules stage generated");
                StageOutcome::generated(breakdown)
            }
            Ok(breakdown) => {
                tracing::warn!("modules stage returned no modules, using synthetic module");
                StageOutcome::fell_back(
                    RequirementBreakdown {
                        modules: vec![synthetic_module(requirement)],
                        mandatory_coverage: breakdown.mandatory_coverage,
                    },
                    "generator returned no modules",
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "modules stage fell back");
                StageOutcome::fell_back(
                    RequirementBreakdown {
                        modules: vec![synthetic_module(requirement)],
                        mandatory_coverage: Vec::new(),
                    },
                    e.to_string(),
                )
            }
        }
    }

    /// Test-points stage: one expansion per plan, in plan order
    ///
    /// # Errors
    /// Returns `PipelineError::EmptyTestPoints` if not even a synthetic point
    /// could be produced.
    pub async fn stage_test_points(&self, plans: &[Plan]) -> Result<TestPointsReport, PipelineError> {
        self.expand_plans(plans, &|| false).await
    }

    /// Test-points stage that stops scheduling plans once `cancelled` holds
    async fn expand_plans(
        &self,
        plans: &[Plan],
        cancelled: &(dyn Fn() -> bool + Send + Sync),
    ) -> Result<TestPointsReport, PipelineError> {
        let mut by_module: IndexMap<String, Vec<TestPoint>> = IndexMap::new();
        let mut fallbacks = 0;

        for (done, plan) in plans.iter().enumerate() {
            if cancelled() {
                tracing::info!(remaining = plans.len() - done, "test-points stage cancelled");
                return Err(PipelineError::Cancelled);
            }
            let outcome = self.points.expand(plan).await;
            if outcome.is_fallback() {
                fallbacks += 1;
            }
            let group = outcome.into_value();
            by_module
                .entry(group.module)
                .or_default()
                .extend(group.test_points);
        }

        let mut groups: Vec<TestPointGroup> = by_module
            .into_iter()
            .filter(|(_, points)| !points.is_empty())
            .map(|(module, test_points)| TestPointGroup {
                module,
                test_points,
            })
            .collect();

        if groups.is_empty() {
            tracing::warn!(plans = plans.len(), "no test points produced, using synthetic group");
            let group = self
                .points
                .fallback_group(&Plan::general("cover the requirement as a whole"));
            if group.test_points.is_empty() {
                return Err(PipelineError::EmptyTestPoints);
            }
            groups.push(group);
            fallbacks += 1;
        }

        Ok(TestPointsReport { groups, fallbacks })
    }

    /// Cases stage: stream every case, then the `done` event
    ///
    /// Cases for one point are all emitted before the next point starts.
    ///
    /// # Errors
    /// - `PipelineError::EmptyTestPoints` if `input` has no points
    /// - `PipelineError::Cancelled` if the consumer went away
    pub async fn stream_cases(
        &self,
        tx: &EventSender,
        input: CasesInput,
    ) -> Result<CasesReport, PipelineError> {
        if input.test_points.is_empty() {
            return Err(PipelineError::EmptyTestPoints);
        }

        let context = merge_generation_context(
            &input.requirement,
            input.user_requirement.as_deref(),
            input.focus.as_deref(),
            input.analysis.as_ref(),
            self.weights,
        );
        let deadline = stage_deadline(self.config.cases_timeout());
        let mut per_point = Box::pin(self.cases.expand_many(
            context.merged_requirements,
            input.focus.clone(),
            input.test_points.clone(),
            deadline,
        ));

        let mut cases: Vec<TestCase> = Vec::new();
        let mut fallbacks = 0;
        loop {
            if tx.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let Some(point_cases) = per_point.next().await else {
                break;
            };
            if point_cases.outcome.is_fallback() {
                fallbacks += 1;
            }
            for case in point_cases.outcome.into_value() {
                tx.emit(StreamEvent::Case {
                    index: cases.len(),
                    case: display_case(&case),
                })
                .await?;
                cases.push(case);
            }
        }

        if cases.is_empty() {
            tracing::error!("cases stage produced nothing, emitting placeholder");
            let case = placeholder_case("no test cases were produced");
            tx.emit(StreamEvent::Case {
                index: 0,
                case: display_case(&case),
            })
            .await?;
            cases.push(case);
        }

        let coverage = coverage::check(&input.mandatory_items, &input.test_points);
        let status = coverage.status();
        let focus = coverage::focus_hit_stats(&cases);
        if status == CoverageStatus::PartiallyCovered {
            tracing::warn!(uncovered = ?coverage.uncovered(), "mandatory topics left uncovered");
        }
        tx.emit(StreamEvent::Done {
            total: cases.len(),
            status,
            coverage: coverage.clone(),
            focus,
        })
        .await?;

        Ok(CasesReport {
            cases,
            coverage,
            status,
            focus,
            fallbacks,
        })
    }

    /// Quality analysis plus test points planned from the plain text
    ///
    /// # Errors
    /// - `PipelineError::EmptyRequirement` / `RequirementTooShort` for unusable text
    /// - `PipelineError::Generation` if the quality call fails
    pub async fn analyze(&self, text: &str, focus: Option<&str>) -> Result<AnalysisReport, PipelineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::EmptyRequirement);
        }
        let actual = text.chars().count();
        if actual < self.config.min_analysis_chars {
            return Err(PipelineError::RequirementTooShort {
                actual,
                min: self.config.min_analysis_chars,
            });
        }

        let mut analysis = self.analyzer.analyze_quality(text, focus).await?;
        let input = RequirementInput::Text(text.to_string());
        let plans = self.planner.make_plan(&input, focus);
        let test_points = self.stage_test_points(&plans).await?.test_points();
        if analysis.requirements.is_empty() {
            analysis.requirements = test_points.iter().map(|tp| tp.name.clone()).collect();
        }
        tracing::info!(
            quality = analysis.summary.quality,
            test_points = test_points.len(),
            "requirement analyzed"
        );

        Ok(AnalysisReport {
            analysis,
            test_points,
            mandatory_items: self.planner.mandatory_items(&input, focus),
        })
    }
}

fn stage_deadline(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(Duration::from_secs(MAX_CASES_TIMEOUT_SECS)))
        .unwrap_or(now)
}

fn synthetic_module(requirement: &str) -> ModuleBreakdown {
    let head: String = requirement.chars().take(SYNTHETIC_REQUIREMENT_CHARS).collect();
    ModuleBreakdown {
        module: UNCLASSIFIED_MODULE.to_string(),
        requirements: vec![head.trim().to_string()],
    }
}

fn group_by_module(points: &[TestPoint]) -> Vec<TestPointGroup> {
    let mut by_module: IndexMap<&str, Vec<TestPoint>> = IndexMap::new();
    for point in points {
        by_module
            .entry(point.module.as_str())
            .or_default()
            .push(point.clone());
    }
    by_module
        .into_iter()
        .map(|(module, test_points)| TestPointGroup {
            module: module.to_string(),
            test_points,
        })
        .collect()
}
