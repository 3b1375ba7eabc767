//! Run event stream
//!
//! The producer side of a run pushes [`StreamEvent`]s into a bounded channel;
//! the consumer side reads them through [`EventStream`], which inserts a
//! heartbeat whenever nothing arrived for one heartbeat interval.

use crate::config::PipelineConfig;
use crate::coverage::{CoverageResult, CoverageStatus, FocusHitStats};
use crate::error::PipelineError;
use crate::types::{ModuleBreakdown, RunId, TestCase, TestPointGroup};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// One labeled stage unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Run started
    Meta {
        /// Run id
        run_id: RunId,
        /// Human-readable note
        message: String,
    },
    /// Modules stage result
    Modules {
        /// Modules in document order
        modules: Vec<ModuleBreakdown>,
        /// Mandatory topics for the run
        mandatory_coverage: Vec<String>,
        /// Why the stage fell back, if it did
        fallback_reason: Option<String>,
    },
    /// Test-points stage result
    TestPoints {
        /// Groups in plan order
        groups: Vec<TestPointGroup>,
        /// Plans whose expansion fell back
        fallbacks: usize,
    },
    /// One case, display-cleaned
    Case {
        /// Zero-based position in the run
        index: usize,
        /// The case
        case: TestCase,
    },
    /// Run finished
    Done {
        /// Number of cases emitted
        total: usize,
        /// Overall coverage verdict
        status: CoverageStatus,
        /// Per-topic coverage
        coverage: CoverageResult,
        /// Focus statistics
        focus: FocusHitStats,
    },
    /// Run aborted
    Error {
        /// Failure description
        message: String,
    },
    /// Liveness signal while the producer is busy
    Heartbeat,
}

impl StreamEvent {
    /// Wire label
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Meta { .. } => "meta",
            Self::Modules { .. } => "modules",
            Self::TestPoints { .. } => "test_points",
            Self::Case { .. } => "case",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
            Self::Heartbeat => "heartbeat",
        }
    }

    /// Check if this is a terminal event
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Producer half
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSender {
    /// Hand one event to the consumer, waiting for channel room
    ///
    /// # Errors
    /// Returns `PipelineError::Cancelled` if the consumer is gone.
    pub async fn emit(&self, event: StreamEvent) -> Result<(), PipelineError> {
        self.tx.send(event).await.map_err(|_| PipelineError::Cancelled)
    }

    /// Check if the consumer cancelled or dropped the stream
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<StreamEvent>,
    heartbeat: Duration,
}

impl EventStream {
    /// Next event; a heartbeat if none arrived within the interval, `None`
    /// once the producer is finished and the buffer is drained
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        match tokio::time::timeout(self.heartbeat, self.rx.recv()).await {
            Ok(event) => event,
            Err(_) => Some(StreamEvent::Heartbeat),
        }
    }

    /// Stop the run; buffered events can still be read
    pub fn cancel(&mut self) {
        self.rx.close();
    }

    /// Adapt into a `futures` stream
    pub fn into_stream(self) -> impl Stream<Item = StreamEvent> + Send {
        stream::unfold(self, |mut events| async move {
            events.next_event().await.map(|event| (event, events))
        })
    }
}

/// Bounded event channel sized by `config`
#[must_use]
pub fn channel(config: &PipelineConfig) -> (EventSender, EventStream) {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    (
        EventSender { tx },
        EventStream {
            rx,
            heartbeat: config.heartbeat_interval(),
        },
    )
}
