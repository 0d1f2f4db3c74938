//! Progress events streamed to clients while a workflow runs.

use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::state::{Report, Source};

pub const PROGRESS_PLANNING: u8 = 10;
pub const PROGRESS_PLAN_COMPLETE: u8 = 33;
pub const PROGRESS_SEARCHING: u8 = 40;
pub const PROGRESS_SEARCH_COMPLETE: u8 = 66;
pub const PROGRESS_SYNTHESIZING: u8 = 75;
pub const PROGRESS_SYNTHESIS_COMPLETE: u8 = 90;
pub const PROGRESS_DONE: u8 = 100;

/// Number of sources echoed in the `sources` event payload.
const SOURCES_SAMPLE: usize = 5;

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// One event in the stream. `Done` and `Error` are terminal; the workflow
/// emits at most one of them, last.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Status { phase: &'static str },
    Log { message: String },
    Progress { percent: u8 },
    Plan { text: String },
    Sources { count: usize, top: Vec<Source> },
    Done { report: Report },
    Error { message: String },
}

impl ProgressEvent {
    pub fn sources(all: &[Source]) -> Self {
        Self::Sources {
            count: all.len(),
            top: all.iter().take(SOURCES_SAMPLE).cloned().collect(),
        }
    }

    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Log { .. } => "log",
            Self::Progress { .. } => "progress",
            Self::Plan { .. } => "plan",
            Self::Sources { .. } => "sources",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// SSE event payload.
    pub fn payload(&self) -> Value {
        match self {
            Self::Status { phase } => json!({ "phase": phase }),
            Self::Log { message } => json!({ "msg": message }),
            Self::Progress { percent } => json!({ "percent": percent }),
            Self::Plan { text } => json!({ "text": text }),
            Self::Sources { count, top } => json!({ "count": count, "top": top }),
            Self::Done { report } => json!({ "report": report }),
            Self::Error { message } => json!({ "message": message }),
        }
    }
}

pub(crate) fn emit(tx: &Option<ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}
