//! Research workflow: plan, search, synthesize.
//!
//! `Workflow` drives the three phases over a typed [`WorkflowState`] and
//! streams [`ProgressEvent`]s to an optional channel. Provider and search
//! backends come from a [`Capabilities`] seam so the pipeline can run
//! against mocks in tests.

pub mod merge;
pub mod plan;
pub mod progress;
pub mod search;
pub mod state;
pub mod synthesize;

use std::sync::Arc;

use crate::config::Settings;
use crate::error::WorkflowError;
use crate::providers::{
    model_client, search_client, ModelClient, Provider, SearchClient, SearchEngine,
};

pub use self::progress::{ProgressEvent, ProgressSender};
pub use self::state::{Phase, Report, ResearchConfig, Source, WorkflowState};

use self::progress::emit;

/// Factory seam for external calls. Production wires real HTTP clients;
/// tests substitute scripted ones.
pub trait Capabilities: Send + Sync {
    fn model(
        &self,
        provider: Provider,
        model_override: Option<&str>,
    ) -> Result<Arc<dyn ModelClient>, WorkflowError>;

    fn search(&self, engine: SearchEngine) -> Result<Arc<dyn SearchClient>, WorkflowError>;
}

/// Real clients built from settings, one per call.
pub struct LiveCapabilities {
    settings: Arc<Settings>,
}

impl LiveCapabilities {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }
}

impl Capabilities for LiveCapabilities {
    fn model(
        &self,
        provider: Provider,
        model_override: Option<&str>,
    ) -> Result<Arc<dyn ModelClient>, WorkflowError> {
        model_client(&self.settings, provider, model_override)
    }

    fn search(&self, engine: SearchEngine) -> Result<Arc<dyn SearchClient>, WorkflowError> {
        search_client(&self.settings, engine)
    }
}

pub struct Workflow {
    settings: Arc<Settings>,
    caps: Arc<dyn Capabilities>,
    state: WorkflowState,
    progress: Option<ProgressSender>,
}

impl Workflow {
    pub fn new(settings: Arc<Settings>, caps: Arc<dyn Capabilities>, state: WorkflowState) -> Self {
        Self {
            settings,
            caps,
            state,
            progress: None,
        }
    }

    /// Attach a progress channel. Events are best-effort; a dropped
    /// receiver never stalls the workflow.
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Run all phases to completion, consuming the workflow. Exactly one
    /// terminal event (`Done` or `Error`) is emitted, and it is the last
    /// event on the channel.
    pub async fn run(mut self) -> Result<WorkflowState, WorkflowError> {
        match self.run_phases().await {
            Ok(()) => {
                emit(
                    &self.progress,
                    ProgressEvent::Progress {
                        percent: progress::PROGRESS_DONE,
                    },
                );
                if let Some(report) = self.state.report.clone() {
                    emit(&self.progress, ProgressEvent::Done { report });
                }
                Ok(self.state)
            }
            Err(e) => {
                tracing::error!(error = %e, "workflow failed");
                self.state.phase = Phase::Failed;
                emit(
                    &self.progress,
                    ProgressEvent::Error {
                        message: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    async fn run_phases(&mut self) -> Result<(), WorkflowError> {
        // Fail before any work if credentials cannot satisfy the request.
        let provider = self.settings.resolve_provider(self.state.config.provider)?;
        self.state.config.provider = provider;
        self.settings.validate_search_requirements()?;

        tracing::info!(
            query = %self.state.query,
            provider = %provider,
            template = self.state.config.template.as_str(),
            "workflow starting"
        );

        emit(&self.progress, ProgressEvent::Status { phase: "planning" });
        emit(
            &self.progress,
            ProgressEvent::Progress {
                percent: progress::PROGRESS_PLANNING,
            },
        );
        self.plan().await?;
        emit(
            &self.progress,
            ProgressEvent::Plan {
                text: self.state.plan.clone(),
            },
        );
        emit(
            &self.progress,
            ProgressEvent::Progress {
                percent: progress::PROGRESS_PLAN_COMPLETE,
            },
        );

        emit(
            &self.progress,
            ProgressEvent::Status {
                phase: "searching",
            },
        );
        emit(
            &self.progress,
            ProgressEvent::Progress {
                percent: progress::PROGRESS_SEARCHING,
            },
        );
        self.search().await?;
        emit(
            &self.progress,
            ProgressEvent::sources(&self.state.sources),
        );
        emit(
            &self.progress,
            ProgressEvent::Log {
                message: format!("Found {} unique sources", self.state.sources.len()),
            },
        );
        emit(
            &self.progress,
            ProgressEvent::Progress {
                percent: progress::PROGRESS_SEARCH_COMPLETE,
            },
        );

        emit(
            &self.progress,
            ProgressEvent::Status {
                phase: "synthesizing",
            },
        );
        emit(
            &self.progress,
            ProgressEvent::Progress {
                percent: progress::PROGRESS_SYNTHESIZING,
            },
        );
        self.synthesize().await?;
        emit(
            &self.progress,
            ProgressEvent::Progress {
                percent: progress::PROGRESS_SYNTHESIS_COMPLETE,
            },
        );

        Ok(())
    }
}
