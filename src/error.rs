//! Error taxonomy for the research workflow.
//!
//! Recoverable failures (timeouts, per-query search failures) are handled at
//! the call site with a substitute value and never reach the HTTP boundary.
//! Missing-credential errors propagate untouched and map to a 400 response;
//! anything else maps to a 500.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing credential: {0}")]
    MissingCredential(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Credential(#[from] ConfigError),
    #[error("model request exceeded {secs}s timeout")]
    ProviderTimeout { secs: u64 },
    #[error("model request failed ({provider}): {message}")]
    Provider { provider: String, message: String },
    #[error("search failed ({engine}): {message}")]
    SearchTool { engine: String, message: String },
}

impl WorkflowError {
    /// Whether this error is client-correctable (missing credential) rather
    /// than an internal failure.
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::Credential(_))
    }
}
