use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use researchd::api::{self, ApiState};
use researchd::config::Settings;
use researchd::memory::RollingBuffer;
use researchd::workflow::LiveCapabilities;

fn load_env_file() {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(error = %e, "could not determine current directory for .env lookup");
            return;
        }
    };

    // Search the current directory and ancestors so running from a
    // subdirectory still picks up the repo-root .env.
    let mut current = cwd.clone();
    loop {
        let candidate = current.join(".env");
        if candidate.exists() {
            match dotenvy::from_path(&candidate) {
                Ok(_) => {
                    tracing::info!(path = %candidate.display(), "loaded environment from .env");
                }
                Err(e) => {
                    tracing::warn!(
                        path = %candidate.display(),
                        error = %e,
                        "failed to load .env file"
                    );
                }
            }
            return;
        }

        if !current.pop() {
            break;
        }
    }

    tracing::info!(
        cwd = %cwd.display(),
        "no .env file found in current directory or ancestors; using process environment only"
    );
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    load_env_file();
    let settings = Arc::new(Settings::from_env());

    let state = ApiState {
        memory: RollingBuffer::shared(settings.max_messages),
        capabilities: Arc::new(LiveCapabilities::new(settings.clone())),
        settings,
    };

    let bind_addr = state.settings.bind_addr.clone();
    let app = api::router()
        .with_state(state)
        .layer(api::cors_layer());

    tracing::info!(addr = %bind_addr, "starting HTTP server");
    let listener = TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}
