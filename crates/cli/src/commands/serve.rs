//! Serve command handler.

use crate::server::{create_router, handlers::AppState, wait_for_signal};
use civic_core::{config::AppConfig, AppError, AppResult};
use civic_knowledge::Pipeline;
use clap::Args;
use std::sync::Arc;

/// Run the HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Socket address to bind (e.g., 0.0.0.0:8001)
    #[arg(short, long, env = "CIVIC_BIND")]
    pub bind: Option<String>,

    /// Load collections lazily on the first question
    #[arg(long)]
    pub no_preload: bool,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        config.validate_credentials()?;
        let pipeline = Arc::new(Pipeline::from_config(config)?);

        if config.server.preload && !self.no_preload {
            for stats in pipeline.preload().await? {
                tracing::info!(
                    collection = %stats.collection,
                    documents = stats.documents,
                    rankable = stats.rankable,
                    "Collection ready"
                );
            }
        }

        let app = create_router(AppState { pipeline });

        let listener = tokio::net::TcpListener::bind(&config.server.bind)
            .await
            .map_err(|e| {
                AppError::Config(format!("Failed to bind {}: {}", config.server.bind, e))
            })?;
        tracing::info!("Listening on {}", config.server.bind);

        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}
