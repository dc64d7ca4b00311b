//! Read-only HTTP API over the pipeline's results.
//!
//! Routes:
//! - `GET /`
//! - `GET /api/deg/:treatment?p_value_threshold=0.05`
//! - `GET /api/deg/:treatment/genes?p_value_threshold=0.05`
//! - `GET /api/pathways/:treatment`
//! - `GET /api/go-terms/:treatment`

mod config;
mod error;
pub mod handlers;
mod repository;

pub use config::{DataSource, ServiceConfig};
pub use error::ApiError;
pub use repository::{
    FileRepository, GenePoint, RepoResult, RepositoryError, StubRepository, SummaryRepository,
    GO_TERM_ALPHA,
};

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// State shared by all handlers.
pub struct AppState {
    pub config: ServiceConfig,
    pub repository: Arc<dyn SummaryRepository>,
}

impl AppState {
    /// Build the state with the repository named by `config.source`.
    pub fn new(config: ServiceConfig) -> Self {
        let repository: Arc<dyn SummaryRepository> = match config.source {
            DataSource::Files => Arc::new(FileRepository::new(config.processed_dir.clone())),
            DataSource::Stub => Arc::new(StubRepository),
        };
        Self { config, repository }
    }

    pub fn with_repository(config: ServiceConfig, repository: Arc<dyn SummaryRepository>) -> Self {
        Self { config, repository }
    }

    /// Reject treatments outside the configured set.
    pub fn check_treatment(&self, treatment: &str) -> Result<(), ApiError> {
        if self.config.is_valid_treatment(treatment) {
            Ok(())
        } else {
            Err(ApiError::BadRequest(self.config.invalid_treatment_message()))
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/deg/:treatment", get(handlers::get_deg))
        .route("/api/deg/:treatment/genes", get(handlers::get_deg_genes))
        .route("/api/pathways/:treatment", get(handlers::get_pathways))
        .route("/api/go-terms/:treatment", get(handlers::get_go_terms))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl-C or SIGTERM.
pub async fn serve(config: ServiceConfig) -> std::io::Result<()> {
    let bind = config.bind;
    let source = config.source;
    let processed_dir = config.processed_dir.clone();
    let app = create_router(Arc::new(AppState::new(config)));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        %source,
        processed_dir = %processed_dir.display(),
        "RNAlytics API listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
