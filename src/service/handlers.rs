//! Route handlers.

use crate::service::error::ApiError;
use crate::service::repository::{GenePoint, RepoResult, SummaryRepository};
use crate::service::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub const DEFAULT_P_VALUE_THRESHOLD: f64 = 0.05;

#[derive(Debug, Deserialize)]
pub struct ThresholdQuery {
    pub p_value_threshold: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DegResponse {
    pub treatment: String,
    pub deg_count: usize,
    pub threshold: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PathwayResponse {
    pub treatment: String,
    pub top_pathway: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoTermsResponse {
    pub treatment: String,
    pub significant_terms: usize,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to RNAlytics API" }))
}

pub async fn get_deg(
    State(state): State<Arc<AppState>>,
    Path(treatment): Path<String>,
    query: Result<Query<ThresholdQuery>, QueryRejection>,
) -> Result<Json<DegResponse>, ApiError> {
    state.check_treatment(&treatment)?;
    let threshold = threshold(query)?;
    let deg_count = {
        let treatment = treatment.clone();
        query_repository(&state, move |repo| repo.deg_count(&treatment, threshold)).await?
    };

    Ok(Json(DegResponse {
        treatment,
        deg_count,
        threshold,
    }))
}

pub async fn get_deg_genes(
    State(state): State<Arc<AppState>>,
    Path(treatment): Path<String>,
    query: Result<Query<ThresholdQuery>, QueryRejection>,
) -> Result<Json<Vec<GenePoint>>, ApiError> {
    state.check_treatment(&treatment)?;
    let threshold = threshold(query)?;
    let genes = query_repository(&state, move |repo| repo.genes(&treatment, threshold)).await?;
    Ok(Json(genes))
}

pub async fn get_pathways(
    State(state): State<Arc<AppState>>,
    Path(treatment): Path<String>,
) -> Result<Json<PathwayResponse>, ApiError> {
    state.check_treatment(&treatment)?;
    let top_pathway = {
        let treatment = treatment.clone();
        query_repository(&state, move |repo| repo.top_pathway(&treatment)).await?
    };
    Ok(Json(PathwayResponse {
        treatment,
        top_pathway,
    }))
}

pub async fn get_go_terms(
    State(state): State<Arc<AppState>>,
    Path(treatment): Path<String>,
) -> Result<Json<GoTermsResponse>, ApiError> {
    state.check_treatment(&treatment)?;
    let significant_terms = {
        let treatment = treatment.clone();
        query_repository(&state, move |repo| repo.significant_terms(&treatment)).await?
    };
    Ok(Json(GoTermsResponse {
        treatment,
        significant_terms,
    }))
}

/// Run a repository lookup on the blocking pool; file-backed lookups parse
/// whole CSV tables.
async fn query_repository<T, F>(state: &Arc<AppState>, lookup: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn SummaryRepository) -> RepoResult<T> + Send + 'static,
{
    let repository = Arc::clone(&state.repository);
    let result = tokio::task::spawn_blocking(move || lookup(repository.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("repository lookup failed: {}", e)))?;
    Ok(result?)
}

/// Threshold from the query string; must lie in (0, 1].
fn threshold(query: Result<Query<ThresholdQuery>, QueryRejection>) -> Result<f64, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let value = query.p_value_threshold.unwrap_or(DEFAULT_P_VALUE_THRESHOLD);
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(ApiError::BadRequest(format!(
            "p_value_threshold must be in (0, 1], got {}",
            value
        )))
    }
}
