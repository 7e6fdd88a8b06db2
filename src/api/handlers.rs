//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::admission::AdmissionSnapshot;
use crate::context::CacheContext;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, HealthResponse, LookupResponse, PutRequest, PutResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide caching state
    pub context: Arc<CacheContext>,
}

impl AppState {
    /// Creates a new AppState around the given context.
    pub fn new(context: Arc<CacheContext>) -> Self {
        Self { context }
    }
}

/// Handler for PUT /cache
///
/// Stores a value through the active backend, optionally with a TTL.
pub async fn put_handler(
    State(state): State<AppState>,
    Json(req): Json<PutRequest>,
) -> Result<Json<PutResponse>> {
    req.validate()?;

    state
        .context
        .orchestrator()
        .put(&req.key, &req.value, req.ttl_seconds)
        .await?;

    Ok(Json(PutResponse::new(req.key)))
}

/// Handler for GET /cache/:key
///
/// Reads a value without computing anything on a miss.
pub async fn lookup_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<LookupResponse>> {
    match state.context.orchestrator().lookup(&key).await? {
        Some(value) => Ok(Json(LookupResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /cache/:prefix
///
/// Removes every key starting with the prefix.
pub async fn clear_handler(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> Result<Json<ClearResponse>> {
    let removed = state
        .context
        .orchestrator()
        .clear_by_prefix(&prefix)
        .await?;

    Ok(Json(ClearResponse::new(prefix, removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let context = &state.context;

    Json(StatsResponse::new(
        context.orchestrator().backend_kind(),
        context.store().stats(),
        context.admission().len(),
        context.lock().active_renewers(),
        context.lock().renewer_capacity(),
    ))
}

/// Handler for GET /admission
///
/// Returns the cold and hot segments, oldest key first.
pub async fn admission_handler(State(state): State<AppState>) -> Json<AdmissionSnapshot> {
    Json(state.context.admission().snapshot())
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.context.orchestrator().backend_kind(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    async fn test_state() -> AppState {
        let context = CacheContext::from_config(Config::default()).await.unwrap();
        AppState::new(Arc::new(context))
    }

    fn put_request(key: &str, value: serde_json::Value) -> PutRequest {
        PutRequest {
            key: key.to_string(),
            value,
            ttl_seconds: -1,
        }
    }

    #[tokio::test]
    async fn test_put_and_lookup_handler() {
        let state = test_state().await;

        let result = put_handler(
            State(state.clone()),
            Json(put_request("test_key", json!({"v": 1}))),
        )
        .await;
        assert!(result.is_ok());

        let response = lookup_handler(State(state), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"v": 1}));
    }

    #[tokio::test]
    async fn test_lookup_missing_key() {
        let state = test_state().await;

        let result = lookup_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_clear_handler() {
        let state = test_state().await;
        for key in ["user:1", "user:2", "team:1"] {
            put_handler(State(state.clone()), Json(put_request(key, json!(1))))
                .await
                .unwrap();
        }

        let response = clear_handler(State(state.clone()), Path("user:".to_string()))
            .await
            .unwrap();
        assert_eq!(response.removed, 2);

        let result = lookup_handler(State(state), Path("user:1".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state().await;

        let response = stats_handler(State(state)).await;
        assert_eq!(response.backend, "local");
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
        assert_eq!(response.active_renewers, 0);
        assert_eq!(response.renewer_capacity, 1024);
    }

    #[tokio::test]
    async fn test_admission_handler() {
        let state = test_state().await;
        put_handler(State(state.clone()), Json(put_request("k", json!(1))))
            .await
            .unwrap();

        let snapshot = admission_handler(State(state)).await;
        assert_eq!(snapshot.cold, vec!["k".to_string()]);
        assert!(snapshot.hot.is_empty());
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler(State(test_state().await)).await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_put_null_rejected() {
        let state = test_state().await;

        let result = put_handler(State(state), Json(put_request("k", json!(null)))).await;
        assert!(matches!(result, Err(CacheError::InvalidValue(_))));
    }
}
