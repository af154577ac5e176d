// HTTP API
// POST /detect classifies a batch of reviews, GET /health reports model state

pub mod error;

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::models::{ClassificationResult, ReviewInput};
use crate::services::{BatchClassifier, BatchOptions, ExplanationClient, ModelSlot};

pub use error::ApiError;

/// Shared per-process state; the model is read-only after startup
#[derive(Clone)]
pub struct AppState {
    pub model: ModelSlot,
    pub explainer: Arc<dyn ExplanationClient>,
    pub options: BatchOptions,
}

impl AppState {
    pub fn new(model: ModelSlot, explainer: Arc<dyn ExplanationClient>, options: BatchOptions) -> Self {
        Self {
            model,
            explainer,
            options,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/detect", post(detect))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model_loaded": state.model.is_loaded(),
    }))
}

async fn detect(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<ClassificationResult>>, ApiError> {
    // Checked before touching the body
    let Some(model) = state.model.get().cloned() else {
        return Err(ApiError::ModelNotLoaded);
    };

    let request_id = Uuid::new_v4();
    let reviews = parse_reviews(&body)?;
    let classifier = BatchClassifier::new(model, state.explainer.clone(), state.options);

    let results = classifier
        .classify(&reviews)
        .instrument(info_span!("detect", %request_id, reviews = reviews.len()))
        .await?;

    Ok(Json(results))
}

/// Extract the reviews array. A missing body is treated as `{}`.
pub fn parse_reviews(body: &[u8]) -> Result<Vec<ReviewInput>, ApiError> {
    let payload: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(body)?
    };

    let Value::Object(mut fields) = payload else {
        return Err(ApiError::Internal("request body is not a JSON object".to_string()));
    };

    match fields.remove("reviews") {
        Some(Value::Array(items)) if !items.is_empty() => {
            Ok(serde_json::from_value(Value::Array(items))?)
        }
        _ => Err(ApiError::InvalidRequest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reviews() {
        let reviews = parse_reviews(br#"{"reviews": [{"review_text": "hi"}, {}]}"#).unwrap();
        assert_eq!(reviews, vec![ReviewInput::new("hi"), ReviewInput::default()]);
    }

    #[test]
    fn test_parse_reviews_invalid_shapes() {
        assert!(matches!(parse_reviews(b"{}"), Err(ApiError::InvalidRequest)));
        assert!(matches!(parse_reviews(b""), Err(ApiError::InvalidRequest)));
        assert!(matches!(parse_reviews(br#"{"reviews": "text"}"#), Err(ApiError::InvalidRequest)));
        assert!(matches!(parse_reviews(br#"{"reviews": []}"#), Err(ApiError::InvalidRequest)));
        assert!(matches!(parse_reviews(br#"{"reviews": null}"#), Err(ApiError::InvalidRequest)));
    }

    #[test]
    fn test_parse_reviews_malformed_is_internal() {
        assert!(matches!(parse_reviews(b"{not json"), Err(ApiError::Internal(_))));
        assert!(matches!(parse_reviews(b"[1, 2]"), Err(ApiError::Internal(_))));
        assert!(matches!(parse_reviews(br#"{"reviews": ["plain"]}"#), Err(ApiError::Internal(_))));
    }
}
