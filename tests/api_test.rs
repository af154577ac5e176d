// tests/api_test.rs
// Drives the /detect endpoint through the axum router

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use regex::Regex;
use serde_json::{json, Value};
use tower::ServiceExt;

use reviewtrust_lib::api::{create_router, AppState};
use reviewtrust_lib::services::classifier::ClassifierError;
use reviewtrust_lib::services::{
    BatchOptions, ExplanationClient, ModelSlot, ProviderError, ProviderFailurePolicy,
    ReviewClassifier,
};

/// Flags reviews mentioning "discount" as fake and counts inference calls
#[derive(Default)]
struct DiscountModel {
    predict_calls: AtomicUsize,
    proba_calls: AtomicUsize,
}

impl ReviewClassifier for DiscountModel {
    fn classes(&self) -> &[i64] {
        &[0, 1]
    }

    fn predict(&self, texts: &[String]) -> Result<Vec<i64>, ClassifierError> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| i64::from(t.to_lowercase().contains("discount")))
            .collect())
    }

    fn predict_proba(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, ClassifierError> {
        self.proba_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                if t.to_lowercase().contains("discount") {
                    vec![0.0421, 0.9579]
                } else {
                    vec![1.0, 0.0]
                }
            })
            .collect())
    }
}

struct ScriptedExplainer {
    reply: Result<String, u16>,
    calls: AtomicUsize,
}

impl ScriptedExplainer {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ExplanationClient for ScriptedExplainer {
    async fn explain(&self, _review_text: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(ProviderError::ApiError {
                status: *status,
                message: "throttled".to_string(),
            }),
        }
    }
}

const SPAM_REPLY: &str =
    r#"{"reason_category":"Promotional Spam","reason_description":"Pushes a discount code."}"#;

fn app(model: ModelSlot, explainer: Arc<ScriptedExplainer>, options: BatchOptions) -> axum::Router {
    create_router(AppState::new(model, explainer, options))
}

fn detect_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/detect")
        .header("content-type", "application/json")
        .header("origin", "https://maps.example.com")
        .body(body.into())
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_detect_classifies_in_order() {
    let model = Arc::new(DiscountModel::default());
    let explainer = Arc::new(ScriptedExplainer::replying(SPAM_REPLY));
    let router = app(
        ModelSlot::Loaded(model.clone()),
        explainer.clone(),
        BatchOptions::default(),
    );

    let body = json!({"reviews": [
        {"review_text": "Cozy place, friendly staff."},
        {"review_text": "Use my DISCOUNT code for 50% off!!!"},
        {},
        {"review_text": "Ask for the discount, best ever"}
    ]});
    let response = router.oneshot(detect_request(body.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    let results = read_json(response).await;
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 4);

    let expected_fake = [false, true, false, true];
    let confidence_re = Regex::new(r"^\d\.\d{4}$").unwrap();
    for (result, fake) in results.iter().zip(expected_fake) {
        assert_eq!(result["is_fake"], if fake { 1 } else { 0 });
        assert_eq!(result["predicted_label"], if fake { "Fake" } else { "Real" });

        let confidence = result["confidence"].as_str().unwrap();
        assert!(confidence_re.is_match(confidence));
        let value: f64 = confidence.parse().unwrap();
        assert!((0.0..=1.0).contains(&value));

        if fake {
            assert_eq!(result["confidence"], "0.9579");
            assert_eq!(result["reason_category"], "Promotional Spam");
            assert_eq!(result["reason_description"], "Pushes a discount code.");
        } else {
            assert_eq!(result["confidence"], "1.0000");
            assert_eq!(result["reason_category"], "N/A");
            assert_eq!(result["reason_description"], "This review appears to be genuine.");
        }
    }

    assert_eq!(model.predict_calls.load(Ordering::SeqCst), 1);
    assert_eq!(model.proba_calls.load(Ordering::SeqCst), 1);
    assert_eq!(explainer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_detect_degrades_unstructured_explanations() {
    let explainer = Arc::new(ScriptedExplainer::replying("  Reads like an advert.  "));
    let router = app(
        ModelSlot::loaded(DiscountModel::default()),
        explainer,
        BatchOptions::default(),
    );

    let body = json!({"reviews": [{"review_text": "discount discount discount"}]});
    let response = router.oneshot(detect_request(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let results = read_json(response).await;
    assert_eq!(results[0]["reason_category"], "General Analysis");
    assert_eq!(results[0]["reason_description"], "Reads like an advert.");
}

#[tokio::test]
async fn test_missing_reviews_is_bad_request() {
    for body in [json!({}), json!({"reviews": "just a string"}), json!({"reviews": []})] {
        let router = app(
            ModelSlot::loaded(DiscountModel::default()),
            Arc::new(ScriptedExplainer::replying(SPAM_REPLY)),
            BatchOptions::default(),
        );
        let response = router.oneshot(detect_request(body.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await,
            json!({"error": "Request body must contain a \"reviews\" array."})
        );
    }
}

#[tokio::test]
async fn test_unloaded_model_short_circuits() {
    let explainer = Arc::new(ScriptedExplainer::replying(SPAM_REPLY));

    for body in [
        json!({"reviews": [{"review_text": "discount!"}]}).to_string(),
        "{}".to_string(),
        "not even json".to_string(),
    ] {
        let router = app(
            ModelSlot::unavailable("artifact missing"),
            explainer.clone(),
            BatchOptions::default(),
        );
        let response = router.oneshot(detect_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await, json!({"error": "Model is not loaded."}));
    }

    assert_eq!(explainer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_body_is_generic_error() {
    let router = app(
        ModelSlot::loaded(DiscountModel::default()),
        Arc::new(ScriptedExplainer::replying(SPAM_REPLY)),
        BatchOptions::default(),
    );
    let response = router.oneshot(detect_request("{\"reviews\": [")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json(response).await,
        json!({"error": "Could not process the request."})
    );
}

#[tokio::test]
async fn test_provider_failure_fails_whole_batch() {
    let router = app(
        ModelSlot::loaded(DiscountModel::default()),
        Arc::new(ScriptedExplainer::failing(503)),
        BatchOptions::default(),
    );

    let body = json!({"reviews": [{"review_text": "fine"}, {"review_text": "discount"}]});
    let response = router.oneshot(detect_request(body.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json(response).await,
        json!({"error": "Could not process the request."})
    );
}

#[tokio::test]
async fn test_provider_failure_degrade_policy_keeps_batch() {
    let router = app(
        ModelSlot::loaded(DiscountModel::default()),
        Arc::new(ScriptedExplainer::failing(503)),
        BatchOptions {
            explain_concurrency: 2,
            on_provider_error: ProviderFailurePolicy::Degrade,
        },
    );

    let body = json!({"reviews": [{"review_text": "fine"}, {"review_text": "discount"}]});
    let response = router.oneshot(detect_request(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let results = read_json(response).await;
    assert_eq!(results[0]["reason_category"], "N/A");
    assert_eq!(results[1]["predicted_label"], "Fake");
    assert_eq!(results[1]["reason_category"], "Analysis Failed");
    assert_eq!(results[1]["reason_description"], "Could not generate a reason.");
}

#[tokio::test]
async fn test_health_reports_model_state() {
    let router = app(
        ModelSlot::unavailable("no artifact"),
        Arc::new(ScriptedExplainer::replying(SPAM_REPLY)),
        BatchOptions::default(),
    );
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, json!({"status": "ok", "model_loaded": false}));
}
