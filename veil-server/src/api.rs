//! Axum handlers
//!
//! Error bodies use a single `detail` field.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use veil_core::Vendor;
use veil_gateway::{validate_query, GatewayError};

use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub model: String,
    pub tokens_used: u32,
    pub cached: bool,
}

fn error_response(status: StatusCode, detail: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "detail": detail.to_string() }))).into_response()
}

/// POST /api/v2/chat/message
pub async fn chat_message(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            debug!("Rejected chat body: {}", rejection.body_text());
            return error_response(rejection.status(), rejection.body_text());
        }
    };

    if let Err(e) = validate_query(&req.message) {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.detail());
    }

    let span = info_span!(
        "chat",
        request_id = %Uuid::new_v4(),
        session = req.session_id.as_deref().unwrap_or("-")
    );

    async move {
        if req.stream == Some(true) {
            debug!("Streaming requested, answering in one piece");
        }

        match state.gateway.answer(&req.message).await {
            Ok(answer) => Json(ChatResponse {
                response: answer.text,
                model: answer.model_used,
                tokens_used: answer.tokens_used,
                cached: answer.was_cached,
            })
            .into_response(),
            Err(GatewayError::InvalidInput(msg)) => error_response(StatusCode::BAD_REQUEST, msg),
            Err(GatewayError::UpstreamFailure(msg)) => {
                warn!("Chat request failed upstream: {}", msg);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        }
    }
    .instrument(span)
    .await
}

/// GET /api/v1/vendors
pub async fn list_vendors(State(state): State<AppState>) -> Json<Vec<Vendor>> {
    Json(state.vendors.list().into_iter().cloned().collect())
}

/// GET /api/v1/vendors/{vendor_id}
pub async fn get_vendor(State(state): State<AppState>, Path(vendor_id): Path<String>) -> Response {
    match state.vendors.get(&vendor_id) {
        Some(vendor) => Json(vendor.clone()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Vendor not found"),
    }
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "vendors": state.vendors.stats(),
        "gateway": state.gateway.stats(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::extract::FromRequest;
    use veil_core::VendorRegistry;
    use veil_gateway::{
        Completion, CompletionRequest, GatewayConfig, LlmBackend, LlmError, MemoryCacheStore,
        Persona, QueryGateway,
    };

    struct EchoBackend;

    #[async_trait]
    impl LlmBackend for EchoBackend {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
            Ok(Completion {
                content: format!("echo: {}", request.user),
                model: request.model.clone(),
                total_tokens: 42,
            })
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct DownBackend;

    #[async_trait]
    impl LlmBackend for DownBackend {
        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, LlmError> {
            Err(LlmError::Config("OPENAI_API_KEY is not set".to_string()))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    const VENDORS: &str = r#"[
        {"id": "v1", "name": "Acme Corp", "domain": "acme.example", "industry_tag": "saas",
         "signals": [{"signal_type": "github", "severity_score": 70,
                      "metadata": {"detail": "API key exposure"}, "detected_at": 0}]},
        {"id": "v2", "name": "Globex", "domain": "globex.example"}
    ]"#;

    fn state_with(backend: Arc<dyn LlmBackend>) -> AppState {
        let gateway = QueryGateway::new(
            backend,
            MemoryCacheStore::shared(),
            Persona::embedded(),
            GatewayConfig::default(),
        );
        AppState::new(gateway, VendorRegistry::from_json_str(VENDORS).unwrap())
    }

    fn chat(message: &str) -> Result<Json<ChatRequest>, JsonRejection> {
        Ok(Json(ChatRequest {
            message: message.to_string(),
            session_id: None,
            stream: None,
        }))
    }

    /// Run the JSON extractor over a raw body, as the router would
    async fn extract(body: &'static str) -> Result<Json<ChatRequest>, JsonRejection> {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/v2/chat/message")
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .unwrap();
        Json::<ChatRequest>::from_request(request, &()).await
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_roundtrip_then_cached() {
        let state = state_with(Arc::new(EchoBackend));

        let first = chat_message(State(state.clone()), chat("is Acme exposed?")).await;
        assert_eq!(first.status(), StatusCode::OK);
        let first: ChatResponse = serde_json::from_value(body_json(first).await).unwrap();
        assert_eq!(first.response, "echo: is Acme exposed?");
        assert_eq!(first.model, "gpt-4o-mini");
        assert_eq!(first.tokens_used, 42);
        assert!(!first.cached);

        let second = chat_message(State(state), chat("is Acme exposed?")).await;
        let second: ChatResponse = serde_json::from_value(body_json(second).await).unwrap();
        assert!(second.cached);
        assert_eq!(second.response, first.response);
    }

    #[tokio::test]
    async fn test_chat_rejects_bad_length() {
        let state = state_with(Arc::new(EchoBackend));

        let empty = chat_message(State(state.clone()), chat("")).await;
        assert_eq!(empty.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let long = chat_message(State(state), chat(&"a".repeat(4001))).await;
        assert_eq!(long.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(long).await["detail"]
            .as_str()
            .unwrap()
            .contains("too long"));
    }

    #[tokio::test]
    async fn test_chat_bad_body_has_detail() {
        let state = state_with(Arc::new(EchoBackend));

        let body = extract(r#"{"session_id": "s1"}"#).await;
        let missing = chat_message(State(state.clone()), body).await;
        assert_eq!(missing.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(missing).await["detail"]
            .as_str()
            .unwrap()
            .contains("message"));

        let malformed = chat_message(State(state.clone()), extract("{not json").await).await;
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(malformed).await["detail"].is_string());

        let Json(body) = health(State(state)).await;
        assert_eq!(body["gateway"]["upstream_calls"], 0);
    }

    #[tokio::test]
    async fn test_chat_upstream_failure() {
        let state = state_with(Arc::new(DownBackend));
        let response = chat_message(State(state), chat("what leaked?")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["detail"],
            "Configuration error: OPENAI_API_KEY is not set"
        );
    }

    #[tokio::test]
    async fn test_vendor_routes() {
        let state = state_with(Arc::new(EchoBackend));

        let Json(vendors) = list_vendors(State(state.clone())).await;
        assert_eq!(vendors.len(), 2);
        assert_eq!(vendors[0].id, "v1");
        assert_eq!(vendors[0].risk_score(), 25);

        let found = get_vendor(State(state.clone()), Path("v1".to_string())).await;
        assert_eq!(found.status(), StatusCode::OK);
        let body = body_json(found).await;
        assert_eq!(body["reasons"][0], "[github] API key exposure (sev 70)");

        let missing = get_vendor(State(state), Path("v9".to_string())).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(missing).await["detail"], "Vendor not found");
    }

    #[tokio::test]
    async fn test_health_reports_counters() {
        let state = state_with(Arc::new(EchoBackend));
        chat_message(State(state.clone()), chat("ping?")).await;

        let Json(body) = health(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["vendors"]["vendor_count"], 2);
        assert_eq!(body["gateway"]["upstream_calls"], 1);
    }

    #[test]
    fn test_router_builds() {
        let state = state_with(Arc::new(EchoBackend));
        assert!(crate::build_router(state.clone(), "http://localhost:3000").is_ok());
        assert!(matches!(
            crate::build_router(state, "bad\norigin"),
            Err(crate::ServerError::InvalidOrigin(_))
        ));
    }
}
