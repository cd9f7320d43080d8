use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use board::settings::GeminiSettings;
use board::{DirectClient, ProxyClient, SuggestionClient, SuggestionError};
use common::BreakdownRequest;
use serde_json::{Value, json};

/// Serves `router` on an ephemeral local port and returns its base URL.
async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn offsite_request() -> BreakdownRequest {
    BreakdownRequest::new(
        "Plan a company offsite event",
        Some("Organize a three-day offsite for 50 employees...".to_string()),
    )
}

fn gemini(base_url: &str, api_key: Option<&str>) -> DirectClient {
    DirectClient::new(
        GeminiSettings {
            api_key: api_key.map(str::to_string),
            model: "gemini-test".to_string(),
            base_url: base_url.to_string(),
        },
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_proxy_returns_three_suggestions() {
    let router = Router::new().route(
        "/api/breakdown-task",
        post(|Json(body): Json<BreakdownRequest>| async move {
            assert_eq!(body.title, "Plan a company offsite event");
            Json(json!([
                { "title": "Choose a venue", "description": "Shortlist three options" },
                { "title": "Arrange transport", "description": null },
                { "title": "Draft the agenda" }
            ]))
        }),
    );
    let base = spawn_upstream(router).await;
    let client = ProxyClient::new(&base, Duration::from_secs(5)).unwrap();

    let suggestions = client.suggest(&offsite_request()).await.unwrap();

    assert_eq!(suggestions.len(), 3);
    assert!(suggestions.iter().all(|s| !s.title.is_empty()));
    assert_eq!(suggestions[1].description, None);
}

#[tokio::test]
async fn test_proxy_error_carries_detail() {
    let router = Router::new().route(
        "/api/breakdown-task",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "model unavailable" })),
            )
        }),
    );
    let base = spawn_upstream(router).await;
    let client = ProxyClient::new(&base, Duration::from_secs(5)).unwrap();

    let err = client.suggest(&offsite_request()).await.unwrap_err();

    assert!(err.to_string().contains("model unavailable"));
    assert_eq!(
        err,
        SuggestionError::Upstream {
            status: 500,
            detail: Some("model unavailable".to_string()),
        }
    );
}

#[tokio::test]
async fn test_proxy_error_without_json_body() {
    let router = Router::new().route(
        "/api/breakdown-task",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
    );
    let base = spawn_upstream(router).await;
    let client = ProxyClient::new(&base, Duration::from_secs(5)).unwrap();

    let err = client.suggest(&offsite_request()).await.unwrap_err();

    assert_eq!(
        err,
        SuggestionError::Upstream {
            status: 502,
            detail: None,
        }
    );
}

#[tokio::test]
async fn test_proxy_rejects_wrong_shape() {
    let router = Router::new().route(
        "/api/breakdown-task",
        post(|| async { Json(json!({ "suggestions": [] })) }),
    );
    let base = spawn_upstream(router).await;
    let client = ProxyClient::new(&base, Duration::from_secs(5)).unwrap();

    let err = client.suggest(&offsite_request()).await.unwrap_err();

    assert!(matches!(err, SuggestionError::ResponseFormat(_)));
}

#[tokio::test]
async fn test_proxy_unreachable_is_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = ProxyClient::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();

    let err = client.suggest(&offsite_request()).await.unwrap_err();

    assert!(matches!(err, SuggestionError::Transport(_)));
}

#[tokio::test]
async fn test_proxy_timeout_is_transport_error() {
    let router = Router::new().route(
        "/api/breakdown-task",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!([]))
        }),
    );
    let base = spawn_upstream(router).await;
    let client = ProxyClient::new(&base, Duration::from_millis(200)).unwrap();

    let err = client.suggest(&offsite_request()).await.unwrap_err();

    assert!(matches!(err, SuggestionError::Transport(_)));
}

#[tokio::test]
async fn test_proxy_health_check() {
    let router = Router::new().route("/", get(|| async { Json(json!({ "status": "ok" })) }));
    let base = spawn_upstream(router).await;
    let client = ProxyClient::new(&base, Duration::from_secs(5)).unwrap();

    let status = client.health().await.unwrap();

    assert_eq!(status["status"], "ok");
}

#[tokio::test]
async fn test_direct_requests_schema_constrained_json() {
    let router = Router::new().route(
        "/v1beta/models/{action}",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            assert_eq!(headers["x-goog-api-key"], "test-key");
            let config = &body["generationConfig"];
            assert_eq!(config["responseMimeType"], "application/json");
            assert_eq!(config["responseSchema"]["type"], "ARRAY");
            let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
            assert!(prompt.contains("Plan a company offsite event"));

            let text = json!([
                { "title": "Choose a venue" },
                { "title": "Arrange transport" },
                { "title": "Draft the agenda", "description": "Mix sessions and activities" }
            ])
            .to_string();
            Json(json!({
                "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
            }))
        }),
    );
    let base = spawn_upstream(router).await;

    let suggestions = gemini(&base, Some("test-key"))
        .suggest(&offsite_request())
        .await
        .unwrap();

    assert_eq!(suggestions.len(), 3);
    assert_eq!(
        suggestions[2].description.as_deref(),
        Some("Mix sessions and activities")
    );
}

#[tokio::test]
async fn test_direct_without_key_is_configuration_error() {
    let client = gemini("http://127.0.0.1:9", None);

    let err = client.suggest(&offsite_request()).await.unwrap_err();

    assert!(matches!(err, SuggestionError::Configuration(_)));
}

#[tokio::test]
async fn test_direct_provider_error_message_is_detail() {
    let router = Router::new().route(
        "/v1beta/models/{action}",
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
                })),
            )
        }),
    );
    let base = spawn_upstream(router).await;

    let err = gemini(&base, Some("test-key"))
        .suggest(&offsite_request())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SuggestionError::Upstream {
            status: 429,
            detail: Some("Quota exceeded".to_string()),
        }
    );
}

#[tokio::test]
async fn test_direct_free_text_is_format_error() {
    let router = Router::new().route(
        "/v1beta/models/{action}",
        post(|| async {
            Json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "Here are some ideas!" }] } }]
            }))
        }),
    );
    let base = spawn_upstream(router).await;

    let err = gemini(&base, Some("test-key"))
        .suggest(&offsite_request())
        .await
        .unwrap_err();

    assert!(matches!(err, SuggestionError::ResponseFormat(_)));
}
