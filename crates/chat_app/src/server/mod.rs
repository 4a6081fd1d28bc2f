//! HTTP proxy: streams model replies to the browser and checks the access
//! password.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use chat_core::Message;
use chat_engine::{
    ui_chunk_stream, CompletionBackend, ErrorBody, LoginRequest, LoginResponse, OpenAiBackend,
    DONE_SENTINEL,
};
use chat_logging::{chat_error, chat_info, chat_warn};
use futures_util::{stream, StreamExt};
use serde_json::Value;
use tower_http::cors::CorsLayer;

use crate::platform::config::AppConfig;

const INVALID_MESSAGES: &str = "Invalid messages format";
const MISSING_API_KEY: &str = "OpenAI API key is not configured";
const INTERNAL_ERROR: &str = "Internal server error";
const WRONG_PASSWORD: &str = "密码错误";

pub struct ServerState {
    pub backend: Arc<dyn CompletionBackend>,
    pub api_key_configured: bool,
    pub login_password: Option<String>,
    /// Hides `details` in error bodies.
    pub production: bool,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/auth/login", post(login))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    let backend = OpenAiBackend::new(config.upstream_settings())?;
    let state = ServerState {
        api_key_configured: backend.has_api_key(),
        backend: Arc::new(backend),
        login_password: config.login_password.clone(),
        production: config.production,
    };
    if !state.api_key_configured {
        chat_warn!("OPENAI_API_KEY is not set; /api/chat will answer 500");
    }
    if state.login_password.is_none() {
        chat_warn!("LOGIN_PASSWORD is not set; every login will be rejected");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&config.bind).await?;
        chat_info!("listening on {}", listener.local_addr()?);
        axum::serve(listener, router(state)).await?;
        Ok::<_, anyhow::Error>(())
    })
}

async fn chat(State(state): State<Arc<ServerState>>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            chat_warn!("chat request is not JSON: {}", err);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR,
                (!state.production).then(|| err.to_string()),
            );
        }
    };

    let raw_messages = match payload.get("messages") {
        Some(raw @ Value::Array(_)) => raw.clone(),
        _ => return error_response(StatusCode::BAD_REQUEST, INVALID_MESSAGES, None),
    };
    let messages: Vec<Message> = match serde_json::from_value(raw_messages) {
        Ok(messages) => messages,
        Err(err) => {
            chat_warn!("chat request has unreadable messages: {}", err);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR,
                (!state.production).then(|| err.to_string()),
            );
        }
    };

    if !state.api_key_configured {
        chat_error!("chat request rejected: no api key");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, MISSING_API_KEY, None);
    }

    let deltas = match state.backend.stream_completion(&messages).await {
        Ok(deltas) => deltas,
        Err(err) => {
            chat_error!("upstream completion failed: {}", err);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &err.message,
                (!state.production).then(|| format!("{err:?}")),
            );
        }
    };

    let message_id = format!("msg-{}", uuid::Uuid::new_v4());
    chat_info!(
        "streaming reply {} for {} message(s)",
        message_id,
        messages.len()
    );
    let events = ui_chunk_stream(message_id, deltas)
        .map(|chunk| Event::default().json_data(&chunk))
        .chain(stream::iter([Ok(Event::default().data(DONE_SENTINEL))]));
    Sse::new(events).into_response()
}

async fn login(State(state): State<Arc<ServerState>>, body: Bytes) -> Response {
    let password = serde_json::from_slice::<LoginRequest>(&body)
        .map(|request| request.password)
        .unwrap_or_default();

    let accepted = state
        .login_password
        .as_deref()
        .is_some_and(|expected| !expected.is_empty() && expected == password);
    if accepted {
        chat_info!("login accepted");
        return Json(LoginResponse {
            success: true,
            error: None,
        })
        .into_response();
    }
    chat_warn!("login rejected");
    (
        StatusCode::UNAUTHORIZED,
        Json(LoginResponse {
            success: false,
            error: Some(WRONG_PASSWORD.to_string()),
        }),
    )
        .into_response()
}

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
            details,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use chat_engine::{ChatError, CompletionStream, FailureKind};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;

    fn init_logging() {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(chat_logging::initialize_for_tests);
    }

    enum Reply {
        Deltas(Vec<&'static str>),
        Fail,
        FailMidway,
    }

    struct FakeBackend(Reply);

    #[async_trait::async_trait]
    impl CompletionBackend for FakeBackend {
        async fn stream_completion(
            &self,
            _messages: &[Message],
        ) -> Result<CompletionStream, ChatError> {
            match &self.0 {
                Reply::Deltas(deltas) => {
                    let items: Vec<Result<String, ChatError>> =
                        deltas.iter().map(|d| Ok(d.to_string())).collect();
                    Ok(Box::pin(stream::iter(items)))
                }
                Reply::Fail => Err(ChatError::new(FailureKind::HttpStatus(429), "quota exceeded")),
                Reply::FailMidway => Ok(Box::pin(stream::iter(vec![
                    Ok("par".to_string()),
                    Err(ChatError::new(FailureKind::Network, "connection reset")),
                ]))),
            }
        }
    }

    fn app(reply: Reply, production: bool) -> Router {
        router(ServerState {
            backend: Arc::new(FakeBackend(reply)),
            api_key_configured: true,
            login_password: Some("open-sesame".into()),
            production,
        })
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, String) {
        init_logging();
        let response = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn data_lines(body: &str) -> Vec<&str> {
        body.lines()
            .filter_map(|line| line.strip_prefix("data: "))
            .collect()
    }

    const ONE_MESSAGE: &str =
        r#"{"messages":[{"id":"u1","role":"user","parts":[{"type":"text","text":"hi"}]}]}"#;

    #[tokio::test]
    async fn streams_chunks_then_done() {
        let (status, body) =
            post_json(app(Reply::Deltas(vec!["Hel", "", "lo"]), false), "/api/chat", ONE_MESSAGE)
                .await;
        assert_eq!(status, StatusCode::OK);

        let lines = data_lines(&body);
        assert!(lines[0].starts_with(r#"{"type":"start","messageId":"msg-"#));
        assert_eq!(
            &lines[1..],
            &[
                r#"{"type":"text-start","id":"0"}"#,
                r#"{"type":"text-delta","id":"0","delta":"Hel"}"#,
                r#"{"type":"text-delta","id":"0","delta":"lo"}"#,
                r#"{"type":"text-end","id":"0"}"#,
                r#"{"type":"finish"}"#,
                "[DONE]",
            ]
        );
    }

    #[tokio::test]
    async fn upstream_error_midway_becomes_error_chunk() {
        let (status, body) =
            post_json(app(Reply::FailMidway, false), "/api/chat", ONE_MESSAGE).await;
        assert_eq!(status, StatusCode::OK);
        let lines = data_lines(&body);
        assert_eq!(
            &lines[lines.len() - 2..],
            &[r#"{"type":"error","errorText":"connection reset"}"#, "[DONE]"]
        );
    }

    #[tokio::test]
    async fn rejects_missing_or_non_array_messages() {
        for body in [r#"{}"#, r#"{"messages":"hi"}"#] {
            let (status, text) = post_json(app(Reply::Fail, false), "/api/chat", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(text, r#"{"error":"Invalid messages format"}"#);
        }
    }

    #[tokio::test]
    async fn unreadable_message_entries_are_a_server_error() {
        let body = r#"{"messages":[{"role":"robot"}]}"#;
        let (status, text) = post_json(app(Reply::Fail, false), "/api/chat", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error: ErrorBody = serde_json::from_str(&text).unwrap();
        assert_eq!(error.error, "Internal server error");
        assert!(error.details.is_some());

        let (status, text) = post_json(app(Reply::Fail, true), "/api/chat", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(text, r#"{"error":"Internal server error"}"#);
    }

    #[tokio::test]
    async fn missing_api_key_is_a_server_error() {
        let app = router(ServerState {
            backend: Arc::new(FakeBackend(Reply::Deltas(vec![]))),
            api_key_configured: false,
            login_password: None,
            production: false,
        });
        let (status, text) = post_json(app, "/api/chat", ONE_MESSAGE).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(text, r#"{"error":"OpenAI API key is not configured"}"#);
    }

    #[tokio::test]
    async fn upstream_failure_hides_details_in_production() {
        let (status, text) = post_json(app(Reply::Fail, false), "/api/chat", ONE_MESSAGE).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = serde_json::from_str(&text).unwrap();
        assert_eq!(body.error, "quota exceeded");
        assert!(body.details.is_some());

        let (_, text) = post_json(app(Reply::Fail, true), "/api/chat", ONE_MESSAGE).await;
        assert_eq!(text, r#"{"error":"quota exceeded"}"#);
    }

    #[tokio::test]
    async fn login_checks_password() {
        let (status, text) = post_json(
            app(Reply::Fail, false),
            "/api/auth/login",
            r#"{"password":"open-sesame"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, r#"{"success":true}"#);

        for body in [r#"{"password":"nope"}"#, "not json", r#"{}"#] {
            let (status, text) = post_json(app(Reply::Fail, false), "/api/auth/login", body).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");
            assert_eq!(text, r#"{"success":false,"error":"密码错误"}"#);
        }
    }
}
