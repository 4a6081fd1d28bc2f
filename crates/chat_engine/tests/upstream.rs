use chat_core::Message;
use chat_engine::{
    ui_chunk_stream, CompletionBackend, FailureKind, OpenAiBackend, UiChunk, UpstreamSettings,
};
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer, api_key: Option<&str>) -> OpenAiBackend {
    OpenAiBackend::new(UpstreamSettings {
        api_key: api_key.map(ToOwned::to_owned),
        base_url: format!("{}/v1", server.uri()),
        ..UpstreamSettings::default()
    })
    .expect("client builds")
}

fn completion_sse(deltas: &[&str]) -> String {
    let mut body = String::from("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    for delta in deltas {
        let chunk = serde_json::json!({ "choices": [{ "delta": { "content": delta } }] });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

#[tokio::test]
async fn completion_streams_content_deltas() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o",
            "stream": true,
            "messages": [
                { "role": "system", "content": "You are a helpful assistant." },
                { "role": "user", "content": "hi" }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(completion_sse(&["Hel", "lo"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let stream = backend(&server, Some("sk-test"))
        .stream_completion(&[Message::user_text("u1", "hi")])
        .await
        .unwrap();
    let deltas: Vec<String> = stream.map(|delta| delta.unwrap()).collect().await;
    assert_eq!(deltas, vec!["Hel".to_string(), "lo".to_string()]);
}

#[tokio::test]
async fn missing_key_is_not_configured() {
    let server = MockServer::start().await;
    let backend = backend(&server, None);
    assert!(!backend.has_api_key());
    let err = match backend.stream_completion(&[]).await {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };
    assert_eq!(err.kind, FailureKind::NotConfigured);
}

#[tokio::test]
async fn upstream_rejection_carries_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .mount(&server)
        .await;

    let err = match backend(&server, Some("bad")).stream_completion(&[]).await {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };
    assert_eq!(err.kind, FailureKind::HttpStatus(401));
    assert_eq!(err.message, "Incorrect API key provided");
}

#[tokio::test]
async fn completion_wraps_into_ui_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(completion_sse(&["Hi"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let deltas = backend(&server, Some("sk"))
        .stream_completion(&[Message::user_text("u1", "hi")])
        .await
        .unwrap();
    let chunks: Vec<UiChunk> = ui_chunk_stream("msg-1".into(), deltas).collect().await;
    assert_eq!(chunks.len(), 5);
    assert_eq!(
        chunks[2],
        UiChunk::TextDelta {
            id: "0".into(),
            delta: "Hi".into()
        }
    );
    assert_eq!(chunks[4], UiChunk::Finish);
}
