use adviser::assistants::configs::OpenAiAssistantConfig;
use adviser::assistants::mock::MockAssistantApi;
use adviser::assistants::openai::OpenAiAssistantClient;
use adviser::assistants::types::RunStatus;
use adviser::errors::RelayError;
use adviser::models::message::ChatMessage;
use adviser::relay::{Relay, RelayConfig};
use adviser::surface::{ChatSurface, KeyAction, KeyPress, SubmitOutcome};
use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_assistant_service(mock_server: &MockServer, run_status: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_1"})))
        .mount(mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_in",
            "role": "user",
            "content": []
        })))
        .mount(mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/runs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "run_1", "status": "queued"})),
        )
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": run_status,
            "last_error": if run_status == "failed" {
                json!({"code": "server_error", "message": "Sorry, something went wrong."})
            } else {
                json!(null)
            }
        })))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{
                "id": "msg_out",
                "role": "assistant",
                "content": [{
                    "type": "text",
                    "text": {"value": "Ja, hemförsäkringen täcker stöld【4:0†villkor.pdf】.", "annotations": []}
                }]
            }]
        })))
        .mount(mock_server)
        .await;
}

fn relay_for(mock_server: &MockServer) -> Result<Relay> {
    let client = OpenAiAssistantClient::new(
        OpenAiAssistantConfig::new("test_api_key").with_host(mock_server.uri()),
    )?;
    Ok(Relay::new(
        Arc::new(client),
        RelayConfig::new("asst_test").with_poll_interval(Duration::from_millis(10)),
    ))
}

#[tokio::test]
async fn test_surface_over_http_relay() -> Result<()> {
    let mock_server = MockServer::start().await;
    mount_assistant_service(&mock_server, "completed").await;
    let relay = relay_for(&mock_server)?;

    let surface = ChatSurface::new();
    surface.set_input("Täcker hemförsäkringen stöld?");
    assert_eq!(surface.handle_key(KeyPress::enter()), KeyAction::Submit);
    assert_eq!(surface.submit(&relay).await, SubmitOutcome::Replied);

    let messages = surface.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[1],
        ChatMessage::assistant("Ja, hemförsäkringen täcker stöld【4:0†villkor.pdf】.")
    );
    let rendered = surface.render();
    assert!(rendered[1].html.contains("täcker stöld."));
    Ok(())
}

#[tokio::test]
async fn test_failed_run_over_http_relay() -> Result<()> {
    let mock_server = MockServer::start().await;
    mount_assistant_service(&mock_server, "failed").await;
    let relay = relay_for(&mock_server)?;

    let reply = relay
        .open_stream(vec![ChatMessage::user("Hej")])
        .collect_text()
        .await;
    assert_eq!(
        reply,
        Err(RelayError::RunFailed(
            "server_error: Sorry, something went wrong.".to_string()
        ))
    );
    Ok(())
}

#[tokio::test]
async fn test_each_turn_uses_a_fresh_thread() {
    let api = Arc::new(
        MockAssistantApi::new()
            .with_run_statuses(vec![RunStatus::Completed])
            .with_reply("svar"),
    );
    let relay = Relay::new(api.clone(), RelayConfig::new("asst_test"));
    let surface = ChatSurface::new();

    surface.set_input("ett");
    surface.submit(&relay).await;
    surface.set_input("två");
    surface.submit(&relay).await;

    let threads_created = api
        .calls()
        .iter()
        .filter(|call| matches!(call, adviser::assistants::mock::MockCall::CreateThread))
        .count();
    assert_eq!(threads_created, 2);
    // Second turn replays all three earlier turns
    let replayed = api
        .calls()
        .iter()
        .filter(|call| matches!(call, adviser::assistants::mock::MockCall::CreateMessage { .. }))
        .count();
    assert_eq!(replayed, 1 + 3);
}
