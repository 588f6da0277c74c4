//! End-to-end tests for the Waypoint stack.
//!
//! These drive the same wiring `waypoint serve` and `waypoint chat` use:
//! config, the offline scripted model, the airline roster and tools, and
//! both conversation stores, over the HTTP router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use waypoint_agent::TurnRequest;
use waypoint_config::AppConfig;
use waypoint_gateway::bootstrap::build_orchestrator;
use waypoint_gateway::{GatewayState, build_router};

fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.orchestrator.rate_limit_delay_ms = 0;
    config
}

async fn router(config: &AppConfig) -> axum::Router {
    let orchestrator = build_orchestrator(config, true).await.unwrap();
    let state = Arc::new(GatewayState {
        orchestrator: Arc::new(orchestrator),
    });
    build_router(state, &config.gateway.allowed_origins)
}

async fn post_chat(app: &axum::Router, body: Value) -> Value {
    let req = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn e2e_multi_turn_conversation_over_http() {
    let app = router(&fast_config()).await;

    let start = post_chat(&app, json!({"message": ""})).await;
    let id = start["conversation_id"].as_str().unwrap().to_string();
    assert_eq!(start["current_agent"], "Triage Agent");

    let faq = post_chat(
        &app,
        json!({"conversation_id": id, "message": "How many seats are on the plane?"}),
    )
    .await;
    assert_eq!(faq["conversation_id"], id.as_str());
    assert_eq!(faq["current_agent"], "FAQ Agent");
    assert!(
        faq["messages"]
            .as_array()
            .unwrap()
            .iter()
            .any(|m| m["content"].as_str().unwrap().contains("120 seats"))
    );

    let wifi = post_chat(&app, json!({"conversation_id": id, "message": "And wifi?"})).await;
    assert_eq!(wifi["current_agent"], "FAQ Agent");
    let events = wifi["events"].as_array().unwrap();
    assert!(events.iter().all(|e| e["type"] != "handoff"));
    assert_eq!(events[0]["type"], "tool_call");
    assert_eq!(events[0]["content"], "faq_lookup_tool");
    assert_eq!(events[0]["metadata"]["tool_args"]["question"], "And wifi?");
}

#[tokio::test]
async fn e2e_seat_change_shows_seat_map() {
    let app = router(&fast_config()).await;

    let body = post_chat(&app, json!({"message": "I'd like to change my seat"})).await;
    assert_eq!(body["current_agent"], "Trip Management Agent");

    let messages = body["messages"].as_array().unwrap();
    assert!(messages.iter().any(|m| m["content"] == "DISPLAY_SEAT_MAP"));

    let handoff = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["type"] == "handoff")
        .unwrap();
    assert_eq!(handoff["content"], "Triage Agent -> Trip Management Agent");
    assert_eq!(handoff["agent"], "Triage Agent");
}

#[tokio::test]
async fn e2e_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fast_config();
    config.store.backend = "file".into();
    config.store.path = dir.path().join("conversations.json");

    let first = build_orchestrator(&config, true).await.unwrap();
    let response = first
        .handle_turn(TurnRequest::new(None, "Is there wifi on the plane?"))
        .await
        .unwrap();
    assert_eq!(response.current_agent, "FAQ Agent");
    drop(first);

    let restarted = build_orchestrator(&config, true).await.unwrap();
    let next = restarted
        .handle_turn(TurnRequest::new(
            Some(response.conversation_id.as_str()),
            "What about my bag?",
        ))
        .await
        .unwrap();

    assert_eq!(next.conversation_id, response.conversation_id);
    assert_eq!(next.current_agent, "FAQ Agent");
    assert_eq!(
        next.context.get_str("account_number"),
        response.context.get_str("account_number")
    );
    assert!(next.messages[0].content.contains("50 pounds"));
}
