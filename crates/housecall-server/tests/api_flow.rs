//! End-to-end handler tests: place a call, drive it with bridge events,
//! and read it back through the query surface.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use housecall_server::{app, dialer::StaticDialer, AppState};
use housecall_store::{CallRecordStore, InMemoryBackend};
use housecall_types::AppointmentContext;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_state() -> Arc<AppState> {
    let store = Arc::new(
        CallRecordStore::open(Arc::new(InMemoryBackend::new())).expect("store should open"),
    );
    Arc::new(AppState {
        store,
        dialer: Arc::new(StaticDialer::new()),
    })
}

fn test_app(state: Arc<AppState>) -> Router {
    app(state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = test_app(test_state());

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn place_call_requires_to_number() {
    let app = test_app(test_state());

    let response = app
        .oneshot(json_request("POST", "/api/calls", json!({ "to_number": "" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("to_number"));
}

#[tokio::test]
async fn full_call_flow_reschedule() {
    let state = test_state();
    let app = test_app(Arc::clone(&state));

    // Place the call.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/calls",
            json!({
                "to_number": "+15551234567",
                "appointment": {
                    "date": "2025-03-05",
                    "time": "10:30",
                    "provider": "Dr. Smith"
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sid = body_json(response).await["call_sid"]
        .as_str()
        .unwrap()
        .to_string();

    // Telephony lifecycle callbacks.
    for status in ["ringing", "in-progress"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/calls/{sid}/status"),
                json!({ "status": status }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    // Bridge transcript events.
    let turns = [
        ("assistant", "Your appointment is March 5th at 10:30 AM."),
        ("caller", "I need to reschedule."),
        ("assistant", "Sure, what date works?"),
    ];
    for (i, (speaker, text)) in turns.iter().enumerate() {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/calls/{sid}/transcript"),
                json!({ "speaker": speaker, "text": text }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["sequence"], (i + 1) as u64);
        assert_eq!(json["frozen"], false);
    }

    // Query surface.
    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/calls/{sid}/outcome")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["outcome"], "rescheduled");

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/calls/{sid}/transcript")))
        .await
        .unwrap();
    let json = body_json(response).await;
    let transcript = json["transcript"].as_array().unwrap();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1]["speaker"], "caller");
    assert_eq!(transcript[1]["sequence"], 2);

    // Finalize, then verify the freeze is visible through the API.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/calls/{sid}/status"),
            json!({ "status": "completed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/calls/{sid}/transcript"),
            json!({ "speaker": "caller", "text": "actually cancel it" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK, "late events are not errors");
    let json = body_json(response).await;
    assert_eq!(json["sequence"], Value::Null);
    assert_eq!(json["frozen"], true);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/calls/{sid}/transcript")))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(
        json["transcript"].as_array().unwrap().len(),
        3,
        "transcript unchanged after finalization"
    );

    let response = app
        .oneshot(get_request(&format!("/api/calls/{sid}/status")))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "completed");
}

#[tokio::test]
async fn unknown_call_sid_maps_to_404() {
    let app = test_app(test_state());

    for uri in [
        "/api/calls/CA999/status",
        "/api/calls/CA999/transcript",
        "/api/calls/CA999/outcome",
    ] {
        let response = app.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        let json = body_json(response).await;
        assert!(json["error"].is_string());
    }

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/calls/CA999/status",
            json!({ "status": "completed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/calls/CA999/transcript",
            json!({ "speaker": "caller", "text": "hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_status_label_is_a_client_error() {
    let state = test_state();
    state
        .store
        .create_record("CA1", "+15551234567", AppointmentContext::default())
        .unwrap();
    let app = test_app(state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/calls/CA1/status",
            json!({ "status": "canceled" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("invalid status"));
}

#[tokio::test]
async fn duplicate_call_sid_is_a_conflict() {
    let state = test_state();
    // Occupy the SID the static dialer will hand out first.
    state
        .store
        .create_record("CA-local-1", "+15550000000", AppointmentContext::default())
        .unwrap();
    let app = test_app(state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/calls",
            json!({ "to_number": "+15551234567" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
