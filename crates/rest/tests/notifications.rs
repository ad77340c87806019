//! Notification API tests.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use futures::StreamExt;
use serde_json::Value;

use common::{TestApp, field_list};

#[tokio::test]
async fn test_prescribing_notifies_the_prescriber() {
    let app = TestApp::new();
    let doctor = app.signup("Doctor", "doc@example.com").await;
    let other = app.signup("Other", "other@example.com").await;

    app.prescribe(&doctor, "Jane Doe", "Flu").await;
    app.settle().await;

    let body: Value = app.get("/api/notifications", &doctor).await.json();
    assert_eq!(field_list(&body, "type"), vec!["prescription_created"]);
    assert_eq!(body["data"][0]["title"], "Prescription created");
    assert_eq!(
        body["data"][0]["message"],
        "Prescription for Jane Doe has been created"
    );
    assert_eq!(body["data"][0]["read"], false);
    assert_eq!(body["pagination"]["limit"], 20);

    let body: Value = app.get("/api/notifications", &other).await.json();
    assert!(field_list(&body, "id").is_empty());
}

#[tokio::test]
async fn test_unread_count_and_mark_read() {
    let app = TestApp::new();
    let doctor = app.signup("Doctor", "doc@example.com").await;
    let other = app.signup("Other", "other@example.com").await;

    app.prescribe(&doctor, "Jane Doe", "Flu").await;
    app.prescribe(&doctor, "John Doe", "Cold").await;
    app.settle().await;

    let body: Value = app
        .get("/api/notifications/unread-count", &doctor)
        .await
        .json();
    assert_eq!(body["count"], 2);

    let listing: Value = app.get("/api/notifications", &doctor).await.json();
    let id = listing["data"][0]["id"].as_str().unwrap().to_string();
    let path = format!("/api/notifications/{id}/read");

    // Someone else's notification looks like a missing one.
    let response = app.patch(&path, &other).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["message"], "Notification not found");

    let response = app.patch(&path, &doctor).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["read"], true);

    let body: Value = app
        .get("/api/notifications/unread-count", &doctor)
        .await
        .json();
    assert_eq!(body["count"], 1);

    app.patch("/api/notifications/not-an-id/read", &doctor)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mark_all_read() {
    let app = TestApp::new();
    let doctor = app.signup("Doctor", "doc@example.com").await;

    for n in 0..3 {
        app.prescribe(&doctor, &format!("Patient {n}"), "Flu").await;
    }
    app.settle().await;

    let response = app.patch("/api/notifications/read-all", &doctor).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "All notifications marked as read");
    assert_eq!(body["updated"], 3);

    let body: Value = app
        .get("/api/notifications/unread-count", &doctor)
        .await
        .json();
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_notification_cursor_paging() {
    let app = TestApp::new();
    let doctor = app.signup("Doctor", "doc@example.com").await;

    for n in 0..3 {
        app.prescribe(&doctor, &format!("Patient {n}"), "Flu").await;
    }
    app.settle().await;

    let first: Value = app
        .get("/api/notifications?limit=2", &doctor)
        .await
        .json();
    assert_eq!(first["pagination"]["hasMore"], true);
    let cursor = first["pagination"]["nextCursor"].as_str().unwrap();

    let second: Value = app
        .get(&format!("/api/notifications?limit=2&cursor={cursor}"), &doctor)
        .await
        .json();
    assert_eq!(second["pagination"]["hasMore"], false);
    assert_eq!(
        second["data"][0]["message"],
        "Prescription for Patient 0 has been created"
    );
}

#[tokio::test]
async fn test_live_subscribers_receive_their_notifications() {
    let app = TestApp::new();
    let doctor = app.signup("Doctor", "doc@example.com").await;
    let other = app.signup("Other", "other@example.com").await;

    let mut mine = Box::pin(app.state.notifier().subscribe(doctor.record_id()));
    let mut theirs = Box::pin(app.state.notifier().subscribe(other.record_id()));

    app.prescribe(&doctor, "Jane Doe", "Flu").await;

    let delivered = tokio::time::timeout(Duration::from_secs(5), mine.next())
        .await
        .expect("notification should arrive")
        .expect("stream should stay open");
    assert_eq!(delivered.kind, "prescription_created");
    assert_eq!(delivered.user, doctor.record_id());

    app.settle().await;
    let nothing = tokio::time::timeout(Duration::from_millis(50), theirs.next()).await;
    assert!(nothing.is_err());
}

#[tokio::test]
async fn test_stream_requires_a_token() {
    let app = TestApp::new();
    app.server
        .get("/api/notifications/stream")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
