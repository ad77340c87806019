//! Prescription API tests.
//!
//! Covers role-scoped listing, cursor paging, status transitions and the
//! ordering of not-found and forbidden responses.

mod common;

use axum::http::StatusCode;
use erx_persistence::types::Role;
use serde_json::{Value, json};

use common::{TestApp, field_list};

// =============================================================================
// Listing
// =============================================================================

mod listing {
    use super::*;

    #[tokio::test]
    async fn test_doctors_only_see_their_own_prescriptions() {
        let app = TestApp::new();
        let doctor_a = app.signup("Doctor A", "a@example.com").await;
        let doctor_b = app.signup("Doctor B", "b@example.com").await;
        let admin = app.admin().await;

        app.prescribe(&doctor_a, "Jane Doe", "Flu").await;

        let body: Value = app.get("/api/prescriptions", &doctor_b).await.json();
        assert!(field_list(&body, "patientName").is_empty());

        let body: Value = app.get("/api/prescriptions", &admin).await.json();
        assert_eq!(field_list(&body, "patientName"), vec!["Jane Doe"]);
        assert_eq!(body["data"][0]["doctor"]["name"], "Doctor A");
        assert_eq!(body["data"][0]["doctor"]["role"], "doctor");
    }

    #[tokio::test]
    async fn test_cursor_walks_eleven_records_in_two_pages() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;

        let mut ids = Vec::new();
        for n in 0..11 {
            ids.push(app.prescribe(&doctor, &format!("Patient {n}"), "Cold").await);
        }

        let first: Value = app
            .get("/api/prescriptions?limit=10", &doctor)
            .await
            .json();
        assert_eq!(first["pagination"]["hasMore"], true);
        assert_eq!(first["pagination"]["limit"], 10);
        let first_ids = field_list(&first, "id");
        assert_eq!(first_ids.len(), 10);
        assert_eq!(first["pagination"]["nextCursor"], json!(first_ids[9]));

        let cursor = first["pagination"]["nextCursor"].as_str().unwrap();
        let second: Value = app
            .get(&format!("/api/prescriptions?limit=10&cursor={cursor}"), &doctor)
            .await
            .json();
        assert_eq!(second["pagination"]["hasMore"], false);
        assert!(second["pagination"]["nextCursor"].is_null());
        assert_eq!(field_list(&second, "id"), vec![ids[0].clone()]);

        let mut seen: Vec<String> = first_ids.into_iter().chain(field_list(&second, "id")).collect();
        seen.sort();
        ids.sort();
        assert_eq!(seen, ids);
    }

    #[tokio::test]
    async fn test_oldest_first_sorting() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;
        let first = app.prescribe(&doctor, "First", "Cold").await;
        app.prescribe(&doctor, "Second", "Cold").await;

        let body: Value = app
            .get("/api/prescriptions?sort=oldest&limit=1", &doctor)
            .await
            .json();
        assert_eq!(field_list(&body, "id"), vec![first]);
        assert_eq!(body["pagination"]["hasMore"], true);
    }

    #[tokio::test]
    async fn test_search_and_status_filters_intersect() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;
        let flu = app.prescribe(&doctor, "Jane Doe", "Flu").await;
        app.prescribe(&doctor, "John Roe", "Flu").await;
        app.prescribe(&doctor, "Jane Poe", "Migraine").await;

        app.patch(&format!("/api/prescriptions/{flu}/status"), &doctor)
            .json(&json!({ "status": "completed" }))
            .await
            .assert_status_ok();

        let body: Value = app
            .get("/api/prescriptions?search=FLU", &doctor)
            .await
            .json();
        assert_eq!(field_list(&body, "id").len(), 2);

        let body: Value = app
            .get("/api/prescriptions?search=jane&status=completed", &doctor)
            .await
            .json();
        assert_eq!(field_list(&body, "id"), vec![flu]);
    }

    #[tokio::test]
    async fn test_malformed_paging_falls_back_to_defaults() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;
        app.prescribe(&doctor, "Jane Doe", "Flu").await;

        let response = app
            .get("/api/prescriptions?limit=lots&cursor=nonsense", &doctor)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["limit"], 10);
        assert_eq!(field_list(&body, "id").len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_status_filter_is_rejected() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;

        let response = app
            .get("/api/prescriptions?status=archived", &doctor)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["success"], false);
    }

    #[tokio::test]
    async fn test_malformed_date_is_a_generic_server_error() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;

        let response = app
            .get("/api/prescriptions?from=last-tuesday", &doctor)
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["message"], "Server error");
        assert!(!body.to_string().contains("last-tuesday"));
    }

    #[tokio::test]
    async fn test_listing_requires_a_token() {
        let app = TestApp::new();
        let response = app.server.get("/api/prescriptions").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["message"], "No token provided");
    }
}

// =============================================================================
// Creation
// =============================================================================

mod creation {
    use super::*;

    #[tokio::test]
    async fn test_created_prescription_is_active_and_owned() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;

        let response = app
            .post("/api/prescriptions", &doctor)
            .json(&json!({
                "patientName": "Jane Doe",
                "patientAge": 34,
                "diagnosis": "Flu",
                "medicines": [{ "name": "Oseltamivir" }],
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        assert_eq!(body["data"]["status"], "active");
        assert_eq!(body["data"]["doctorId"], json!(doctor.id));
        assert_eq!(body["data"]["medicines"][0]["name"], "Oseltamivir");
    }

    #[tokio::test]
    async fn test_validation_lists_every_problem() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;

        let response = app
            .post("/api/prescriptions", &doctor)
            .json(&json!({ "patientAge": 200 }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let message = response.json::<Value>()["message"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(message.contains("patientName"));
        assert!(message.contains("patientAge"));
        assert!(message.contains("diagnosis"));
    }

    #[tokio::test]
    async fn test_pharmacists_cannot_prescribe() {
        let app = TestApp::new();
        let pharmacist = app
            .signup_as(Role::Pharmacist, "Pharmacist", "ph@example.com")
            .await;

        let response = app
            .post("/api/prescriptions", &pharmacist)
            .json(&json!({ "patientName": "Jane", "patientAge": 30, "diagnosis": "Flu" }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let message = response.json::<Value>()["message"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(message.contains("doctor, admin"));
        assert!(message.contains("pharmacist"));
    }
}

// =============================================================================
// Status transitions
// =============================================================================

mod status {
    use super::*;

    #[tokio::test]
    async fn test_setting_the_same_status_twice_is_idempotent() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;
        let id = app.prescribe(&doctor, "Jane Doe", "Flu").await;
        let path = format!("/api/prescriptions/{id}/status");

        for _ in 0..2 {
            let response = app
                .patch(&path, &doctor)
                .json(&json!({ "status": "completed" }))
                .await;
            response.assert_status_ok();
            assert_eq!(response.json::<Value>()["data"]["status"], "completed");
        }

        let body: Value = app
            .get(&format!("/api/prescriptions/{id}"), &doctor)
            .await
            .json();
        assert_eq!(body["data"]["status"], "completed");
    }

    #[tokio::test]
    async fn test_any_status_is_reachable_from_any_other() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;
        let id = app.prescribe(&doctor, "Jane Doe", "Flu").await;
        let path = format!("/api/prescriptions/{id}/status");

        for status in ["cancelled", "active", "completed", "active"] {
            let response = app
                .patch(&path, &doctor)
                .json(&json!({ "status": status }))
                .await;
            response.assert_status_ok();
            assert_eq!(response.json::<Value>()["data"]["status"], status);
        }
    }

    #[tokio::test]
    async fn test_other_doctors_are_forbidden() {
        let app = TestApp::new();
        let owner = app.signup("Owner", "owner@example.com").await;
        let other = app.signup("Other", "other@example.com").await;
        let id = app.prescribe(&owner, "Jane Doe", "Flu").await;

        app.patch(&format!("/api/prescriptions/{id}/status"), &other)
            .json(&json!({ "status": "completed" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        app.get(&format!("/api/prescriptions/{id}"), &other)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        app.delete(&format!("/api/prescriptions/{id}"), &other)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let body: Value = app
            .get(&format!("/api/prescriptions/{id}"), &owner)
            .await
            .json();
        assert_eq!(body["data"]["status"], "active");
    }

    #[tokio::test]
    async fn test_admins_may_change_any_prescription() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;
        let admin = app.admin().await;
        let id = app.prescribe(&doctor, "Jane Doe", "Flu").await;

        app.patch(&format!("/api/prescriptions/{id}/status"), &admin)
            .json(&json!({ "status": "completed" }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_missing_prescription_is_reported_before_permissions() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;
        let unknown = "000000000000000000ffffff";

        let response = app
            .patch(&format!("/api/prescriptions/{unknown}/status"), &doctor)
            .json(&json!({ "status": "bogus" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["message"], "Prescription not found");

        app.patch("/api/prescriptions/not-an-id/status", &doctor)
            .json(&json!({ "status": "completed" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_permissions_are_checked_before_the_status_value() {
        let app = TestApp::new();
        let owner = app.signup("Owner", "owner@example.com").await;
        let other = app.signup("Other", "other@example.com").await;
        let id = app.prescribe(&owner, "Jane Doe", "Flu").await;

        app.patch(&format!("/api/prescriptions/{id}/status"), &other)
            .json(&json!({ "status": "bogus" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_or_missing_status_is_rejected() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;
        let id = app.prescribe(&doctor, "Jane Doe", "Flu").await;
        let path = format!("/api/prescriptions/{id}/status");

        let response = app
            .patch(&path, &doctor)
            .json(&json!({ "status": "archived" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(
            response.json::<Value>()["message"]
                .as_str()
                .unwrap()
                .contains("active, completed, cancelled")
        );

        let response = app.patch(&path, &doctor).json(&json!({})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["message"], "Status is required");
    }

    #[tokio::test]
    async fn test_delete_cancels_without_removing() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;
        let id = app.prescribe(&doctor, "Jane Doe", "Flu").await;

        let response = app
            .delete(&format!("/api/prescriptions/{id}"), &doctor)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["message"], "Prescription cancelled");

        let body: Value = app
            .get(&format!("/api/prescriptions/{id}"), &doctor)
            .await
            .json();
        assert_eq!(body["data"]["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_status_changes_are_audited() {
        let app = TestApp::new();
        let doctor = app.signup("Doctor", "doc@example.com").await;
        let admin = app.admin().await;
        let id = app.prescribe(&doctor, "Jane Doe", "Flu").await;

        app.patch(&format!("/api/prescriptions/{id}/status"), &doctor)
            .json(&json!({ "status": "completed" }))
            .await
            .assert_status_ok();
        app.settle().await;

        let body: Value = app
            .get("/api/admin/audit-logs?action=PRESCRIPTION_UPDATED", &admin)
            .await
            .json();
        let entry = &body["data"][0];
        assert_eq!(entry["details"]["prescriptionId"], json!(id));
        assert_eq!(entry["details"]["status"], "completed");
        assert_eq!(entry["details"]["previousStatus"], "active");
        assert_eq!(entry["details"]["actingUser"], json!(doctor.id));
    }
}

// =============================================================================
// Dashboard
// =============================================================================

mod dashboard {
    use super::*;

    #[tokio::test]
    async fn test_stats_are_scoped_to_the_caller() {
        let app = TestApp::new();
        let doctor_a = app.signup("Doctor A", "a@example.com").await;
        let doctor_b = app.signup("Doctor B", "b@example.com").await;
        let admin = app.admin().await;

        app.prescribe(&doctor_a, "Jane Doe", "Flu").await;
        app.prescribe(&doctor_a, "John Doe", "Flu").await;
        app.prescribe(&doctor_b, "Mary Major", "Migraine").await;

        let body: Value = app.get("/api/dashboard/stats", &doctor_a).await.json();
        let data = &body["data"];
        assert_eq!(data["diagnosisStats"][0]["diagnosis"], "Flu");
        assert_eq!(data["diagnosisStats"][0]["count"], 2);
        assert_eq!(data["diagnosisStats"].as_array().unwrap().len(), 1);
        assert_eq!(data["recentPrescriptions"].as_array().unwrap().len(), 2);
        assert_eq!(data["treatedStats"][0]["count"], 2);

        let body: Value = app.get("/api/dashboard/stats", &admin).await.json();
        assert_eq!(body["data"]["recentPrescriptions"].as_array().unwrap().len(), 3);
    }
}
