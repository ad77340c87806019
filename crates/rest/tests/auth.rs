//! Account and authentication API tests.

mod common;

use axum::http::{HeaderValue, StatusCode};
use erx_persistence::core::UserStorage;
use erx_rest::ServerConfig;
use serde_json::{Value, json};

use common::{AUTHORIZATION, PASSWORD, TestApp};

// =============================================================================
// Signup and login
// =============================================================================

mod signup_and_login {
    use super::*;

    #[tokio::test]
    async fn test_signup_creates_a_doctor() {
        let app = TestApp::new();

        let response = app
            .server
            .post("/api/auth/signup")
            .json(&json!({
                "name": "Dr. Jane",
                "email": "Jane@Example.com",
                "phone": "+15550100",
                "password": PASSWORD,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "User registered successfully");
        assert_eq!(body["user"]["role"], "doctor");
        assert_eq!(body["user"]["email"], "jane@example.com");
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert!(body["user"].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let app = TestApp::new();

        let response = app
            .server
            .post("/api/auth/signup")
            .json(&json!({ "name": "Jane", "email": "jane@example.com" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = app
            .server
            .post("/api/auth/signup")
            .json(&json!({ "name": "Jane", "email": "jane@example.com", "password": "12345" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["message"],
            "Password must be at least 6 characters"
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let app = TestApp::new();
        app.signup("Jane", "jane@example.com").await;

        let response = app
            .server
            .post("/api/auth/signup")
            .json(&json!({ "name": "Other", "email": "JANE@example.com", "password": PASSWORD }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<Value>()["success"], false);
    }

    #[tokio::test]
    async fn test_login_with_email_or_phone() {
        let app = TestApp::new();
        app.server
            .post("/api/auth/signup")
            .json(&json!({
                "name": "Jane",
                "email": "jane@example.com",
                "phone": "+15550100",
                "password": PASSWORD,
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = app
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": "JANE@example.com", "password": PASSWORD }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["message"], "Login successful");

        app.server
            .post("/api/auth/login")
            .json(&json!({ "phone": "+15550100", "password": PASSWORD }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let app = TestApp::new();
        app.signup("Jane", "jane@example.com").await;

        for body in [
            json!({ "email": "jane@example.com", "password": "wrong-password" }),
            json!({ "email": "nobody@example.com", "password": PASSWORD }),
        ] {
            let response = app.server.post("/api/auth/login").json(&body).await;
            response.assert_status(StatusCode::UNAUTHORIZED);
            assert_eq!(response.json::<Value>()["message"], "Invalid credentials");
        }

        app.server
            .post("/api/auth/login")
            .json(&json!({ "email": "jane@example.com" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_failed_logins_are_audited() {
        let app = TestApp::new();
        let admin = app.admin().await;

        app.server
            .post("/api/auth/login")
            .json(&json!({ "email": "ghost@example.com", "password": PASSWORD }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        app.settle().await;

        let body: Value = app
            .get("/api/admin/audit-logs?action=USER_LOGIN_FAILED", &admin)
            .await
            .json();
        assert_eq!(body["data"][0]["details"]["identifier"], "ghost@example.com");
        assert!(body["data"][0]["userId"].is_null());
    }
}

// =============================================================================
// Tokens
// =============================================================================

mod tokens {
    use super::*;

    #[tokio::test]
    async fn test_missing_and_invalid_tokens() {
        let app = TestApp::new();

        let response = app.server.get("/api/auth/profile").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["message"], "No token provided");

        let response = app
            .server
            .get("/api/auth/profile")
            .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer not.a.jwt"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.json::<Value>()["message"],
            "Invalid or expired token"
        );
    }

    #[tokio::test]
    async fn test_tokens_from_another_secret_are_rejected() {
        let app = TestApp::new();
        let other = TestApp::with_config(ServerConfig {
            jwt_secret: "another-secret".to_string(),
            ..ServerConfig::for_testing()
        });
        let session = other.signup("Jane", "jane@example.com").await;

        app.get("/api/auth/profile", &session)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_deleted_users_lose_access() {
        let app = TestApp::new();
        let session = app.signup("Jane", "jane@example.com").await;
        app.storage()
            .delete_user(&session.record_id())
            .await
            .unwrap();

        let response = app.get("/api/auth/profile", &session).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["message"], "User no longer exists");
    }
}

// =============================================================================
// Profile
// =============================================================================

mod profile {
    use super::*;

    #[tokio::test]
    async fn test_profile_round_trip() {
        let app = TestApp::new();
        let session = app.signup("Jane", "jane@example.com").await;

        let body: Value = app.get("/api/auth/profile", &session).await.json();
        assert_eq!(body["user"]["name"], "Jane");
        assert!(body["user"].get("passwordHash").is_none());

        let response = app
            .patch("/api/auth/profile", &session)
            .json(&json!({ "name": "Jane Smith", "phone": "+15550199", "role": "admin" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Profile updated");
        assert_eq!(body["user"]["name"], "Jane Smith");
        assert_eq!(body["user"]["phone"], "+15550199");
        assert_eq!(body["user"]["role"], "doctor");
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let app = TestApp::new();
        let session = app.signup("Jane", "jane@example.com").await;

        let response = app
            .patch("/api/auth/profile", &session)
            .json(&json!({ "name": "   " }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["message"], "Name cannot be empty");
    }

    #[tokio::test]
    async fn test_logout() {
        let app = TestApp::new();
        let response = app.server.post("/api/auth/logout").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["message"], "Logged out");
    }
}

// =============================================================================
// Google sign-in
// =============================================================================

mod google {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_oauth_is_unavailable() {
        let app = TestApp::new();

        let response = app.server.get("/api/auth/google").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["reason"], "oauth_not_configured");
    }

    #[tokio::test]
    async fn test_configured_oauth_redirects_to_google() {
        let app = TestApp::with_config(ServerConfig {
            google_client_id: Some("client-123".to_string()),
            ..ServerConfig::for_testing()
        });

        let response = app.server.get("/api/auth/google").await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);

        let location = response.header("location");
        let location = location.to_str().unwrap();
        assert!(location.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(location.contains("client_id=client-123"));
        assert!(location.contains("response_type=code"));
    }
}
