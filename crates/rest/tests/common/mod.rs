//! Shared harness for the HTTP integration tests.
//!
//! Each [`TestApp`] runs the real router against its own in-memory SQLite
//! database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use erx_persistence::backends::sqlite::{SqliteBackend, SqliteBackendConfig};
use erx_persistence::core::{MedicineCatalog, UserStorage};
use erx_persistence::types::{NewMedicine, RecordId, Role};
use erx_rest::{AppState, ServerConfig, create_app_with_state};
use serde_json::{Value, json};

pub const AUTHORIZATION: HeaderName = HeaderName::from_static("authorization");

pub const PASSWORD: &str = "secret123";

/// A signed-in account.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub token: String,
}

impl Session {
    pub fn record_id(&self) -> RecordId {
        RecordId::parse(&self.id).expect("user id should parse")
    }

    pub fn bearer(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", self.token)).expect("valid header")
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState<SqliteBackend>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::for_testing())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self::build(SqliteBackendConfig::default(), config)
    }

    /// An app whose catalog has no full-text index, so every search takes
    /// the substring path.
    pub fn without_text_index() -> Self {
        let backend_config = SqliteBackendConfig {
            enable_text_index: false,
            ..Default::default()
        };
        let config = ServerConfig {
            enable_text_index: false,
            ..ServerConfig::for_testing()
        };
        Self::build(backend_config, config)
    }

    fn build(backend_config: SqliteBackendConfig, config: ServerConfig) -> Self {
        let backend = SqliteBackend::with_config(":memory:", backend_config)
            .expect("Failed to create SQLite backend");
        backend.init_schema().expect("Failed to init schema");

        let state = AppState::new(Arc::new(backend), config);
        let app = create_app_with_state(state.clone());
        let server = TestServer::new(app).expect("Failed to create test server");

        Self { server, state }
    }

    pub fn storage(&self) -> &SqliteBackend {
        self.state.storage()
    }

    /// Waits until queued audit entries and notifications are stored.
    pub async fn settle(&self) {
        self.state.audit().flush().await;
        self.state.notifier().flush().await;
    }

    pub async fn signup(&self, name: &str, email: &str) -> Session {
        let response = self
            .server
            .post("/api/auth/signup")
            .json(&json!({ "name": name, "email": email, "password": PASSWORD }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        Session {
            id: body["user"]["id"].as_str().expect("user id").to_string(),
            token: body["token"].as_str().expect("token").to_string(),
        }
    }

    /// Signs up an account and assigns it `role`.
    pub async fn signup_as(&self, role: Role, name: &str, email: &str) -> Session {
        let session = self.signup(name, email).await;
        self.storage()
            .set_role(&session.record_id(), role)
            .await
            .expect("Failed to set role");
        session
    }

    pub async fn admin(&self) -> Session {
        self.signup_as(Role::Admin, "Admin", "admin@example.com").await
    }

    pub async fn seed_medicines(&self, names: &[&str]) {
        let medicines = names.iter().map(|n| NewMedicine::named(*n)).collect();
        self.storage()
            .insert_medicines(medicines)
            .await
            .expect("Failed to seed medicines");
    }

    pub fn get(&self, path: &str, session: &Session) -> TestRequest {
        self.server
            .get(path)
            .add_header(AUTHORIZATION, session.bearer())
    }

    pub fn post(&self, path: &str, session: &Session) -> TestRequest {
        self.server
            .post(path)
            .add_header(AUTHORIZATION, session.bearer())
    }

    pub fn patch(&self, path: &str, session: &Session) -> TestRequest {
        self.server
            .patch(path)
            .add_header(AUTHORIZATION, session.bearer())
    }

    pub fn delete(&self, path: &str, session: &Session) -> TestRequest {
        self.server
            .delete(path)
            .add_header(AUTHORIZATION, session.bearer())
    }

    /// Creates a prescription and returns its id.
    pub async fn prescribe(&self, session: &Session, patient: &str, diagnosis: &str) -> String {
        let response = self
            .post("/api/prescriptions", session)
            .json(&json!({
                "patientName": patient,
                "patientAge": 40,
                "diagnosis": diagnosis,
                "medicines": [{ "name": "Paracetamol 500mg", "dosage": "1 tablet" }],
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        body["data"]["id"].as_str().expect("prescription id").to_string()
    }
}

/// Extracts `data[*].<field>` as strings.
pub fn field_list(body: &Value, field: &str) -> Vec<String> {
    body["data"]
        .as_array()
        .expect("data array")
        .iter()
        .map(|item| item[field].as_str().unwrap_or_default().to_string())
        .collect()
}
