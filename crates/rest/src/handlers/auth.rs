//! Account handlers: signup, login, profile.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header::HOST},
    response::{IntoResponse, Redirect, Response},
};
use erx_persistence::core::Storage;
use erx_persistence::error::{ResourceError, StorageError};
use erx_persistence::types::{
    AuditAction, AuditEntry, AuditResourceType, NewUser, ProfileUpdate, Role, User,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::auth::{MIN_PASSWORD_LEN, hash_password_off_thread, verify_password_off_thread};
use crate::error::{RestError, RestResult};
use crate::extractors::{AuthUser, ClientInfo, JsonBody};
use crate::responses;
use crate::state::AppState;

/// Google's OAuth 2.0 authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Signup request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    /// Display name.
    pub name: Option<String>,
    /// Email address, unique per account.
    pub email: Option<String>,
    /// Optional phone number, usable for login.
    pub phone: Option<String>,
    /// Plain-text password.
    pub password: Option<String>,
}

/// Login request body. Either `email` or `phone` identifies the account.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    /// Email address.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Plain-text password.
    pub password: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn token_response<S: Storage>(
    state: &AppState<S>,
    status: StatusCode,
    message: &str,
    user: &User,
) -> RestResult<Response> {
    let token = state
        .tokens()
        .issue(&user.id)
        .map_err(|e| RestError::internal(format!("Failed to issue token: {}", e)))?;
    Ok(responses::with_status(
        status,
        json!({
            "success": true,
            "message": message,
            "token": token,
            "user": user.summary(),
        }),
    ))
}

/// Registers a new doctor account.
///
/// # HTTP Request
///
/// `POST [base]/api/auth/signup`
///
/// # Response
///
/// - `201 Created` - `{token, user}`
/// - `400 Bad Request` - missing fields or short password
/// - `409 Conflict` - email already registered
pub async fn signup_handler<S>(
    State(state): State<AppState<S>>,
    client: ClientInfo,
    JsonBody(body): JsonBody<SignupRequest>,
) -> RestResult<Response>
where
    S: Storage,
{
    debug!("Processing signup request");

    let (Some(name), Some(email), Some(password)) = (
        present(body.name),
        present(body.email).map(|e| e.to_ascii_lowercase()),
        body.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(RestError::bad_request("Name, email and password are required"));
    };

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(RestError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    if state.storage().find_user_by_email(&email).await?.is_some() {
        return Err(RestError::Conflict {
            message: "Email already registered".to_string(),
        });
    }

    let password_hash = hash_password_off_thread(password).await?;
    let user = state
        .storage()
        .create_user(NewUser {
            name,
            email,
            phone: present(body.phone),
            password_hash,
            role: Role::Doctor,
        })
        .await
        .map_err(|e| match e {
            StorageError::Resource(ResourceError::AlreadyExists { .. }) => RestError::Conflict {
                message: "Email already registered".to_string(),
            },
            other => other.into(),
        })?;

    info!(user = %user.id, "User registered");
    state.audit().record(
        AuditEntry::new(AuditAction::UserSignup, AuditResourceType::User)
            .by(&user.id)
            .on(user.id.as_str())
            .from_client(client.ip_address, client.user_agent),
    );

    token_response(&state, StatusCode::CREATED, "User registered successfully", &user)
}

/// Authenticates with email or phone and password.
///
/// # HTTP Request
///
/// `POST [base]/api/auth/login`
///
/// # Response
///
/// - `200 OK` - `{token, user}`
/// - `400 Bad Request` - missing identifier or password
/// - `401 Unauthorized` - unknown account or wrong password
pub async fn login_handler<S>(
    State(state): State<AppState<S>>,
    client: ClientInfo,
    JsonBody(body): JsonBody<LoginRequest>,
) -> RestResult<Response>
where
    S: Storage,
{
    let email = present(body.email).map(|e| e.to_ascii_lowercase());
    let phone = present(body.phone);
    let password = body.password.filter(|p| !p.is_empty());

    let (identifier, password) = match (email.as_ref().or(phone.as_ref()), password) {
        (Some(identifier), Some(password)) => (identifier.clone(), password),
        _ => return Err(RestError::bad_request("Email or phone, and password required")),
    };
    debug!(%identifier, "Processing login request");

    let user = match &email {
        Some(email) => state.storage().find_user_by_email(email).await?,
        None => state.storage().find_user_by_phone(&identifier).await?,
    };

    let authenticated = match user {
        Some(user) => verify_password_off_thread(password, user.password_hash.clone())
            .await
            .then_some(user),
        None => None,
    };

    let Some(user) = authenticated else {
        state.audit().record(
            AuditEntry::new(AuditAction::UserLoginFailed, AuditResourceType::User)
                .with_details(json!({ "identifier": identifier }))
                .from_client(client.ip_address, client.user_agent),
        );
        return Err(RestError::unauthorized("Invalid credentials"));
    };

    state.audit().record(
        AuditEntry::new(AuditAction::UserLogin, AuditResourceType::User)
            .by(&user.id)
            .on(user.id.as_str())
            .from_client(client.ip_address, client.user_agent),
    );

    token_response(&state, StatusCode::OK, "Login successful", &user)
}

/// Returns the caller's account.
///
/// `GET [base]/api/auth/profile`
pub async fn profile_handler<S>(caller: AuthUser) -> RestResult<Response>
where
    S: Storage,
{
    Ok(responses::success(json!({ "user": caller.user })))
}

/// Updates the caller's name, phone or profile picture.
///
/// `PATCH [base]/api/auth/profile`
pub async fn update_profile_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    client: ClientInfo,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> RestResult<Response>
where
    S: Storage,
{
    debug!(user = %caller.id(), "Processing profile update");

    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(RestError::bad_request("Name cannot be empty"));
    }

    let mut fields = Vec::new();
    if update.name.is_some() {
        fields.push("name");
    }
    if update.phone.is_some() {
        fields.push("phone");
    }
    if update.profile_picture.is_some() {
        fields.push("profilePicture");
    }

    let user = state.storage().update_profile(caller.id(), update).await?;

    if !fields.is_empty() {
        state.audit().record(
            AuditEntry::new(AuditAction::ProfileUpdated, AuditResourceType::User)
                .by(&user.id)
                .on(user.id.as_str())
                .with_details(json!({ "fields": fields }))
                .from_client(client.ip_address, client.user_agent),
        );
    }

    Ok(responses::success(json!({
        "message": "Profile updated",
        "user": user,
    })))
}

/// Tokens are stateless; logging out is the client discarding its token.
///
/// `POST [base]/api/auth/logout`
pub async fn logout_handler() -> Response {
    responses::message("Logged out")
}

/// Starts Google sign-in by redirecting to Google's consent screen.
///
/// # HTTP Request
///
/// `GET [base]/api/auth/google`
///
/// # Response
///
/// - `307 Temporary Redirect` - to Google
/// - `503 Service Unavailable` - no Google client id configured
pub async fn google_handler<S>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> RestResult<Response>
where
    S: Storage,
{
    let Some(client_id) = state.config().google_client_id.as_deref() else {
        return Err(RestError::unavailable(
            "oauth_not_configured",
            "Google sign-in is not configured",
        ));
    };

    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let callback = format!("http://{}/api/auth/google/callback", host);

    let target = url::Url::parse_with_params(
        GOOGLE_AUTH_URL,
        &[
            ("client_id", client_id),
            ("redirect_uri", callback.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
        ],
    )
    .map_err(|e| RestError::internal(format!("Failed to build OAuth URL: {}", e)))?;

    Ok(Redirect::temporary(target.as_str()).into_response())
}
