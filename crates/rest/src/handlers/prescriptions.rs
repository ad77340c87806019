//! Prescription handlers.
//!
//! Non-admin callers only ever see and mutate their own prescriptions.
//! Status changes are not restricted by the current status; the only guard is
//! who is asking. Deleting a prescription cancels it.

use axum::{
    extract::{Path, State},
    response::Response,
};
use erx_persistence::core::Storage;
use erx_persistence::types::{
    AuditAction, AuditEntry, AuditResourceType, NewNotification, NewPrescription, Prescription,
    PrescriptionFilter, PrescriptionQuery, PrescriptionStatus, PrescriptionView, RecordId,
    SortDirection,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::auth::{PRESCRIBERS, can_manage_prescription, listing_scope, require_role};
use crate::error::{RestError, RestResult};
use crate::extractors::{AuthUser, ClientInfo, JsonBody, QueryParams};
use crate::responses;
use crate::state::AppState;

/// Notification type sent to the prescriber on creation.
pub const PRESCRIPTION_CREATED_NOTIFICATION: &str = "prescription_created";

/// Body of a status change request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusRequest {
    /// Target status.
    pub status: Option<String>,
}

fn prescription_not_found() -> RestError {
    RestError::not_found("Prescription not found")
}

fn access_denied() -> RestError {
    RestError::forbidden("Access denied")
}

/// Parses the `status` filter. Unknown values are rejected.
fn status_filter(params: &QueryParams) -> RestResult<Option<PrescriptionStatus>> {
    params
        .get("status")
        .map(|s| s.trim().parse::<PrescriptionStatus>())
        .transpose()
        .map_err(|e| RestError::bad_request(e.to_string()))
}

async fn with_doctor<S: Storage>(
    state: &AppState<S>,
    prescription: Prescription,
) -> RestResult<PrescriptionView> {
    let doctor = state
        .storage()
        .find_user(&prescription.doctor)
        .await?
        .map(|u| u.summary());
    Ok(prescription.with_doctor(doctor))
}

/// Loads a prescription the caller is allowed to manage.
///
/// Existence is checked before ownership.
async fn load_managed<S: Storage>(
    state: &AppState<S>,
    caller: &AuthUser,
    raw_id: &str,
) -> RestResult<Prescription> {
    let id = RecordId::parse(raw_id).ok_or_else(prescription_not_found)?;
    let prescription = state
        .storage()
        .get_prescription(&id)
        .await?
        .ok_or_else(prescription_not_found)?;

    if !can_manage_prescription(caller.role(), caller.id(), &prescription.doctor) {
        return Err(access_denied());
    }
    Ok(prescription)
}

/// Changes the status of a prescription the caller manages and records it.
///
/// Checks run in order: existence, ownership, then the requested status.
pub async fn set_status<S: Storage>(
    state: &AppState<S>,
    caller: &AuthUser,
    client: ClientInfo,
    raw_id: &str,
    raw_status: Option<&str>,
    action: AuditAction,
) -> RestResult<Prescription> {
    let current = load_managed(state, caller, raw_id).await?;

    let status = raw_status
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RestError::bad_request("Status is required"))?
        .parse::<PrescriptionStatus>()
        .map_err(|e| RestError::bad_request(e.to_string()))?;

    let updated = state
        .storage()
        .set_prescription_status(&current.id, status)
        .await?;

    info!(
        prescription = %updated.id,
        from = %current.status,
        to = %updated.status,
        user = %caller.id(),
        "Prescription status changed"
    );
    state.audit().record(
        AuditEntry::new(action, AuditResourceType::Prescription)
            .by(caller.id())
            .on(updated.id.as_str())
            .with_details(json!({
                "prescriptionId": updated.id,
                "previousStatus": current.status,
                "status": updated.status,
                "actingUser": caller.id(),
            }))
            .from_client(client.ip_address, client.user_agent),
    );

    Ok(updated)
}

/// Creates a prescription owned by the caller.
///
/// # HTTP Request
///
/// `POST [base]/api/prescriptions` (doctor or admin)
///
/// # Response
///
/// - `201 Created` - the stored prescription
/// - `400 Bad Request` - validation failures, joined
/// - `403 Forbidden` - caller may not prescribe
pub async fn create_prescription_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    client: ClientInfo,
    JsonBody(body): JsonBody<NewPrescription>,
) -> RestResult<Response>
where
    S: Storage,
{
    require_role(caller.role(), PRESCRIBERS)?;
    debug!(user = %caller.id(), "Processing prescription create");

    body.validate().map_err(RestError::validation)?;

    let prescription = state
        .storage()
        .create_prescription(caller.id(), body)
        .await?;

    state.audit().record(
        AuditEntry::new(
            AuditAction::PrescriptionCreated,
            AuditResourceType::Prescription,
        )
        .by(caller.id())
        .on(prescription.id.as_str())
        .with_details(json!({
            "patientName": prescription.patient_name,
            "medicineCount": prescription.medicines.len(),
        }))
        .from_client(client.ip_address, client.user_agent),
    );
    state.notifier().dispatch(NewNotification {
        user: caller.id().clone(),
        kind: PRESCRIPTION_CREATED_NOTIFICATION.to_string(),
        title: "Prescription created".to_string(),
        message: format!("Prescription for {} has been created", prescription.patient_name),
    });

    Ok(responses::created(
        prescription.with_doctor(Some(caller.user.summary())),
    ))
}

/// Lists prescriptions with cursor paging.
///
/// # HTTP Request
///
/// `GET [base]/api/prescriptions?limit&cursor&search&status&from&to&sort`
///
/// # Response
///
/// `{success, data, pagination: {hasMore, nextCursor, limit}}`. Unknown
/// `status` values are rejected with 400; malformed `limit` and `cursor`
/// fall back to defaults.
pub async fn list_prescriptions_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    params: QueryParams,
) -> RestResult<Response>
where
    S: Storage,
{
    let query = PrescriptionQuery {
        filter: PrescriptionFilter {
            doctor: listing_scope(caller.role(), caller.id()),
            search: params.text("search"),
            status: status_filter(&params)?,
            from: params.text("from"),
            to: params.text("to"),
        },
        cursor: params.cursor(),
        limit: params.limit(state.default_page_size(), state.max_page_size()),
        sort: SortDirection::parse_lenient(params.get("sort")),
    };
    debug!(
        user = %caller.id(),
        limit = query.limit,
        cursor = ?query.cursor,
        "Processing prescription listing"
    );

    let page = state.storage().list_prescriptions(&query).await?;
    Ok(responses::cursor_page(page))
}

/// Returns one prescription the caller manages.
///
/// `GET [base]/api/prescriptions/{id}`
pub async fn get_prescription_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> RestResult<Response>
where
    S: Storage,
{
    debug!(%id, user = %caller.id(), "Processing prescription read");
    let prescription = load_managed(&state, &caller, &id).await?;
    Ok(responses::data(with_doctor(&state, prescription).await?))
}

/// Changes a prescription's status.
///
/// # HTTP Request
///
/// `PATCH [base]/api/prescriptions/{id}/status` with `{status}`
///
/// # Response
///
/// - `200 OK` - the updated prescription
/// - `400 Bad Request` - missing or unknown status
/// - `403 Forbidden` - not the owner and not an admin
/// - `404 Not Found` - unknown id
pub async fn update_status_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    client: ClientInfo,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<StatusRequest>,
) -> RestResult<Response>
where
    S: Storage,
{
    debug!(%id, user = %caller.id(), "Processing prescription status change");
    let updated = set_status(
        &state,
        &caller,
        client,
        &id,
        body.status.as_deref(),
        AuditAction::PrescriptionUpdated,
    )
    .await?;

    Ok(responses::success(json!({
        "message": "Status updated",
        "data": with_doctor(&state, updated).await?,
    })))
}

/// Cancels a prescription. Nothing is physically removed.
///
/// `DELETE [base]/api/prescriptions/{id}`
pub async fn delete_prescription_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    client: ClientInfo,
    Path(id): Path<String>,
) -> RestResult<Response>
where
    S: Storage,
{
    debug!(%id, user = %caller.id(), "Processing prescription delete");
    set_status(
        &state,
        &caller,
        client,
        &id,
        Some(PrescriptionStatus::Cancelled.as_str()),
        AuditAction::PrescriptionDeleted,
    )
    .await?;

    Ok(responses::message("Prescription cancelled"))
}
