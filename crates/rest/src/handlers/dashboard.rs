//! Dashboard statistics.

use axum::{extract::State, response::Response};
use chrono::{DateTime, Days, Utc};
use erx_persistence::core::Storage;
use tracing::debug;

use crate::auth::listing_scope;
use crate::error::RestResult;
use crate::extractors::AuthUser;
use crate::responses;
use crate::state::AppState;

/// Number of calendar days covered by the daily counts, today included.
pub const STATS_WINDOW_DAYS: u64 = 7;

/// Midnight UTC at the start of the stats window ending on `now`.
pub fn stats_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    today
        .checked_sub_days(Days::new(STATS_WINDOW_DAYS - 1))
        .unwrap_or(today)
        .and_time(chrono::NaiveTime::MIN)
        .and_utc()
}

/// Per-day counts, top diagnoses and recent prescriptions.
///
/// # HTTP Request
///
/// `GET [base]/api/dashboard/stats`
///
/// # Response
///
/// `{success, data: {treatedStats, diagnosisStats, recentPrescriptions}}`,
/// limited to the caller's own prescriptions unless the caller is an admin.
pub async fn stats_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
) -> RestResult<Response>
where
    S: Storage,
{
    let scope = listing_scope(caller.role(), caller.id());
    let since = stats_window_start(Utc::now());
    debug!(user = %caller.id(), %since, scoped = scope.is_some(), "Processing dashboard stats");

    let stats = state
        .storage()
        .prescription_stats(scope.as_ref(), since)
        .await?;
    Ok(responses::data(stats))
}
