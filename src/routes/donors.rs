use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::BearerKey;
use crate::db::{self, models::DonorStatus};
use crate::error::AppError;
use crate::workflow::{
    acceptance::{self, DonorSelection},
    intake::{self, DonationSubmission},
    OutcomeBody,
};
use crate::AppState;

use super::body;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NgoDetail<'a> {
    ngo_name: &'a str,
    #[serde(flatten)]
    outcome: OutcomeBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DonorDetail<'a> {
    donor_id: i64,
    donor_name: &'a str,
    #[serde(flatten)]
    outcome: OutcomeBody<'a>,
}

pub async fn submit_donation(
    State(state): State<AppState>,
    payload: Result<Json<DonationSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let submission = body(payload)?;
    let report = intake::submit_donation(&state, submission).await?;

    let details: Vec<_> = report
        .notifications
        .iter()
        .map(|n| NgoDetail {
            ngo_name: &n.ngo_name,
            outcome: (&n.outcome).into(),
        })
        .collect();

    Ok((
        StatusCode::CREATED,
        AxumJson(json!({
            "success": true,
            "message": "Donation submitted successfully and NGOs have been notified!",
            "address": report.address,
            "donorId": report.donor_id,
            "notified": report.notified_count(),
            "details": details,
        })),
    ))
}

pub async fn list_donors(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let donors = db::list_donors(&state.db).await?;
    tracing::debug!("Fetched donors: {}", donors.len());
    Ok(AxumJson(donors))
}

pub async fn delete_donor(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if !db::delete_donor(&state.db, id).await? {
        return Err(AppError::NotFound("Donor"));
    }
    Ok(AxumJson(json!({ "success": true, "message": "Donor removed successfully" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDonorRequest {
    pub donor_id: i64,
}

pub async fn select_donor(
    State(state): State<AppState>,
    payload: Result<Json<SelectDonorRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = body(payload)?;
    if !db::set_donor_status(&state.db, req.donor_id, DonorStatus::Selected).await? {
        return Err(AppError::NotFound("Donor"));
    }
    Ok(AxumJson(json!({ "success": true, "message": "Donor has been selected." })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkNotifiedRequest {
    #[serde(default)]
    pub donor_ids: Vec<i64>,
}

pub async fn mark_notified(
    State(state): State<AppState>,
    payload: Result<Json<MarkNotifiedRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = body(payload)?;
    if req.donor_ids.is_empty() {
        return Err(AppError::Validation("No donors provided".to_string()));
    }
    let updated = db::mark_notified(&state.db, req.donor_ids).await?;
    Ok(AxumJson(json!({
        "success": true,
        "message": format!("Marked {updated} donors as notified"),
        "updated": updated,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyDonorsRequest {
    #[serde(default)]
    pub donors: Vec<DonorSelection>,
    pub ngo_secret_key: Option<String>,
}

/// Always 200 once the NGO is known; callers read `success` in the payload.
pub async fn notify_donors(
    State(state): State<AppState>,
    BearerKey(bearer): BearerKey,
    payload: Result<Json<NotifyDonorsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = body(payload)?;
    let secret_key = req.ngo_secret_key.or(bearer).unwrap_or_default();

    let report = acceptance::accept_donors(&state, &secret_key, req.donors).await?;
    tracing::info!(ngo = %report.ngo_name, "{}", report.summary());

    let details: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| DonorDetail {
            donor_id: o.donor_id,
            donor_name: &o.donor_name,
            outcome: (&o.outcome).into(),
        })
        .collect();

    Ok(AxumJson(json!({
        "success": report.success(),
        "message": report.summary(),
        "details": details,
    })))
}
