use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{authenticate_ngo, normalize_secret_key};
use crate::db;
use crate::error::AppError;
use crate::workflow::fields;
use crate::AppState;

use super::body;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNgoRequest {
    pub ngo_name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub secret_key: Option<String>,
}

pub async fn register_ngo(
    State(state): State<AppState>,
    payload: Result<Json<RegisterNgoRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = body(payload)?;
    let all_required = || AppError::Validation("All fields are required".to_string());
    let ngo_name = fields::required_text(&req.ngo_name, "ngoName").map_err(|_| all_required())?;
    let contact = fields::required_text(&req.contact, "contact").map_err(|_| all_required())?;
    let address = fields::required_text(&req.address, "address").map_err(|_| all_required())?;
    let secret_key = fields::required_text(&req.secret_key, "secretKey").map_err(|_| all_required())?;
    let secret_key = normalize_secret_key(&secret_key);

    if db::ngo_exists(&state.db, &ngo_name, &secret_key).await? {
        return Err(AppError::Conflict(
            "NGO with this name or secret key already exists".to_string(),
        ));
    }

    let id = db::create_ngo(&state.db, &ngo_name, &contact, &address, &secret_key, Utc::now()).await?;
    tracing::info!(ngo_id = id, ngo = %ngo_name, "NGO registered");

    Ok((
        StatusCode::CREATED,
        AxumJson(json!({ "success": true, "message": "NGO registered successfully" })),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyNgoRequest {
    pub secret_key: Option<String>,
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
}

/// Authenticate an NGO by key and record where it is right now.
pub async fn verify_ngo(
    State(state): State<AppState>,
    payload: Result<Json<VerifyNgoRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = body(payload)?;
    let secret_key = fields::required_text(&req.secret_key, "secretKey")
        .map_err(|_| AppError::Validation("Secret key is required".to_string()))?;
    let missing = |v: &Option<Value>| v.as_ref().map_or(true, Value::is_null);
    if missing(&req.latitude) || missing(&req.longitude) {
        return Err(AppError::Validation("Location coordinates are required".to_string()));
    }
    let (latitude, longitude) = fields::coordinates(&req.latitude, &req.longitude)?;

    let ngo = authenticate_ngo(&state.db, &secret_key).await?;

    let address = state.geocoder.resolve(latitude, longitude).await.map_err(|e| {
        tracing::warn!("NGO location lookup failed: {}", e);
        AppError::from(e)
    })?;

    db::update_ngo_location(&state.db, ngo.id, latitude, longitude, &address).await?;
    tracing::info!(ngo = %ngo.ngo_name, "NGO location updated");

    Ok(AxumJson(json!({
        "success": true,
        "message": "Verified successfully",
        "ngo": { "name": ngo.ngo_name, "address": address },
        "location": { "latitude": latitude, "longitude": longitude, "address": address },
    })))
}
