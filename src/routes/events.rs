use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::db;
use crate::error::AppError;
use crate::workflow::fields;
use crate::AppState;

use super::body;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub event_name: Option<String>,
    pub event_info: Option<String>,
    pub donor_name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub end_time: Option<String>,
}

/// Register an upcoming event expected to have surplus food.
pub async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = body(payload)?;
    let event_name = fields::required_text(&req.event_name, "eventName")?;
    let event_info = fields::required_text(&req.event_info, "eventInfo")?;
    let donor_name = fields::required_text(&req.donor_name, "donorName")?;
    let contact = fields::required_text(&req.contact, "contact")?;
    let address = fields::required_text(&req.address, "address")?;
    let end_time = fields::timestamp(&req.end_time, "endTime")?;

    db::add_event(&state.db, &event_name, &event_info, &donor_name, &contact, &address, end_time, Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        AxumJson(json!({ "success": true, "message": "Event registered successfully" })),
    ))
}

pub async fn list_events(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let events = db::list_events(&state.db).await?;
    Ok(AxumJson(events))
}
