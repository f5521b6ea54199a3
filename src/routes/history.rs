use axum::{
    extract::State,
    response::{IntoResponse, Json as AxumJson},
};
use crate::AppState;
use crate::db::{self, models::HistoryEntry};
use crate::error::AppError;
use axum::http::{HeaderValue, header};
use axum::response::Response;

pub async fn list_history(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let history = db::list_history(&state.db).await?;
    Ok(AxumJson(history))
}

pub async fn export_csv(State(state): State<AppState>) -> Result<Response, AppError> {
    let history = db::list_history(&state.db).await?;
    let csv = render_csv(&history).map_err(|e| AppError::Internal(format!("history CSV: {e}")))?;

    let mut resp = Response::new(csv.into());
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8"));
    headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("attachment; filename=donation_history.csv"));
    Ok(resp)
}

fn render_csv(entries: &[HistoryEntry]) -> anyhow::Result<String> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["id", "donor_name", "email", "food_type", "servings", "address", "points", "donation_date"])?;
    for e in entries {
        w.write_record([
            e.id.to_string(),
            e.donor_name.clone(),
            e.email.clone().unwrap_or_default(),
            e.food_type.clone().unwrap_or_default(),
            e.servings.to_string(),
            e.address.clone().unwrap_or_default(),
            e.points.to_string(),
            e.donation_date.to_rfc3339(),
        ])?;
    }
    let bytes = w.into_inner().map_err(|e| anyhow::anyhow!("flush csv: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}
