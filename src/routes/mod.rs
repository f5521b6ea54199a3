use axum::{extract::rejection::JsonRejection, Json};

use crate::error::AppError;

pub mod donors;
pub mod events;
pub mod history;
pub mod ngos;

/// Unwrap a JSON body, turning extractor rejections into the common error shape.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AppError::Validation(e.body_text()))
}
