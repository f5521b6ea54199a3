use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::DbError;
use crate::geocode::GeocodeError;

/// Every failure a request can end in. The user-facing message comes from
/// the variant; provider details travel separately in `error`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid secret key")]
    InvalidCredential,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Could not determine address from location")]
    NoAddressFound,

    #[error("Address lookup is not configured")]
    GeocodingUnavailable,

    #[error("Address lookup failed")]
    GeocodingFailed(String),

    #[error("Database error")]
    Persistence(#[from] DbError),

    #[error("Internal error")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) | AppError::NoAddressFound => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::GeocodingUnavailable
            | AppError::GeocodingFailed(_)
            | AppError::Persistence(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Detail safe to show a caller, if any.
    pub fn detail(&self) -> Option<String> {
        match self {
            AppError::GeocodingFailed(detail) => Some(detail.clone()),
            _ => None,
        }
    }
}

impl From<GeocodeError> for AppError {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::Unavailable => AppError::GeocodingUnavailable,
            GeocodeError::NoResults => AppError::NoAddressFound,
            GeocodeError::Failed(detail) => AppError::GeocodingFailed(detail),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                AppError::Persistence(e) => tracing::error!("DB Error: {}", e),
                AppError::Internal(e) => tracing::error!("Internal error: {}", e),
                other => tracing::error!("{}: {:?}", other, other.detail()),
            }
        }

        let mut body = json!({
            "success": false,
            "message": self.to_string(),
        });
        if let Some(detail) = self.detail() {
            body["error"] = json!(detail);
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NoAddressFound.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("Donor").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::GeocodingFailed("timeout".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn geocode_errors_map_to_tags() {
        assert!(matches!(AppError::from(GeocodeError::NoResults), AppError::NoAddressFound));
        assert!(matches!(AppError::from(GeocodeError::Unavailable), AppError::GeocodingUnavailable));
        let failed = AppError::from(GeocodeError::Failed("502 Bad Gateway".into()));
        assert_eq!(failed.detail().as_deref(), Some("502 Bad Gateway"));
        assert_eq!(failed.to_string(), "Address lookup failed");
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(AppError::NotFound("Donor").to_string(), "Donor not found");
    }
}
