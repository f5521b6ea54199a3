use std::future::Future;
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use axum::extract::FromRequestParts;

use crate::db::{self, models::Ngo, DbPool};
use crate::error::AppError;

/// Secret keys are stored and compared trimmed and lower-cased.
pub fn normalize_secret_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Resolve the NGO owning `secret_key`, matching case-insensitively.
pub async fn authenticate_ngo(pool: &DbPool, secret_key: &str) -> Result<Ngo, AppError> {
    let key = normalize_secret_key(secret_key);
    if key.is_empty() {
        return Err(AppError::Validation("Secret key is required".to_string()));
    }
    match db::find_ngo_by_secret_key(pool, &key).await? {
        Some(ngo) => Ok(ngo),
        None => {
            tracing::info!("NGO lookup failed for presented secret key");
            Err(AppError::InvalidCredential)
        }
    }
}

/// NGO secret key presented as `Authorization: Bearer <key>`, if any.
pub struct BearerKey(pub Option<String>);

impl<S> FromRequestParts<S> for BearerKey
where
    S: Send + Sync + 'static,
{
    type Rejection = (StatusCode, String);

    fn from_request_parts(parts: &mut Parts, _state: &S) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let key = extract_bearer(&parts.headers);
        async move { Ok(BearerKey(key)) }
    }
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;

    #[test]
    fn keys_compare_case_insensitively() {
        assert_eq!(normalize_secret_key("  MySecret "), "mysecret");
        assert_eq!(normalize_secret_key("mysecret"), normalize_secret_key("MYSECRET"));
    }

    #[test]
    fn bearer_header_is_parsed() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer MySecret"));
        assert_eq!(extract_bearer(&headers).as_deref(), Some("MySecret"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers), None);
    }

    #[tokio::test]
    async fn registered_key_matches_any_case() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = db::init_pool_at(dir.path().join("auth.db"), 1).await.expect("pool");
        db::create_ngo(&pool, "Annadaan", "9876543210", "Jayanagar", &normalize_secret_key("MySecret"), Utc::now())
            .await
            .expect("create ngo");

        let ngo = authenticate_ngo(&pool, "mysecret").await.expect("lowercase key");
        assert_eq!(ngo.ngo_name, "Annadaan");
        assert!(authenticate_ngo(&pool, "MYSECRET ").await.is_ok());
        assert!(matches!(authenticate_ngo(&pool, "wrong").await, Err(AppError::InvalidCredential)));
        assert!(matches!(authenticate_ngo(&pool, "  ").await, Err(AppError::Validation(_))));
    }
}
