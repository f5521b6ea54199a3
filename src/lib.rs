//! Surplus food donation service: donors post offers, registered NGOs get
//! an SMS for each one, and NGOs accept donors to settle them into history.

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod geocode;
pub mod phone;
pub mod routes;
pub mod sms;
pub mod workflow;

use config::Config;
use db::DbPool;
use geocode::AddressResolver;
use sms::SmsGateway;

/// Everything a request handler needs; external clients are injected so
/// tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub geocoder: Arc<dyn AddressResolver>,
    pub sms: Arc<dyn SmsGateway>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/donate", post(routes::donors::submit_donation))
        .route("/donors", get(routes::donors::list_donors))
        .route("/donors/{id}", delete(routes::donors::delete_donor))
        .route("/select-donor", post(routes::donors::select_donor))
        .route("/send-notifications", post(routes::donors::mark_notified))
        .route("/notify-donors", post(routes::donors::notify_donors))
        .route("/register-ngo", post(routes::ngos::register_ngo))
        .route("/verify-ngo", post(routes::ngos::verify_ngo))
        .route("/pre-donate", post(routes::events::create_event))
        .route("/events", get(routes::events::list_events))
        .route("/donation-history", get(routes::history::list_history))
        .route("/donation-history/export", get(routes::history::export_csv))
        .with_state(state)
}

/// Per-IP token bucket: `rate_limit_burst` requests up front, refilled at
/// `rate_limit_per_second`. Serve with `into_make_service_with_connect_info`.
pub fn rate_limited(router: Router, config: &Config) -> anyhow::Result<Router> {
    let period = config.rate_limit_period();
    let governor_config = GovernorConfigBuilder::default()
        .per_millisecond(period.as_millis() as u64)
        .burst_size(config.rate_limit_burst)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("RATE_LIMIT_PER_SECOND and RATE_LIMIT_BURST must be non-zero"))?;
    tracing::info!(
        per_second = config.rate_limit_per_second,
        burst = config.rate_limit_burst,
        "rate limiting enabled"
    );
    Ok(router.layer(GovernorLayer::new(Arc::new(governor_config))))
}

async fn health_check() -> &'static str {
    "OK"
}
