use axum::http::{header, HeaderValue, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodlink::config::Config;
use foodlink::geocode::OpenCageResolver;
use foodlink::sms::TwilioGateway;
use foodlink::{db, AppState};

const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:5174"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if it exists
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "foodlink=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting foodlink...");
    let config = Config::from_env()?;

    tracing::info!("Initializing database connection pool...");
    let db_pool = db::init_pool(&config).await?;
    tracing::info!("Database ready at {}", config.database_url);

    let state = AppState {
        db: db_pool,
        geocoder: Arc::new(OpenCageResolver::from_config(&config)?),
        sms: Arc::new(TwilioGateway::from_config(&config)?),
        config: Arc::new(config.clone()),
    };

    let app = foodlink::router(state).layer(cors_layer(&config)?);
    let app = foodlink::rate_limited(app, &config)?
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

// No permissive mode: an explicit list, mandatory in production.
fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid ALLOWED_ORIGINS entry: {}", trimmed);
                    None
                }
            }
        })
        .collect();

    let origins = if origins.is_empty() {
        if config.is_production() {
            anyhow::bail!("ALLOWED_ORIGINS must contain at least one valid origin in production");
        }
        DEV_ORIGINS.map(HeaderValue::from_static).to_vec()
    } else {
        origins
    };

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}
