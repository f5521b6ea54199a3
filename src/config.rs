use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

/// Runtime settings, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub rust_env: String,
    pub database_url: String,
    pub db_pool_size: u32,
    pub http_timeout: Duration,
    pub country_code: String,
    pub opencage_api_key: Option<String>,
    pub opencage_base_url: String,
    pub twilio: Option<TwilioCredentials>,
    pub twilio_base_url: String,
    pub allowed_origins: Option<String>,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

#[derive(Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

// Keep the auth token out of logs.
impl std::fmt::Debug for TwilioCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioCredentials")
            .field("account_sid", &self.account_sid)
            .field("from_number", &self.from_number)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let twilio = match (
            var("TWILIO_ACCOUNT_SID"),
            var("TWILIO_AUTH_TOKEN"),
            var("TWILIO_PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioCredentials {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => {
                warn!("Twilio credentials missing; SMS notifications will fail");
                None
            }
        };

        let opencage_api_key = var("OPENCAGE_API_KEY");
        if opencage_api_key.is_none() {
            warn!("OPENCAGE_API_KEY not set; address lookups will fail");
        }

        let country_code = var("COUNTRY_CODE").unwrap_or_else(|| crate::phone::DEFAULT_COUNTRY_CODE.to_string());
        if country_code.len() > 3 || !country_code.chars().all(|c| c.is_ascii_digit()) {
            anyhow::bail!("Invalid COUNTRY_CODE value {country_code:?}: expected 1-3 digits without '+'");
        }

        let rate_limit_per_second = parse_or(&var, "RATE_LIMIT_PER_SECOND", 50)?;
        let rate_limit_burst = parse_or(&var, "RATE_LIMIT_BURST", 100)?;
        if rate_limit_per_second == 0 || rate_limit_burst == 0 {
            anyhow::bail!("RATE_LIMIT_PER_SECOND and RATE_LIMIT_BURST must be non-zero");
        }

        Ok(Self {
            port: parse_or(&var, "PORT", 5001)?,
            rust_env: var("RUST_ENV").unwrap_or_else(|| "development".to_string()),
            database_url: var("DATABASE_URL").unwrap_or_else(|| "foodlink.db".to_string()),
            db_pool_size: parse_or(&var, "DB_POOL_SIZE", 10)?,
            http_timeout: Duration::from_secs(parse_or(&var, "HTTP_TIMEOUT_SECS", 30)?),
            country_code,
            opencage_api_key,
            opencage_base_url: var("OPENCAGE_BASE_URL")
                .unwrap_or_else(|| "https://api.opencagedata.com".to_string()),
            twilio,
            twilio_base_url: var("TWILIO_BASE_URL").unwrap_or_else(|| "https://api.twilio.com".to_string()),
            allowed_origins: var("ALLOWED_ORIGINS"),
            rate_limit_per_second,
            rate_limit_burst,
        })
    }

    pub fn is_production(&self) -> bool {
        self.rust_env == "production"
    }

    /// Time for one request slot to refill per client IP. Rates above
    /// 1000/s are capped at one slot per millisecond.
    pub fn rate_limit_period(&self) -> Duration {
        Duration::from_millis((1000 / self.rate_limit_per_second.max(1)).max(1))
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {key} value {raw:?}: {e}")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
