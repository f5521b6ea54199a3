#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};

use foodlink::config::Config;
use foodlink::db::{self, models::NewDonor, DbPool};
use foodlink::geocode::{AddressResolver, GeocodeError};
use foodlink::sms::{DispatchError, SmsGateway};
use foodlink::AppState;

pub const ADDRESS: &str = "12 MG Road, Bengaluru 560001, India";

/// Resolver that answers every lookup with a fixed address, or with nothing.
pub struct FakeResolver {
    address: Option<String>,
    pub calls: Mutex<Vec<(f64, f64)>>,
}

impl FakeResolver {
    pub fn returning(address: &str) -> Self {
        Self { address: Some(address.to_string()), calls: Mutex::new(Vec::new()) }
    }

    pub fn empty() -> Self {
        Self { address: None, calls: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl AddressResolver for FakeResolver {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        self.calls.lock().unwrap().push((latitude, longitude));
        self.address.clone().ok_or(GeocodeError::NoResults)
    }
}

/// Gateway that records every attempt and rejects the numbers it was told to.
#[derive(Default)]
pub struct FakeSms {
    failing: Vec<String>,
    pub attempts: Mutex<Vec<(String, String)>>,
}

impl FakeSms {
    pub fn failing_for(numbers: &[&str]) -> Self {
        Self {
            failing: numbers.iter().map(|n| n.to_string()).collect(),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts_to(&self, to: &str) -> usize {
        self.attempts.lock().unwrap().iter().filter(|(n, _)| n == to).count()
    }

    pub fn total_attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl SmsGateway for FakeSms {
    async fn send(&self, to: &str, body: &str) -> Result<String, DispatchError> {
        let mut attempts = self.attempts.lock().unwrap();
        attempts.push((to.to_string(), body.to_string()));
        if self.failing.iter().any(|n| n == to) {
            return Err(DispatchError::Rejected {
                status: 400,
                message: format!("The 'To' number {to} is not reachable"),
            });
        }
        Ok(format!("SM{:04}", attempts.len()))
    }
}

pub struct Harness {
    pub state: AppState,
    pub resolver: Arc<FakeResolver>,
    pub sms: Arc<FakeSms>,
    _dir: tempfile::TempDir,
}

pub async fn harness(resolver: FakeResolver, sms: FakeSms) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = db::init_pool_at(dir.path().join("foodlink.db"), 2).await.expect("init pool");
    let config = Config::from_lookup(|_| None).expect("config");
    let resolver = Arc::new(resolver);
    let sms = Arc::new(sms);
    let state = AppState {
        db: pool,
        config: Arc::new(config),
        geocoder: resolver.clone(),
        sms: sms.clone(),
    };
    Harness { state, resolver, sms, _dir: dir }
}

pub async fn register_ngo(pool: &DbPool, name: &str, contact: &str, key: &str) -> i64 {
    db::create_ngo(pool, name, contact, "Jayanagar, Bengaluru", &foodlink::auth::normalize_secret_key(key), Utc::now())
        .await
        .expect("create ngo")
}

pub async fn add_donor(pool: &DbPool, name: &str, contact: &str) -> i64 {
    db::add_donor(
        pool,
        NewDonor {
            name: name.to_string(),
            contact: contact.to_string(),
            address: ADDRESS.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            food_type: "Veg biryani".to_string(),
            servings: 5,
            prepared_time: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            latitude: 12.9716,
            longitude: 77.5946,
        },
        Utc::now(),
    )
    .await
    .expect("add donor")
}

/// Run raw SQL against the test database, e.g. to take a table offline.
pub fn execute_sql(pool: &DbPool, sql: &str) {
    pool.get().expect("connection").execute_batch(sql).expect("execute sql");
}
