use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Points credited to a donor every time an NGO accepts one of their offers.
pub const ACCEPTANCE_POINTS: i64 = 10;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonorStatus {
    #[serde(rename = "active")]
    Active,
    Selected,
}

impl DonorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonorStatus::Active => "active",
            DonorStatus::Selected => "Selected",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("selected") {
            DonorStatus::Selected
        } else {
            DonorStatus::Active
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Donor {
    pub id: i64,
    pub name: String,
    pub contact: String,
    pub address: String,
    pub email: String,
    pub food_type: String,
    pub servings: i64,
    pub prepared_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub status: DonorStatus,
    pub notified: bool,
    pub created_at: DateTime<Utc>,
}

/// A validated donor row that has not been written yet.
#[derive(Debug, Clone)]
pub struct NewDonor {
    pub name: String,
    pub contact: String,
    pub address: String,
    pub email: String,
    pub food_type: String,
    pub servings: i64,
    pub prepared_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize, Debug, Clone)]
pub struct Ngo {
    pub id: i64,
    pub ngo_name: String,
    pub contact: String,
    pub address: String,
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    pub current_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Ngo {
    /// Where the NGO was last seen, falling back to its registered address.
    pub fn effective_address(&self) -> &str {
        self.current_address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(&self.address)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HistoryEntry {
    pub id: i64,
    pub donor_name: String,
    pub email: Option<String>,
    pub food_type: Option<String>,
    pub servings: i64,
    pub address: Option<String>,
    pub points: i64,
    pub donation_date: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Event {
    pub id: i64,
    pub event_name: String,
    pub event_info: String,
    pub donor_name: String,
    pub contact: String,
    pub address: String,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
