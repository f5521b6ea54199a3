use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::{fields, DispatchOutcome};
use crate::db::{self, models::NewDonor};
use crate::error::AppError;
use crate::{phone, AppState};

/// Body of `POST /donate`. Fields stay loose so validation can name what is wrong.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationSubmission {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub food_type: Option<String>,
    pub servings: Option<Value>,
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub prepared_time: Option<String>,
}

#[derive(Debug)]
struct ValidDonation {
    name: String,
    contact: String,
    email: String,
    food_type: String,
    servings: i64,
    latitude: f64,
    longitude: f64,
    prepared_time: chrono::DateTime<Utc>,
}

impl DonationSubmission {
    fn validate(&self) -> Result<ValidDonation, AppError> {
        let (latitude, longitude) = fields::coordinates(&self.latitude, &self.longitude)?;
        Ok(ValidDonation {
            name: fields::required_text(&self.name, "name")?,
            contact: fields::required_text(&self.contact, "contact")?,
            email: fields::required_text(&self.email, "email")?,
            food_type: fields::required_text(&self.food_type, "foodType")?,
            servings: fields::positive_count(&self.servings, "servings")?,
            latitude,
            longitude,
            prepared_time: fields::timestamp(&self.prepared_time, "preparedTime")?,
        })
    }
}

impl ValidDonation {
    fn into_new_donor(self, address: String) -> NewDonor {
        NewDonor {
            name: self.name,
            contact: self.contact,
            address,
            email: self.email,
            food_type: self.food_type,
            servings: self.servings,
            prepared_time: self.prepared_time,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NgoNotification {
    pub ngo_name: String,
    pub outcome: DispatchOutcome,
}

#[derive(Debug)]
pub struct IntakeReport {
    pub donor_id: i64,
    pub address: String,
    pub notifications: Vec<NgoNotification>,
}

impl IntakeReport {
    pub fn notified_count(&self) -> usize {
        self.notifications.iter().filter(|n| n.outcome.is_sent()).count()
    }
}

pub fn donation_message(donor: &NewDonor) -> String {
    format!(
        "New food donation available!\n\nDonor: {}\nFood Type: {}\nServings: {}\nLocation: {}\n\nPlease check your NGO dashboard for more details.",
        donor.name, donor.food_type, donor.servings, donor.address
    )
}

/// Validate, geocode and store a donation, then alert every registered NGO.
///
/// Only validation, address resolution and the donor insert can fail the
/// call. NGO alerts are best-effort; each one's result is in the report.
pub async fn submit_donation(state: &AppState, submission: DonationSubmission) -> Result<IntakeReport, AppError> {
    let donation = submission.validate()?;

    let address = state
        .geocoder
        .resolve(donation.latitude, donation.longitude)
        .await
        .map_err(|e| {
            warn!("Donation address lookup failed: {}", e);
            AppError::from(e)
        })?;

    let donor = donation.into_new_donor(address.clone());
    let message = donation_message(&donor);
    let donor_name = donor.name.clone();
    let donor_id = db::add_donor(&state.db, donor, Utc::now()).await?;
    info!(donor_id, donor = %donor_name, "donation recorded");

    let ngos = match db::list_ngos(&state.db).await {
        Ok(ngos) => ngos,
        Err(e) => {
            error!("Donation {} stored but NGO list unavailable: {}", donor_id, e);
            Vec::new()
        }
    };

    let mut notifications = Vec::with_capacity(ngos.len());
    for ngo in ngos {
        let to = phone::normalize_with(&ngo.contact, &state.config.country_code);
        let outcome = match state.sms.send(&to, &message).await {
            Ok(message_sid) => {
                info!(ngo = %ngo.ngo_name, "donation alert sent");
                DispatchOutcome::Sent { message_sid }
            }
            Err(e) => {
                warn!("Failed to send notification to NGO {}: {}", ngo.ngo_name, e);
                DispatchOutcome::Failed { error: e.to_string() }
            }
        };
        notifications.push(NgoNotification {
            ngo_name: ngo.ngo_name,
            outcome,
        });
    }

    Ok(IntakeReport {
        donor_id,
        address,
        notifications,
    })
}
