use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::DispatchOutcome;
use crate::db::{self, models::{Donor, Ngo, ACCEPTANCE_POINTS}};
use crate::error::AppError;
use crate::{auth, phone, AppState};

/// One entry of the `donors` array an NGO submits. The client echoes whole
/// donor rows; only the id is trusted, the rest is re-read from the database.
#[derive(Debug, Clone, Deserialize)]
pub struct DonorSelection {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DonorOutcome {
    pub donor_id: i64,
    pub donor_name: String,
    pub outcome: DispatchOutcome,
}

#[derive(Debug)]
pub struct AcceptanceReport {
    pub ngo_name: String,
    pub processed: usize,
    pub outcomes: Vec<DonorOutcome>,
}

impl AcceptanceReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// True when at least one donor was settled.
    pub fn success(&self) -> bool {
        self.processed > 0
    }

    pub fn summary(&self) -> String {
        format!("Successfully processed {} out of {} donors", self.processed, self.total())
    }
}

pub fn acceptance_message(donor: &Donor, ngo: &Ngo) -> String {
    format!(
        "Dear {},\nYour food donation of {} servings has been accepted by:\n\nNGO Name: {}\nNGO Contact: {}\nNGO Address: {}\n\nThank you for your contribution!",
        donor.name,
        donor.servings,
        ngo.ngo_name,
        ngo.contact,
        ngo.effective_address()
    )
}

/// Notify each selected donor that `secret_key`'s NGO accepted them and
/// settle the ones whose SMS went out.
///
/// Donors are handled in order and independently. A failed SMS leaves the
/// donor active so the NGO can try again.
pub async fn accept_donors(
    state: &AppState,
    secret_key: &str,
    selections: Vec<DonorSelection>,
) -> Result<AcceptanceReport, AppError> {
    if selections.is_empty() {
        return Err(AppError::Validation("No donors provided".to_string()));
    }
    let ngo = auth::authenticate_ngo(&state.db, secret_key).await?;

    let mut outcomes = Vec::with_capacity(selections.len());
    for selection in selections {
        let (donor_name, outcome) = match settle_one(state, &ngo, &selection).await {
            Ok((name, message_sid)) => {
                info!(donor = %name, "donor accepted and settled");
                (name, DispatchOutcome::Sent { message_sid })
            }
            Err((name, error)) => {
                warn!("Error processing donor {}: {}", name, error);
                (name, DispatchOutcome::Failed { error })
            }
        };
        outcomes.push(DonorOutcome {
            donor_id: selection.id,
            donor_name,
            outcome,
        });
    }

    let processed = outcomes.iter().filter(|o| o.outcome.is_sent()).count();
    Ok(AcceptanceReport {
        ngo_name: ngo.ngo_name,
        processed,
        outcomes,
    })
}

type Settled = Result<(String, String), (String, String)>;

async fn settle_one(state: &AppState, ngo: &Ngo, selection: &DonorSelection) -> Settled {
    let fallback_name = selection
        .name
        .clone()
        .unwrap_or_else(|| format!("donor #{}", selection.id));

    let donor = match db::get_donor(&state.db, selection.id).await {
        Ok(Some(donor)) => donor,
        Ok(None) => return Err((fallback_name, "Donor is no longer active".to_string())),
        Err(e) => return Err((fallback_name, e.to_string())),
    };
    let name = donor.name.clone();

    let to = phone::normalize_with(&donor.contact, &state.config.country_code);
    info!("Attempting to notify {} at {}", name, to);
    let message_sid = state
        .sms
        .send(&to, &acceptance_message(&donor, ngo))
        .await
        .map_err(|e| (name.clone(), e.to_string()))?;

    // The SMS is out; from here a failure leaves a notified-but-active donor.
    match db::settle_donor(&state.db, donor, ACCEPTANCE_POINTS, Utc::now()).await {
        Ok(true) => Ok((name, message_sid)),
        Ok(false) => Err((name, "Donor was settled by another request".to_string())),
        Err(e) => {
            error!("SMS {} sent to {} but history was not recorded: {}", message_sid, name, e);
            Err((name, format!("Notification sent but history was not recorded: {e}")))
        }
    }
}
