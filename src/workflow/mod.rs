//! The donation-to-notification workflow: intake with NGO fan-out, and
//! NGO acceptance settling donors into the history ledger.

pub mod acceptance;
pub mod fields;
pub mod intake;

use serde::Serialize;

/// Result of a single SMS attempt inside a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent { message_sid: String },
    Failed { error: String },
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent { .. })
    }
}

/// Wire form shared by the per-item `details` arrays.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OutcomeBody<'a> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_sid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> From<&'a DispatchOutcome> for OutcomeBody<'a> {
    fn from(outcome: &'a DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Sent { message_sid } => OutcomeBody {
                success: true,
                message_sid: Some(message_sid),
                error: None,
            },
            DispatchOutcome::Failed { error } => OutcomeBody {
                success: false,
                message_sid: None,
                error: Some(error),
            },
        }
    }
}
