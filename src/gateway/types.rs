use serde::{Deserialize, Serialize};

use super::service::Admission;

/// How an admission attempt concluded, as reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdmissionStatus {
    NewToken,
    Existing,
    AgentBypass,
}

/// Response payload for the admission endpoint
///
/// `token` is present only for new admissions; the caller stores it and
/// re-presents it as a bearer credential on later requests to the room.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdmitResponse {
    pub status: AdmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl From<Admission> for AdmitResponse {
    fn from(admission: Admission) -> Self {
        match admission {
            Admission::NewToken(token) => Self {
                status: AdmissionStatus::NewToken,
                token: Some(token),
            },
            Admission::Existing => Self {
                status: AdmissionStatus::Existing,
                token: None,
            },
            Admission::AgentBypass => Self {
                status: AdmissionStatus::AgentBypass,
                token: None,
            },
        }
    }
}
