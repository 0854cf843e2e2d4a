use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    domain::{DieFace, IdentityCode},
    error::ServiceFailure,
};

/// A call against the scoring service: an `action` selector plus flat
/// string parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoringRequest {
    Login {
        code: IdentityCode,
    },
    RollDice {
        code: IdentityCode,
        roll_result: DieFace,
    },
    AddChance {
        code: IdentityCode,
    },
}

impl ScoringRequest {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::RollDice { .. } => "rollDice",
            Self::AddChance { .. } => "addChance",
        }
    }

    pub fn code(&self) -> &IdentityCode {
        match self {
            Self::Login { code } | Self::RollDice { code, .. } | Self::AddChance { code } => code,
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("action", self.action().to_string()),
            ("code", self.code().as_str().to_string()),
        ];
        if let Self::RollDice { roll_result, .. } = self {
            pairs.push(("rollResult", roll_result.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Response body returned by the scoring service for every action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEnvelope {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceEnvelope {
    pub fn success<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            status: ResponseStatus::Success,
            data: Some(serde_json::to_value(data)?),
            message: None,
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Splits the envelope into the typed payload or a failure. An error
    /// status without a message carries nothing to show the player and is
    /// reported as malformed.
    pub fn into_payload<T: DeserializeOwned>(self) -> Result<T, ServiceFailure> {
        match self.status {
            ResponseStatus::Success => {
                let data = self.data.ok_or_else(|| {
                    ServiceFailure::Transport("success response without data".into())
                })?;
                serde_json::from_value(data).map_err(|err| {
                    ServiceFailure::Transport(format!("malformed response data: {err}"))
                })
            }
            ResponseStatus::Error => match self.message {
                Some(message) => Err(ServiceFailure::Rejected(message)),
                None => Err(ServiceFailure::Transport(
                    "error response without message".into(),
                )),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPayload {
    pub name: String,
    pub chances: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChancesPayload {
    pub chances: u32,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
