//! Scoring service reached over HTTP. Every action is a GET against a single
//! endpoint with the action selector and its parameters in the query string.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{DieFace, IdentityCode},
    error::ServiceFailure,
    protocol::{ChancesPayload, LoginPayload, ScoringRequest, ServiceEnvelope},
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::ScoringService;

#[derive(Debug, Error)]
pub enum RemoteConfigError {
    #[error("service URL is not configured")]
    MissingUrl,
    #[error("invalid service URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

pub struct RemoteScoringService {
    http: Client,
    endpoint: Url,
}

impl RemoteScoringService {
    pub fn new(endpoint: &str) -> Result<Self, RemoteConfigError> {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(http: Client, endpoint: &str) -> Result<Self, RemoteConfigError> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(RemoteConfigError::MissingUrl);
        }
        let endpoint = Url::parse(endpoint).map_err(|source| RemoteConfigError::InvalidUrl {
            url: endpoint.to_string(),
            source,
        })?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: ScoringRequest,
    ) -> Result<T, ServiceFailure> {
        let action = request.action();
        debug!(action, endpoint = %self.endpoint, "scoring service request");

        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&request.query_pairs())
            .send()
            .await
            .map_err(|err| {
                warn!(action, error = %err, "scoring service unreachable");
                ServiceFailure::Transport(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(action, %status, %body, "scoring service returned HTTP error");
            return Err(ServiceFailure::Transport(format!("HTTP error status {status}")));
        }

        let envelope: ServiceEnvelope = response.json().await.map_err(|err| {
            warn!(action, error = %err, "scoring service response is not a valid envelope");
            ServiceFailure::Transport(format!("malformed response body: {err}"))
        })?;
        debug!(action, status = ?envelope.status, "scoring service response");
        envelope.into_payload()
    }
}

#[async_trait]
impl ScoringService for RemoteScoringService {
    async fn login(&self, code: &IdentityCode) -> Result<LoginPayload, ServiceFailure> {
        self.call(ScoringRequest::Login { code: code.clone() }).await
    }

    async fn roll_dice(
        &self,
        code: &IdentityCode,
        roll_result: DieFace,
    ) -> Result<ChancesPayload, ServiceFailure> {
        self.call(ScoringRequest::RollDice {
            code: code.clone(),
            roll_result,
        })
        .await
    }

    async fn add_chance(&self, code: &IdentityCode) -> Result<ChancesPayload, ServiceFailure> {
        self.call(ScoringRequest::AddChance { code: code.clone() }).await
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
