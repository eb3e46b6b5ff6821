//! HTTP client for the identity lookup service.
//!
//! `GET {base}/participants/{id}` returning `{"display_name": ..,
//! "role": ..}`. Failures map to `IdentityError` and the caller degrades
//! to a placeholder identity; a slow or down identity service must never
//! stall joins for long, hence the short request timeout.

use crate::observability::metrics as prom;
use async_trait::async_trait;
use common::identity::{IdentityError, IdentityLookup};
use common::types::{Identity, ParticipantId};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Request timeout for identity lookups.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Identity service client.
#[derive(Debug, Clone)]
pub struct HttpIdentityService {
    client: reqwest::Client,
    base_url: String,
}

/// Wire shape of the identity service response.
#[derive(Debug, Deserialize)]
struct IdentityResponse {
    display_name: String,
    #[serde(default = "default_role")]
    role: String,
}

fn default_role() -> String {
    "member".to_string()
}

impl HttpIdentityService {
    /// Create a client against the given base URL.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl IdentityLookup for HttpIdentityService {
    #[instrument(skip_all, name = "parley.identity.lookup", fields(participant_id = %participant_id))]
    async fn resolve_identity(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<Identity, IdentityError> {
        let start = Instant::now();
        let url = format!("{}/participants/{}", self.base_url, participant_id);

        let response = self.client.get(&url).send().await.map_err(|e| {
            prom::record_identity_lookup("unavailable", start.elapsed());
            IdentityError::Unavailable(e.to_string())
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            prom::record_identity_lookup("unknown", start.elapsed());
            debug!(target: "parley.identity", "participant unknown to identity service");
            return Err(IdentityError::Unknown);
        }

        let response = response.error_for_status().map_err(|e| {
            prom::record_identity_lookup("unavailable", start.elapsed());
            IdentityError::Unavailable(e.to_string())
        })?;

        let body: IdentityResponse = response.json().await.map_err(|e| {
            prom::record_identity_lookup("unavailable", start.elapsed());
            IdentityError::Unavailable(e.to_string())
        })?;

        prom::record_identity_lookup("success", start.elapsed());
        Ok(Identity {
            participant_id: participant_id.clone(),
            display_name: body.display_name,
            role: body.role,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let service = HttpIdentityService::new("http://identity:8090/");
        assert_eq!(service.base_url, "http://identity:8090");
    }

    #[test]
    fn response_defaults_role_to_member() {
        let body: IdentityResponse =
            serde_json::from_str(r#"{"display_name": "Alice"}"#).unwrap();
        assert_eq!(body.role, "member");
    }
}
