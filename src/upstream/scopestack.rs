//! ScopeStack account upstream.
//!
//! The API speaks JSON:API; only the top-level `data` resource is used.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ScopeStackConfig;
use crate::error::GatewayResult;
use crate::upstream::client::{send_json, UpstreamClient};

pub const SERVICE: &str = "scopestack";

const JSON_API: &str = "application/vnd.api+json";

/// A JSON:API resource object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Document {
    data: Resource,
}

/// Client for the ScopeStack REST API.
#[derive(Debug, Clone)]
pub struct ScopeStackClient {
    upstream: UpstreamClient,
    config: ScopeStackConfig,
}

impl ScopeStackClient {
    pub fn new(upstream: UpstreamClient, config: ScopeStackConfig) -> Self {
        Self { upstream, config }
    }

    pub fn account_slug(&self) -> Option<&str> {
        self.config.account_slug.as_deref()
    }

    /// Fetch the account/user the configured token belongs to.
    pub async fn current_account(&self, request_id: Option<&str>) -> GatewayResult<Resource> {
        let token = self.config.api_token()?;
        let url = format!("{}/v1/me", self.config.base_url.trim_end_matches('/'));
        let deadline = self.upstream.attempt_timeout();

        let document: Document = self
            .upstream
            .call("scopestack.me", request_id, |_| {
                let request = self
                    .upstream
                    .http()
                    .get(&url)
                    .bearer_auth(token)
                    .header(reqwest::header::ACCEPT, JSON_API);
                send_json(SERVICE, request, deadline)
            })
            .await?;

        Ok(document.data)
    }
}
