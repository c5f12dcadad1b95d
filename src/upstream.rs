//! FitX public API client.
//!
//! Two endpoints are used: the per-studio utilization lookup (keyed by the
//! magicline id) and the studio listing for the white label portal. Both
//! require the tenant and facility group headers.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{truncate_body, UpstreamError};
use crate::responses::{StudioResponse, UtilizationResponse};

pub const DEFAULT_BASE_URL: &str = "https://mein.fitx.de";
pub const DEFAULT_TENANT: &str = "fitx";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const TENANT_HEADER: &str = "x-tenant";
const FACILITY_GROUP_HEADER: &str = "x-public-facility-group";

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub tenant: String,
    pub facility_group: String,
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub fn new(facility_group: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            tenant: DEFAULT_TENANT.to_string(),
            facility_group: facility_group.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FitxClient {
    client: Client,
    config: UpstreamConfig,
}

impl FitxClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(UpstreamError::Client)?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    pub fn utilization_url(&self, magicline_id: u64) -> String {
        self.url(&format!(
            "/nox/public/v1/studios/{}/utilization",
            magicline_id
        ))
    }

    pub fn studios_url(&self) -> String {
        self.url("/sponsorship/v1/public/studios/forwhitelabelportal")
    }

    /// Raw utilization for a studio, as returned by upstream (not enriched).
    pub async fn fetch_utilization(
        &self,
        magicline_id: u64,
    ) -> Result<UtilizationResponse, UpstreamError> {
        let url = self.utilization_url(magicline_id);
        self.get_json(url).await
    }

    /// The complete studio directory.
    pub async fn fetch_studios(&self) -> Result<StudioResponse, UpstreamError> {
        let url = self.studios_url();
        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, UpstreamError> {
        debug!(%url, "querying upstream");

        let resp = self
            .client
            .get(&url)
            .header(TENANT_HEADER, &self.config.tenant)
            .header(FACILITY_GROUP_HEADER, &self.config.facility_group)
            .send()
            .await;
        let resp = match resp {
            Ok(resp) => resp,
            Err(source) => return Err(UpstreamError::Transport { url, source }),
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(source) => return Err(UpstreamError::Transport { url, source }),
        };

        if !status.is_success() {
            return Err(UpstreamError::Status {
                url,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| UpstreamError::Decode {
            body: truncate_body(&body),
            url,
            source,
        })
    }
}
