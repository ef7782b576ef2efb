//! HTTP transport for the THREDDS data server

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use cdip_common::{CDIP_DOMAIN, THREDDS_DOMAIN};
use cdip_dap::{parse_dods, ConstraintExpr, Das, Dds, DodsResponse};

use crate::error::{ClientError, Result};

/// Connection settings for [`DodsClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// THREDDS server base, e.g. `http://thredds.cdip.ucsd.edu`
    pub thredds_domain: String,
    /// CDIP web server base, used for the WMO-id and file-hash tables
    pub cdip_domain: String,
    pub connect_timeout: Duration,
    /// Idle time allowed between reads of a response body. Whole-request
    /// timeouts would cut off large displacement fetches.
    pub read_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            thredds_domain: THREDDS_DOMAIN.to_string(),
            cdip_domain: CDIP_DOMAIN.to_string(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            user_agent: format!("cdip-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn with_thredds_domain(mut self, domain: impl Into<String>) -> Self {
        self.thredds_domain = domain.into();
        self
    }

    pub fn with_cdip_domain(mut self, domain: impl Into<String>) -> Self {
        self.cdip_domain = domain.into();
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// Shared HTTP client for DAP and plain-text requests.
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct DodsClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl DodsClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Url::parse(&config.thredds_domain)?;
        Url::parse(&config.cdip_domain)?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn thredds_domain(&self) -> &str {
        &self.config.thredds_domain
    }

    pub fn cdip_domain(&self) -> &str {
        &self.config.cdip_domain
    }

    async fn get_once(&self, url: &str) -> Result<reqwest::Response> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }

    /// GET with one retry; the server occasionally fails a request while a
    /// file is being rewritten. A 404 is never retried.
    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        debug!(%url, "GET");
        match self.get_once(url).await {
            Err(err) if !matches!(err, ClientError::NotFound(_)) => {
                debug!(%url, %err, "retrying request");
                self.get_once(url).await
            }
            other => other,
        }
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        Ok(self.get(url).await?.text().await?)
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        Ok(self.get(url).await?.bytes().await?.to_vec())
    }

    /// True when the url answers a HEAD request with a success status
    pub async fn exists(&self, url: &str) -> bool {
        matches!(
            self.http.head(url).send().await,
            Ok(resp) if resp.status().is_success()
        )
    }

    pub async fn fetch_dds(&self, dataset_url: &str) -> Result<Dds> {
        let text = self.get_text(&format!("{dataset_url}.dds")).await?;
        Ok(Dds::parse(&text)?)
    }

    pub async fn fetch_das(&self, dataset_url: &str) -> Result<Das> {
        let text = self.get_text(&format!("{dataset_url}.das")).await?;
        Ok(Das::parse(&text)?)
    }

    pub async fn fetch_dods(
        &self,
        dataset_url: &str,
        ce: &ConstraintExpr,
    ) -> Result<DodsResponse> {
        let body = self.get_bytes(&dods_url(dataset_url, ce)).await?;
        Ok(parse_dods(&body)?)
    }
}

fn dods_url(dataset_url: &str, ce: &ConstraintExpr) -> String {
    if ce.is_empty() {
        format!("{dataset_url}.dods")
    } else {
        format!("{dataset_url}.dods?{ce}")
    }
}
