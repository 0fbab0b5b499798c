//! Transport to the remote settings service.
//!
//! [`SettingsApi`] is the seam between the sync logic and the network.
//! [`HttpSettingsApi`] speaks the JSON-over-HTTP protocol:
//!
//! - `GET   {base}/api/accounts/{account}/settings` returns the resolved tree
//! - `PATCH {base}/api/accounts/{account}/settings` takes a sparse override
//!   and returns the resolved tree after the server-side merge

use async_trait::async_trait;
use reqwest::{Response, Url};
use serde_json::Value;

use adsight_core::ConfigTree;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Remote settings operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsApi: Send + Sync {
    /// Fetch the fully resolved tree for `account`.
    async fn fetch(&self, account: &str) -> Result<ConfigTree>;

    /// Submit a sparse override and return the resolved tree.
    async fn patch(&self, account: &str, patch: &Value) -> Result<ConfigTree>;
}

/// reqwest-backed [`SettingsApi`].
#[derive(Clone, Debug)]
pub struct HttpSettingsApi {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpSettingsApi {
    /// Build a transport from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::invalid_url(&config.base_url, e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::invalid_url(&config.base_url, "URL cannot be a base"));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url,
            http: builder.build()?,
        })
    }

    /// The endpoint for `account`, with the account id encoded as one segment.
    ///
    /// Empty, `.` and `..` ids are rejected since URL normalisation would
    /// drop them and address a different path.
    pub fn settings_url(&self, account: &str) -> Result<Url> {
        if matches!(account, "" | "." | "..") {
            return Err(Error::InvalidAccount(account.to_string()));
        }
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::invalid_url(self.base_url.as_str(), "URL cannot be a base"))?;
            segments
                .pop_if_empty()
                .extend(["api", "accounts", account, "settings"]);
        }
        Ok(url)
    }

    async fn read_tree(response: Response) -> Result<ConfigTree> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SettingsApi for HttpSettingsApi {
    async fn fetch(&self, account: &str) -> Result<ConfigTree> {
        let url = self.settings_url(account)?;
        tracing::debug!(%url, "GET settings");
        let response = self.http.get(url).send().await?;
        Self::read_tree(response).await
    }

    async fn patch(&self, account: &str, patch: &Value) -> Result<ConfigTree> {
        let url = self.settings_url(account)?;
        tracing::debug!(%url, "PATCH settings");
        let response = self.http.patch(url).json(patch).send().await?;
        Self::read_tree(response).await
    }
}
