use std::time::Duration;

use crate::plugin::error::{InstallError, InstallResult};

/// Blocking downloader for archives and the version marker.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::blocking::Client,
}

impl Fetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> InstallResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|err| InstallError::Network(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }

    pub fn fetch_bytes(&self, url: &str) -> InstallResult<Vec<u8>> {
        if let Some(path) = url.strip_prefix("file://") {
            return std::fs::read(path)
                .map_err(|err| InstallError::Network(format!("failed to read {url}: {err}")));
        }

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| InstallError::Network(format!("failed to fetch {url}: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::Network(format!(
                "failed to fetch {url}: status {status}"
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|err| InstallError::Network(format!("failed to read body of {url}: {err}")))?;
        tracing::debug!("fetched {} bytes from {url}", bytes.len());
        Ok(bytes.to_vec())
    }

    pub fn fetch_text(&self, url: &str) -> InstallResult<String> {
        let bytes = self.fetch_bytes(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
