//! HTTP client for downloading the registry archive.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::HTTP_TIMEOUT_SECS;
use crate::error::{ImporterError, Result};

/// User agent string identifying this importer.
const USER_AGENT: &str = concat!("feldplan-importer/", env!("CARGO_PKG_VERSION"));

/// Create a configured HTTP client.
pub fn create_client() -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Download the full response body from a URL.
///
/// A single attempt only: a failed import is re-triggered externally, so
/// there is no retry loop here. Non-success statuses are an error.
pub fn download_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send()?;
    let status = response.status();

    if !status.is_success() {
        return Err(ImporterError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let bytes = response.bytes()?;
    Ok(bytes.to_vec())
}
