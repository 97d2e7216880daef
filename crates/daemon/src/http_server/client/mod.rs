//! Minimal HTTP client for talking to a running daemon from the CLI.

mod error;

use reqwest::Client;
use serde_json::Value;
use url::Url;

pub use error::ApiError;

use super::CONNECTOR_PATH;

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    /// Run one connector command and return its JSON body.
    ///
    /// Protocol errors (an `error` key in the body) are surfaced as
    /// [`ApiError::Connector`].
    pub async fn connector(&self, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        let url = self.remote.join(CONNECTOR_PATH)?;
        let response = self.client.get(url).query(params).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(
                response.status(),
                response.text().await?,
            ));
        }

        let body: Value = response.json().await?;
        if let Some(codes) = body.get("error").and_then(Value::as_array) {
            let codes = codes
                .iter()
                .map(|code| code.as_str().unwrap_or_default().to_string())
                .collect();
            return Err(ApiError::Connector(codes));
        }

        Ok(body)
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}
