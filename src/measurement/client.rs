use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use super::types::{CreatedMeasurement, Measurement, MeasurementRequest};

/// Errors returned by the measurement API
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("rate limit exceeded: {message}")]
    RateLimited { message: String },
}

/// Creates measurements
#[allow(async_fn_in_trait)]
pub trait MeasurementClient {
    async fn create(&self, request: &MeasurementRequest) -> Result<CreatedMeasurement, ClientError>;
}

/// Fetches the current state of a measurement by ID
#[allow(async_fn_in_trait)]
pub trait ResultFetcher {
    async fn fetch(&self, id: &str) -> Result<Measurement, ClientError>;
}

/// Error body returned by the API on failure
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// HTTP client for the measurement API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("globalping-cli/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Turn a non-success response into a `ClientError`
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });

        if status == StatusCode::TOO_MANY_REQUESTS {
            Err(ClientError::RateLimited { message })
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl MeasurementClient for ApiClient {
    async fn create(&self, request: &MeasurementRequest) -> Result<CreatedMeasurement, ClientError> {
        let url = format!("{}/measurements", self.base_url);
        debug!("POST {} ({} {})", url, request.kind, request.target);

        let resp = self
            .authorize(self.http.post(&url))
            .json(request)
            .send()
            .await?;
        let created: CreatedMeasurement = Self::check(resp).await?.json().await?;

        debug!("created measurement {} with {} probes", created.id, created.probes_count);
        Ok(created)
    }
}

impl ResultFetcher for ApiClient {
    async fn fetch(&self, id: &str) -> Result<Measurement, ClientError> {
        let url = format!("{}/measurements/{}", self.base_url, id);
        let resp = self.authorize(self.http.get(&url)).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}
