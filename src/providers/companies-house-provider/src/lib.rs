//! Companies House registry source.
//!
//! One authenticated GET per call against the public company-information API,
//! with every outcome mapped into the closed [`FetchError`] set. No retries
//! here; the poll loop owns that policy.

use async_trait::async_trait;
use regwatch_core::models::{ApiKey, CompanyNumber, CompanySnapshot};
use regwatch_core::redact::redact_secrets;
use regwatch_core::registry::{FetchError, FetchResult, RegistrySource};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.company-information.service.gov.uk";

/// Hard bound on a single profile request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Stable source identifier, also the keyring slot for the API key.
pub const SOURCE_ID: &str = "companies-house";

#[derive(Clone)]
pub struct CompaniesHouseConfig {
    pub base_url: String,
    pub api_key: ApiKey,
    pub timeout: Duration,
}

impl CompaniesHouseConfig {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct CompaniesHouseClient {
    client: Client,
    base_url: Url,
    api_key: ApiKey,
}

impl CompaniesHouseClient {
    pub fn new(config: CompaniesHouseConfig) -> FetchResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| FetchError::Other {
            message: format!("invalid base_url: {e}"),
        })?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Other {
                message: redact_secrets(&e.to_string()).into_owned(),
            })?;
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    /// Appends `company/{number}` to the base URL, keeping any path prefix
    /// the base carries (proxy mounts and the like).
    fn profile_url(&self, company_number: &CompanyNumber) -> FetchResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Other {
                message: "base_url cannot carry a path".into(),
            })?
            .pop_if_empty()
            .extend(["company", company_number.as_str()]);
        Ok(url)
    }
}

fn connection_error(err: &reqwest::Error) -> FetchError {
    FetchError::Connection {
        message: redact_secrets(&err.to_string()).into_owned(),
    }
}

#[async_trait]
impl RegistrySource for CompaniesHouseClient {
    fn id(&self) -> &str {
        SOURCE_ID
    }

    async fn company_profile(
        &self,
        company_number: &CompanyNumber,
    ) -> FetchResult<CompanySnapshot> {
        let url = self.profile_url(company_number)?;

        // The API authenticates with the key as the basic-auth username and
        // an empty password.
        let response = self
            .client
            .get(url)
            .basic_auth(self.api_key.expose(), Some(""))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    company = %company_number,
                    error = %redact_secrets(&e.to_string()),
                    "network error fetching company profile"
                );
                connection_error(&e)
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                tracing::error!("Companies House API: unauthorized (check API key)");
                Err(FetchError::InvalidAuth)
            }
            StatusCode::NOT_FOUND => {
                tracing::error!(company = %company_number, "Companies House API: company not found");
                Err(FetchError::NotFound {
                    company_number: company_number.clone(),
                })
            }
            StatusCode::BAD_REQUEST => {
                tracing::error!(company = %company_number, "Companies House API: bad request");
                Err(FetchError::BadRequest)
            }
            status if !status.is_success() => {
                tracing::error!(
                    company = %company_number,
                    status = status.as_u16(),
                    "Companies House API: unexpected HTTP status"
                );
                Err(FetchError::Api {
                    status: status.as_u16(),
                })
            }
            _ => {
                let document: serde_json::Value = response.json().await.map_err(|e| {
                    tracing::error!(
                        company = %company_number,
                        error = %redact_secrets(&e.to_string()),
                        "failed to read company profile body"
                    );
                    FetchError::Other {
                        message: redact_secrets(&e.to_string()).into_owned(),
                    }
                })?;
                CompanySnapshot::from_value(document).ok_or_else(|| {
                    tracing::error!(company = %company_number, "profile body is not a JSON object");
                    FetchError::Other {
                        message: "profile body is not a JSON object".into(),
                    }
                })
            }
        }
    }
}
