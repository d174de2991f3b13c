use crate::models::{CompanyNumber, CompanySnapshot};
use async_trait::async_trait;
use thiserror::Error;

/// Closed set of fetch failure classifications.
///
/// The poller's policy (fatal vs stale-and-retry) keys off these variants, so
/// sources must map every transport and HTTP outcome into one of them rather
/// than leaking their own error types.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid API key")]
    InvalidAuth,
    #[error("company {company_number} not found")]
    NotFound { company_number: CompanyNumber },
    #[error("registry rejected the request")]
    BadRequest,
    #[error("registry returned HTTP {status}")]
    Api { status: u16 },
    #[error("network error: {message}")]
    Connection { message: String },
    #[error("{message}")]
    Other { message: String },
}

impl FetchError {
    /// True for failures that indicate bad or expired credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, FetchError::InvalidAuth)
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// A remote registry that can serve company-profile documents.
///
/// Implementations issue exactly one request per call and never retry; retry
/// policy belongs to the poll loop driving them.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Stable source identifier (e.g. "companies-house").
    fn id(&self) -> &str;

    /// Fetches the current profile document for `company_number`.
    async fn company_profile(&self, company_number: &CompanyNumber)
        -> FetchResult<CompanySnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_auth_is_an_auth_failure() {
        assert!(FetchError::InvalidAuth.is_auth());
        assert!(!FetchError::BadRequest.is_auth());
        assert!(!FetchError::Api { status: 503 }.is_auth());
    }

    #[test]
    fn not_found_names_the_company() {
        let err = FetchError::NotFound {
            company_number: CompanyNumber::new("ab123"),
        };
        assert!(err.to_string().contains("AB123"));
    }
}
