//! Contract with the external postcode service: a lookup call returning
//! candidate addresses and a validate call returning country information.

mod http;

pub use http::HttpPostcodeClient;

use std::future::Future;

use serde::{Deserialize, Serialize};

/// One candidate address returned by a postcode lookup. The service sends
/// more fields than this; only the formatted address is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub formatted_address: String,
}

impl Address {
    pub fn new(formatted_address: impl Into<String>) -> Self {
        Self {
            formatted_address: formatted_address.into(),
        }
    }

    /// The formatted address is stored with line breaks; displayed as a
    /// single comma-separated line.
    pub fn single_line(&self) -> String {
        self.formatted_address.split('\n').collect::<Vec<_>>().join(", ")
    }
}

/// Country information from the validate endpoint. The country may be absent
/// when the service cannot resolve the postcode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountryLookup {
    #[serde(default)]
    pub country: Option<Country>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Country {
    pub name: String,
}

/// Failure from a postcode service call, keeping the upstream status code
/// around so callers can classify it.
#[derive(Debug, thiserror::Error)]
pub enum PostcodeApiError {
    #[error("postcode service unreachable: {0}")]
    Unreachable(String),
    #[error("postcode service responded {status}: {detail}")]
    Status { status: u16, detail: String },
}

impl PostcodeApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            PostcodeApiError::Unreachable(_) => None,
            PostcodeApiError::Status { status, .. } => Some(*status),
        }
    }

    /// 501 marks a region the lookup service has no coverage for; treated as
    /// a deliberate skip, not an error.
    pub fn is_unsupported_region(&self) -> bool {
        self.status() == Some(501)
    }

    /// 418 from the validate endpoint signals a country mismatch.
    pub fn is_country_mismatch(&self) -> bool {
        self.status() == Some(418)
    }

    /// 403/404 mean the service cannot tell us the country; validation lets
    /// the user through rather than blocking on it.
    pub fn is_unverifiable(&self) -> bool {
        matches!(self.status(), Some(403) | Some(404))
    }
}

/// Client seam for the postcode service, injected into the flow so hosts and
/// tests can substitute their own transport.
pub trait PostcodeClient: Send + Sync {
    fn lookup(
        &self,
        postcode: &str,
    ) -> impl Future<Output = Result<Vec<Address>, PostcodeApiError>> + Send;

    fn validate(
        &self,
        postcode: &str,
    ) -> impl Future<Output = Result<CountryLookup, PostcodeApiError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_joins_address_lines() {
        let address = Address::new("1 Main Street\nCroydon\nCR0 2EU");
        assert_eq!(address.single_line(), "1 Main Street, Croydon, CR0 2EU");
    }

    #[test]
    fn status_codes_classify_as_expected() {
        let unsupported = PostcodeApiError::Status {
            status: 501,
            detail: "Postcode not supported".to_string(),
        };
        assert!(unsupported.is_unsupported_region());
        assert!(!unsupported.is_unverifiable());

        let missing = PostcodeApiError::Status {
            status: 404,
            detail: "not found".to_string(),
        };
        assert!(missing.is_unverifiable());

        let transport = PostcodeApiError::Unreachable("connection refused".to_string());
        assert_eq!(transport.status(), None);
        assert!(!transport.is_country_mismatch());
    }
}
