//! Session abstraction: a key/value mapping scoped to one in-progress
//! wizard submission, surviving across requests within a single run.

use serde_json::Value;

/// Storage seam the host framework provides; the flow only ever reads and
/// writes string-keyed JSON values through it.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn unset(&self, keys: &[&str]);
}

/// The session keys one flow instance owns, namespaced by its address key so
/// several address-capture flows can share a wizard session.
#[derive(Debug, Clone)]
pub struct SessionKeys {
    address: String,
    postcode: String,
    addresses: String,
    api_meta: String,
    select: String,
    errors: String,
}

impl SessionKeys {
    pub fn new(address_key: &str) -> Self {
        Self {
            address: address_key.to_string(),
            postcode: format!("{address_key}-postcode"),
            addresses: format!("{address_key}-addresses"),
            api_meta: format!("{address_key}-postcodeApiMeta"),
            select: format!("{address_key}-select"),
            errors: format!("{address_key}-errors"),
        }
    }

    /// Final stored address (free text or the normalized selection).
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn postcode(&self) -> &str {
        &self.postcode
    }

    /// Candidate addresses from the last successful lookup.
    pub fn addresses(&self) -> &str {
        &self.addresses
    }

    /// Lookup outcome metadata (`messageKey` of `not-found`/`cant-connect`).
    pub fn api_meta(&self) -> &str {
        &self.api_meta
    }

    pub fn select(&self) -> &str {
        &self.select
    }

    /// Flash slot holding a validation failure across the redirect back to
    /// the offending sub-step.
    pub fn errors(&self) -> &str {
        &self.errors
    }
}
