use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use crate::config::AddressLookupConfig;
use crate::flow::AddressCaptureFlow;
use crate::postcode::{Address, Country, CountryLookup, PostcodeApiError, PostcodeClient};
use crate::session::SessionStore;

#[derive(Default)]
pub(super) struct MemorySession {
    values: Mutex<HashMap<String, Value>>,
}

impl MemorySession {
    pub(super) fn contains(&self, key: &str) -> bool {
        self.values
            .lock()
            .expect("session mutex poisoned")
            .contains_key(key)
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .expect("session mutex poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values
            .lock()
            .expect("session mutex poisoned")
            .insert(key.to_string(), value);
    }

    fn unset(&self, keys: &[&str]) {
        let mut guard = self.values.lock().expect("session mutex poisoned");
        for key in keys {
            guard.remove(*key);
        }
    }
}

pub(super) enum LookupBehavior {
    Addresses(Vec<Address>),
    Empty,
    Fail(u16),
    Unreachable,
}

pub(super) enum ValidateBehavior {
    Country(&'static str),
    NoCountry,
    Fail(u16),
    Unreachable,
}

pub(super) struct StubPostcodeClient {
    lookup: LookupBehavior,
    validate: ValidateBehavior,
    lookup_calls: AtomicUsize,
    validate_calls: AtomicUsize,
}

impl StubPostcodeClient {
    pub(super) fn new(lookup: LookupBehavior, validate: ValidateBehavior) -> Self {
        Self {
            lookup,
            validate,
            lookup_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn with_addresses(addresses: Vec<Address>) -> Self {
        Self::new(
            LookupBehavior::Addresses(addresses),
            ValidateBehavior::NoCountry,
        )
    }

    pub(super) fn empty() -> Self {
        Self::new(LookupBehavior::Empty, ValidateBehavior::NoCountry)
    }

    pub(super) fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub(super) fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }
}

impl PostcodeClient for StubPostcodeClient {
    async fn lookup(&self, _postcode: &str) -> Result<Vec<Address>, PostcodeApiError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        match &self.lookup {
            LookupBehavior::Addresses(addresses) => Ok(addresses.clone()),
            LookupBehavior::Empty => Ok(Vec::new()),
            LookupBehavior::Fail(status) => Err(PostcodeApiError::Status {
                status: *status,
                detail: "stubbed failure".to_string(),
            }),
            LookupBehavior::Unreachable => {
                Err(PostcodeApiError::Unreachable("connection refused".to_string()))
            }
        }
    }

    async fn validate(&self, _postcode: &str) -> Result<CountryLookup, PostcodeApiError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        match &self.validate {
            ValidateBehavior::Country(name) => Ok(CountryLookup {
                country: Some(Country {
                    name: name.to_string(),
                }),
            }),
            ValidateBehavior::NoCountry => Ok(CountryLookup::default()),
            ValidateBehavior::Fail(status) => Err(PostcodeApiError::Status {
                status: *status,
                detail: "stubbed failure".to_string(),
            }),
            ValidateBehavior::Unreachable => {
                Err(PostcodeApiError::Unreachable("connection refused".to_string()))
            }
        }
    }
}

pub(super) fn candidates() -> Vec<Address> {
    vec![
        Address::new("1 Main Street\nCroydon\nCR0 2EU"),
        Address::new("2 Main Street\nCroydon\nCR0 2EU"),
    ]
}

pub(super) fn flow(client: StubPostcodeClient) -> AddressCaptureFlow<StubPostcodeClient> {
    let config = AddressLookupConfig::new("address-one").expect("valid address key");
    AddressCaptureFlow::new(config, client)
}

pub(super) fn restricted_flow(
    client: StubPostcodeClient,
    countries: &[&str],
) -> AddressCaptureFlow<StubPostcodeClient> {
    let config = AddressLookupConfig::new("address-one")
        .expect("valid address key")
        .with_allowed_countries(countries.iter().copied());
    AddressCaptureFlow::new(config, client)
}
