use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use address_lookup::{
    Address, Country, CountryLookup, PostcodeApiError, PostcodeClient, SessionStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// One wizard run's session state, owned exclusively by its session id.
#[derive(Default)]
pub(crate) struct InMemorySessionStore {
    values: Mutex<HashMap<String, Value>>,
}

impl SessionStore for InMemorySessionStore {
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

/// Registry of in-flight wizard sessions. An entry is created for any
/// requested session id and lives for the process lifetime, so the map
/// grows without bound under arbitrary ids; a real host would back this
/// with its own session layer and expire entries there.
#[derive(Default, Clone)]
pub(crate) struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, Arc<InMemorySessionStore>>>>,
}

impl SessionRegistry {
    /// Fetch the store for a session id, creating it on first touch.
    pub(crate) fn store(&self, session_id: &str) -> Arc<InMemorySessionStore> {
        let mut guard = self
            .sessions
            .lock()
            .expect("session registry mutex poisoned");
        guard.entry(session_id.to_string()).or_default().clone()
    }
}

/// Deterministic stand-in for the postcode service, used by the CLI demo and
/// the router tests. CR0 2EU resolves to two candidates, BN25 1XY to none,
/// and anything else is unreachable; CH-prefixed postcodes sit in Wales.
pub(crate) struct CannedPostcodeClient;

impl PostcodeClient for CannedPostcodeClient {
    async fn lookup(&self, postcode: &str) -> Result<Vec<Address>, PostcodeApiError> {
        match postcode {
            "CR0 2EU" => Ok(vec![
                Address::new("1 Main Street\nCroydon\nCR0 2EU"),
                Address::new("2 Main Street\nCroydon\nCR0 2EU"),
            ]),
            "BN25 1XY" => Ok(Vec::new()),
            _ => Err(PostcodeApiError::Unreachable(
                "canned service only knows CR0 2EU and BN25 1XY".to_string(),
            )),
        }
    }

    async fn validate(&self, postcode: &str) -> Result<CountryLookup, PostcodeApiError> {
        let name = if postcode.starts_with("CH") {
            "Wales"
        } else {
            "England"
        };
        Ok(CountryLookup {
            country: Some(Country {
                name: name.to_string(),
            }),
        })
    }
}
