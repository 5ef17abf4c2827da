//! Address-capture flow for multi-step form wizards: postcode lookup,
//! candidate selection, and a manual-entry fallback, backed by an external
//! postcode service and a per-submission session store.

pub mod config;
pub mod error;
pub mod flow;
pub mod postcode;
pub mod session;
pub mod telemetry;

pub use config::{AddressLookupConfig, AppConfig, FlowMessages, PostcodeApiSettings};
pub use flow::{
    AddressCaptureFlow, FlowAdvance, SelectOption, StepView, SubStep, ValidationFailure,
    ValidationKind, NO_SELECTION,
};
pub use postcode::{Address, Country, CountryLookup, HttpPostcodeClient, PostcodeApiError,
    PostcodeClient};
pub use session::{SessionKeys, SessionStore};
