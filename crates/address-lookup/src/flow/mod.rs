//! The address-capture sub-step state machine: which form step is shown
//! next, what is persisted in session state, and how postcode service
//! failures are classified and surfaced.

mod machine;
mod step;
mod validate;
mod view;

#[cfg(test)]
mod tests;

pub use machine::{AddressCaptureFlow, FlowAdvance};
pub use step::SubStep;
pub use validate::{format_manual_address, format_postcode, ValidationFailure, ValidationKind};
pub use view::{SelectOption, StepView, NO_SELECTION};
