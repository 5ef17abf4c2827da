use serde::{Deserialize, Serialize};

use super::step::SubStep;
use super::validate::ValidationFailure;

/// Sentinel value for the "no selection made" entry at the head of the
/// lookup select.
pub const NO_SELECTION: &str = "-1";

/// One entry in the lookup select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Render model for one sub-step, handed to the host wizard. Templating and
/// translation stay on the host side; this carries the resolved strings.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub step: SubStep,
    pub template: &'static str,
    pub fields: Vec<String>,
    pub postcode_label: String,
    pub change_link: String,
    pub cant_find_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    /// Informational lookup outcome (`not-found`/`cant-connect`) resolved to
    /// its display string; never blocks progression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode_error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub options: Vec<SelectOption>,
    /// Field validation failure carried across the redirect back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationFailure>,
}
