use serde::{Deserialize, Serialize};

use crate::session::SessionKeys;

/// One screen within the address-capture portion of the wizard, selected by
/// the inbound `step` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubStep {
    Postcode,
    Lookup,
    Address,
    Manual,
}

impl SubStep {
    /// Parse the `step` query parameter. An absent parameter means the entry
    /// point of the sub-flow; an unrecognized value is rejected.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            None | Some("") => Some(Self::Postcode),
            Some("postcode") => Some(Self::Postcode),
            Some("lookup") => Some(Self::Lookup),
            Some("address") => Some(Self::Address),
            Some("manual") => Some(Self::Manual),
            Some(_) => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postcode => "postcode",
            Self::Lookup => "lookup",
            Self::Address => "address",
            Self::Manual => "manual",
        }
    }

    /// Host-framework template rendered for this sub-step.
    pub const fn template(self) -> &'static str {
        match self {
            Self::Postcode => "postcode",
            Self::Lookup => "address-lookup",
            Self::Address | Self::Manual => "address",
        }
    }

    /// The session-keyed fields active on this sub-step.
    pub fn fields(self, keys: &SessionKeys) -> Vec<String> {
        match self {
            Self::Postcode => vec![keys.postcode().to_string()],
            Self::Lookup => vec![keys.select().to_string()],
            Self::Address | Self::Manual => vec![keys.address().to_string()],
        }
    }
}

impl std::fmt::Display for SubStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
