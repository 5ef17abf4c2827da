use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Blocking field-level failure surfaced back to the user. Everything else
/// the flow absorbs so the request always completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} validation failed for field {field}")]
pub struct ValidationFailure {
    pub field: String,
    pub kind: ValidationKind,
}

impl ValidationFailure {
    pub fn required(field: &str) -> Self {
        Self {
            field: field.to_string(),
            kind: ValidationKind::Required,
        }
    }

    pub fn postcode(field: &str) -> Self {
        Self {
            field: field.to_string(),
            kind: ValidationKind::Postcode,
        }
    }

    pub fn country(field: &str) -> Self {
        Self {
            field: field.to_string(),
            kind: ValidationKind::Country,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationKind {
    Required,
    Postcode,
    Country,
}

impl std::fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ValidationKind::Required => "required",
            ValidationKind::Postcode => "postcode",
            ValidationKind::Country => "country",
        };
        f.write_str(label)
    }
}

static POSTCODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{1,2}[0-9][0-9A-Z]?\s?[0-9][A-Z]{2}$").expect("postcode pattern compiles")
});

/// Uppercase formatter for the postcode field: trim, uppercase, collapse
/// interior whitespace runs to a single space.
pub fn format_postcode(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Required + format check for an already-formatted postcode.
pub fn validate_postcode_format(field: &str, postcode: &str) -> Result<(), ValidationFailure> {
    if postcode.is_empty() {
        return Err(ValidationFailure::required(field));
    }
    if !POSTCODE_PATTERN.is_match(postcode) {
        return Err(ValidationFailure::postcode(field));
    }
    Ok(())
}

/// Formatter for free-text address entry: trim and normalize the various
/// unicode dashes to a plain hyphen.
pub fn format_manual_address(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| match ch {
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            other => other,
        })
        .collect()
}
