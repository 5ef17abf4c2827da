use serde_json::{json, Value};
use tracing::warn;

use super::step::SubStep;
use super::validate::{
    format_manual_address, format_postcode, validate_postcode_format, ValidationFailure,
};
use super::view::{SelectOption, StepView, NO_SELECTION};
use crate::config::{AddressLookupConfig, FlowMessages};
use crate::postcode::{Address, PostcodeClient};
use crate::session::{SessionKeys, SessionStore};

/// Where the wizard goes after a sub-step completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowAdvance {
    /// Stay inside the sub-flow and show the given sub-step next.
    Step(SubStep),
    /// A final address exists; the host wizard moves to its own next step.
    Complete,
}

/// The address-capture state machine. The host wizard invokes it at its
/// extension points (render, submit, advance) through an explicit interface
/// rather than by subclassing; the postcode service and the session store
/// are both injected.
pub struct AddressCaptureFlow<C> {
    keys: SessionKeys,
    messages: FlowMessages,
    allowed_countries: Vec<String>,
    unsupported_prefixes: Vec<String>,
    client: C,
}

impl<C> AddressCaptureFlow<C>
where
    C: PostcodeClient,
{
    pub fn new(config: AddressLookupConfig, client: C) -> Self {
        let AddressLookupConfig {
            address_key,
            allowed_countries,
            unsupported_prefixes,
            messages,
        } = config;

        Self {
            keys: SessionKeys::new(&address_key),
            messages,
            allowed_countries,
            unsupported_prefixes,
            client,
        }
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Postcode sub-step submission: format and validate the postcode, run
    /// the country check when configured, then look it up. Lookup failures
    /// are absorbed so the user can always fall back to manual entry; only
    /// field validation blocks.
    pub async fn submit_postcode<S>(
        &self,
        session: &S,
        raw: &str,
    ) -> Result<SubStep, ValidationFailure>
    where
        S: SessionStore,
    {
        let postcode = format_postcode(raw);
        validate_postcode_format(self.keys.postcode(), &postcode)?;
        self.check_country(&postcode).await?;

        // Unchanged postcode with candidates already in hand is a no-op; a
        // prior failure or empty result retries instead.
        let previous = read_string(session, self.keys.postcode());
        let has_candidates = session.get(self.keys.addresses()).is_some();
        if previous.as_deref() == Some(postcode.as_str()) && has_candidates {
            return Ok(self.next_from_postcode(session));
        }

        if self.is_unsupported_region(&postcode) {
            // No coverage for this region: skip the lookup and clear any
            // stale outcome so the address sub-step renders without an error.
            session.unset(&[self.keys.addresses(), self.keys.api_meta()]);
        } else {
            self.run_lookup(session, &postcode).await;
        }

        session.set(self.keys.postcode(), Value::String(postcode));
        Ok(self.next_from_postcode(session))
    }

    /// Lookup sub-step submission: reject the sentinel, otherwise store the
    /// selected address with its line breaks restored.
    pub fn select_address<S>(&self, session: &S, selection: &str) -> Result<String, ValidationFailure>
    where
        S: SessionStore,
    {
        if selection.is_empty() || selection == NO_SELECTION {
            return Err(ValidationFailure::required(self.keys.select()));
        }

        let address = selection.split(", ").collect::<Vec<_>>().join("\n");
        session.set(self.keys.select(), Value::String(selection.to_string()));
        session.set(self.keys.address(), Value::String(address.clone()));
        Ok(address)
    }

    /// Address/manual sub-step submission: free text, stored verbatim after
    /// formatting.
    pub fn submit_manual<S>(&self, session: &S, raw: &str) -> Result<String, ValidationFailure>
    where
        S: SessionStore,
    {
        let text = format_manual_address(raw);
        if text.is_empty() {
            return Err(ValidationFailure::required(self.keys.address()));
        }

        session.set(self.keys.address(), Value::String(text.clone()));
        Ok(text)
    }

    /// Next-step computation. Only the postcode sub-step branches inside the
    /// sub-flow; every other sub-step hands control back to the host wizard.
    pub fn advance_from<S>(&self, session: &S, current: SubStep) -> FlowAdvance
    where
        S: SessionStore,
    {
        match current {
            SubStep::Postcode => FlowAdvance::Step(self.next_from_postcode(session)),
            SubStep::Lookup | SubStep::Address | SubStep::Manual => FlowAdvance::Complete,
        }
    }

    /// Rendering-time hook. Entering the manual step drops the stored
    /// postcode and any lookup outcome so the form starts clean.
    pub fn enter_step<S>(&self, session: &S, step: SubStep)
    where
        S: SessionStore,
    {
        if step == SubStep::Manual {
            session.unset(&[self.keys.postcode(), self.keys.api_meta()]);
        }
    }

    /// Select options for the lookup sub-step: a count sentinel followed by
    /// one single-line entry per candidate.
    pub fn lookup_choices<S>(&self, session: &S) -> Vec<SelectOption>
    where
        S: SessionStore,
    {
        let addresses = self.read_addresses(session);
        let mut options = Vec::with_capacity(addresses.len() + 1);
        let count = addresses.len();
        options.push(SelectOption {
            value: NO_SELECTION.to_string(),
            label: format!("{count} address{}", if count > 1 { "es" } else { "" }),
        });

        for address in addresses {
            let line = address.single_line();
            options.push(SelectOption {
                value: line.clone(),
                label: line,
            });
        }

        options
    }

    /// Render model for a sub-step, including any lookup outcome message and
    /// a flash validation failure from the redirect back.
    pub fn step_view<S>(&self, session: &S, step: SubStep) -> StepView
    where
        S: SessionStore,
    {
        self.enter_step(session, step);

        let postcode_error = if step == SubStep::Manual {
            None
        } else {
            self.read_message_key(session).map(|key| match key.as_str() {
                "cant-connect" => self.messages.cant_connect.clone(),
                _ => self.messages.not_found.clone(),
            })
        };

        let options = if step == SubStep::Lookup {
            self.lookup_choices(session)
        } else {
            Vec::new()
        };

        StepView {
            step,
            template: step.template(),
            fields: step.fields(&self.keys),
            postcode_label: self.messages.postcode_label.clone(),
            change_link: self.messages.change_link.clone(),
            cant_find_link: self.messages.cant_find_link.clone(),
            postcode: read_string(session, self.keys.postcode()),
            postcode_error,
            options,
            validation: self.take_failure(session),
        }
    }

    /// The final address once one exists, for the host's summary step.
    pub fn final_address<S>(&self, session: &S) -> Option<String>
    where
        S: SessionStore,
    {
        read_string(session, self.keys.address())
    }

    /// Stash a field validation failure so it survives the redirect back to
    /// the offending sub-step.
    pub fn stash_failure<S>(&self, session: &S, failure: &ValidationFailure)
    where
        S: SessionStore,
    {
        if let Ok(value) = serde_json::to_value(failure) {
            session.set(self.keys.errors(), value);
        }
    }

    fn take_failure<S>(&self, session: &S) -> Option<ValidationFailure>
    where
        S: SessionStore,
    {
        let value = session.get(self.keys.errors())?;
        session.unset(&[self.keys.errors()]);
        serde_json::from_value(value).ok()
    }

    fn next_from_postcode<S>(&self, session: &S) -> SubStep
    where
        S: SessionStore,
    {
        if session.get(self.keys.addresses()).is_some() {
            SubStep::Lookup
        } else {
            SubStep::Address
        }
    }

    fn is_unsupported_region(&self, postcode: &str) -> bool {
        self.unsupported_prefixes
            .iter()
            .any(|prefix| postcode.starts_with(prefix.as_str()))
    }

    /// Run the lookup and classify its outcome. Exactly one of {candidates,
    /// message key, neither} is set in the session afterwards.
    async fn run_lookup<S>(&self, session: &S, postcode: &str)
    where
        S: SessionStore,
    {
        match self.client.lookup(postcode).await {
            Ok(addresses) if !addresses.is_empty() => {
                match serde_json::to_value(&addresses) {
                    Ok(value) => {
                        session.set(self.keys.addresses(), value);
                        session.unset(&[self.keys.api_meta()]);
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to serialize lookup results");
                        self.record_lookup_failure(session, "cant-connect");
                    }
                }
            }
            Ok(_) => {
                self.record_lookup_failure(session, "not-found");
            }
            Err(err) if err.is_unsupported_region() => {
                session.unset(&[self.keys.addresses(), self.keys.api_meta()]);
            }
            Err(err) => {
                warn!(error = %err, "postcode lookup failed");
                self.record_lookup_failure(session, "cant-connect");
            }
        }
    }

    fn record_lookup_failure<S>(&self, session: &S, message_key: &str)
    where
        S: SessionStore,
    {
        session.unset(&[self.keys.addresses()]);
        session.set(self.keys.api_meta(), json!({ "messageKey": message_key }));
    }

    /// Country restriction check. Only field-level mismatches block; a
    /// service that cannot answer degrades to "allow".
    async fn check_country(&self, postcode: &str) -> Result<(), ValidationFailure> {
        if self.allowed_countries.is_empty() {
            return Ok(());
        }

        match self.client.validate(postcode).await {
            Ok(lookup) => {
                if let Some(country) = lookup.country {
                    let allowed = self
                        .allowed_countries
                        .iter()
                        .any(|candidate| candidate.eq_ignore_ascii_case(&country.name));
                    if !allowed {
                        return Err(ValidationFailure::country(self.keys.postcode()));
                    }
                }
                Ok(())
            }
            Err(err) if err.is_country_mismatch() => {
                Err(ValidationFailure::country(self.keys.postcode()))
            }
            Err(err) if err.is_unverifiable() => Ok(()),
            Err(err) => {
                warn!(error = %err, "postcode validation unavailable, allowing through");
                Ok(())
            }
        }
    }

    fn read_addresses<S>(&self, session: &S) -> Vec<Address>
    where
        S: SessionStore,
    {
        session
            .get(self.keys.addresses())
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    fn read_message_key<S>(&self, session: &S) -> Option<String>
    where
        S: SessionStore,
    {
        let meta = session.get(self.keys.api_meta())?;
        meta.get("messageKey")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

fn read_string<S>(session: &S, key: &str) -> Option<String>
where
    S: SessionStore,
{
    session
        .get(key)
        .and_then(|value| value.as_str().map(str::to_string))
}
