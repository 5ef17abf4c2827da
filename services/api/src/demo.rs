use crate::infra::{CannedPostcodeClient, InMemorySessionStore};
use address_lookup::error::AppError;
use address_lookup::{AddressCaptureFlow, AddressLookupConfig, SubStep, NO_SELECTION};
use clap::Args;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Postcode to submit (the canned service resolves CR0 2EU and returns
    /// nothing for BN25 1XY)
    #[arg(long, default_value = "CR0 2EU")]
    pub(crate) postcode: String,
    /// Skip candidate selection and enter the address manually
    #[arg(long)]
    pub(crate) manual: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { postcode, manual } = args;

    let config = AddressLookupConfig::new("address-one")
        .map_err(AppError::from)?
        .with_allowed_countries(["England"]);
    let flow = AddressCaptureFlow::new(config, CannedPostcodeClient);
    let session = InMemorySessionStore::default();

    println!("Address capture demo");
    println!("Submitting postcode {postcode:?}");

    let next = match flow.submit_postcode(&session, &postcode).await {
        Ok(next) => next,
        Err(failure) => {
            println!("  Blocked by field validation: {failure}");
            return Ok(());
        }
    };
    println!("  Next sub-step: {next}");

    let view = flow.step_view(&session, next);
    if let Some(message) = &view.postcode_error {
        println!("  Lookup message: {message}");
    }

    match next {
        SubStep::Lookup if !manual => {
            println!("  Candidates:");
            for option in view.options.iter().filter(|o| o.value != NO_SELECTION) {
                println!("    - {}", option.label);
            }
            let choice = view
                .options
                .iter()
                .find(|option| option.value != NO_SELECTION)
                .map(|option| option.value.clone());
            if let Some(choice) = choice {
                println!("  Selecting {choice:?}");
                match flow.select_address(&session, &choice) {
                    Ok(address) => println!("  Stored address:\n{}", indent(&address)),
                    Err(failure) => println!("  Selection rejected: {failure}"),
                }
            }
        }
        _ => {
            let entered = "4 High Street\nCroydon";
            println!("  Entering address manually");
            flow.enter_step(&session, SubStep::Manual);
            match flow.submit_manual(&session, entered) {
                Ok(address) => println!("  Stored address:\n{}", indent(&address)),
                Err(failure) => println!("  Manual entry rejected: {failure}"),
            }
        }
    }

    match flow.final_address(&session) {
        Some(address) => println!("Sub-flow complete, final address captured ({} lines)", address.lines().count()),
        None => println!("Sub-flow incomplete, no final address yet"),
    }

    Ok(())
}

fn indent(address: &str) -> String {
    address
        .lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
