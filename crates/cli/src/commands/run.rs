//! Run one hub operation.
//!
//! # Usage
//!
//! ```bash
//! dropship-cli run getProductQuantityById --input query.json
//! ```

use std::io::Read;
use std::path::Path;

use iqmetrix_dropship_channel::{DropshipChannel, Operation};
use serde_json::Value;

use super::{CliError, load_config};

/// Run `operation` with the JSON read from `input` and print the envelope.
///
/// # Errors
///
/// Returns `CliError::Failed` after printing a failure envelope, and other
/// variants when the operation cannot be started.
pub async fn execute(operation: &str, input: &str, profile: Option<&Path>) -> Result<(), CliError> {
    let operation: Operation = operation.parse()?;
    let input = read_input(input)?;
    let channel = DropshipChannel::new(load_config(profile)?)?;

    let envelope = channel.execute(operation, input).await;
    print_json(&serde_json::to_value(&envelope)?)?;

    if envelope.status_code.is_success() {
        Ok(())
    } else {
        Err(CliError::Failed(envelope.status_code.code()))
    }
}

fn read_input(input: &str) -> Result<Value, CliError> {
    let raw = if input == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .map_err(|source| CliError::Input {
                path: input.to_string(),
                source,
            })?;
        raw
    } else {
        std::fs::read_to_string(input).map_err(|source| CliError::Input {
            path: input.to_string(),
            source,
        })?
    };
    Ok(serde_json::from_str(&raw)?)
}

#[allow(clippy::print_stdout)]
fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
