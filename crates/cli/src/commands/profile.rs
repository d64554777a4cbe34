//! Channel profile validation.

use std::path::Path;

use iqmetrix_dropship_channel::Service;

use super::{CliError, load_config};

/// Validate the profile and log a summary of what it configures.
///
/// # Errors
///
/// Returns `CliError::Config` with every validation failure.
pub fn validate(profile: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(profile)?;

    tracing::info!(
        company_id = %config.company_id,
        location_id = %config.location_id,
        environment = %config.environment,
        subscription_lists = config.subscription_lists.len(),
        "Channel profile is valid"
    );
    for service in Service::ALL {
        tracing::info!("{service}: {}", config.base_url(service.name())?);
    }
    if !config.business_references.is_configured() {
        tracing::warn!("Business references are not configured; payment capture operations will fail.");
    }
    Ok(())
}
