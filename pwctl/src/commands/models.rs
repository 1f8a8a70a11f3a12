//! Models command implementation

use crate::output;
use promptwire_core::errors::CoreResult;
use promptwire_core::settings::Settings;

/// Handle models command
pub fn handle_models_command(settings: &Settings) -> CoreResult<()> {
    println!("{}", output::models_table(settings.api_flavor, &settings.azure_api_version));
    Ok(())
}
