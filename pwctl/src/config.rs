//! Settings loading for pwctl

use crate::cli::Cli;
use figment::{Figment, providers::{Format, Yaml, Env}};
use promptwire_core::errors::{CoreError, CoreResult};
use promptwire_core::settings::Settings;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATHS: [&str; 4] = ["pwctl.yaml", "pwctl.yml", ".pwctl.yaml", ".pwctl.yml"];

/// Load settings from config files and `PROMPTWIRE_` environment variables
pub fn load(config_path: &Option<PathBuf>) -> CoreResult<Settings> {
    let mut figment = Figment::new();

    for path in &DEFAULT_CONFIG_PATHS {
        if Path::new(path).exists() {
            figment = figment.merge(Yaml::file(path));
            break;
        }
    }

    if let Some(path) = config_path {
        if !path.exists() {
            return Err(CoreError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        figment = figment.merge(Yaml::file(path));
    }

    // PROMPTWIRE_CHAT__MODEL=gpt-4 sets chat.model
    figment = figment.merge(Env::prefixed("PROMPTWIRE_").split("__"));

    figment
        .extract()
        .map_err(|e| CoreError::Configuration(format!("Failed to parse configuration: {}", e)))
}

/// Apply CLI argument overrides
pub fn with_overrides(mut settings: Settings, args: &Cli) -> Settings {
    if let Some(ref endpoint) = args.endpoint {
        settings.endpoint = endpoint.clone();
    }

    if let Some(ref api_key) = args.api_key {
        settings.api_key = api_key.clone();
    }

    if args.internal_logs {
        settings = settings.with_internal_logs(true);
    }

    settings
}
