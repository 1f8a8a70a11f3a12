//! Command-line host for PromptWire

use clap::Parser;
use std::process;
use tracing::{error, info, Level};

mod cli;
mod commands;
mod config;
mod output;

use cli::*;
use commands::chat::ChatArgs;
use commands::image::ImageArgs;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // Initialize logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let settings = match config::load(&args.config) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let settings = config::with_overrides(settings, &args);

    info!("Starting pwctl with endpoint: {}", settings.endpoint);

    let result = match args.command {
        Commands::Chat {
            message,
            model,
            no_stream,
            session,
            system,
        } => {
            let args = ChatArgs {
                message,
                model,
                no_stream,
                session,
                system,
            };
            commands::chat::handle_chat_command(args, &settings).await
        }
        Commands::Image {
            prompt,
            n,
            size,
            format,
        } => {
            let args = ImageArgs {
                prompt,
                n,
                size,
                format,
            };
            commands::image::handle_image_command(args, &settings).await
        }
        Commands::Models => commands::models::handle_models_command(&settings),
        Commands::History { command } => {
            commands::history::handle_history_command(command, &settings).await
        }
    };

    match result {
        Ok(_) => {
            info!("Command completed successfully");
        }
        Err(e) => {
            error!("Command failed: {}", e);
            process::exit(1);
        }
    }
}
