//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pwctl")]
#[command(about = "PromptWire OpenAI request tool")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL
    #[arg(short, long, global = true)]
    pub endpoint: Option<String>,

    /// API key (overrides configuration and environment)
    #[arg(short = 'k', long, global = true)]
    pub api_key: Option<String>,

    /// Log request bodies and raw responses at debug level
    #[arg(long, global = true)]
    pub internal_logs: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a chat message and print the reply
    Chat {
        /// Message text
        message: String,
        /// Model name (e.g. gpt-4)
        #[arg(short, long)]
        model: Option<String>,
        /// Wait for the whole reply instead of streaming it
        #[arg(long)]
        no_stream: bool,
        /// Continue and save a named session
        #[arg(short, long)]
        session: Option<String>,
        /// System prompt for a new session
        #[arg(long)]
        system: Option<String>,
    },
    /// Generate images from a prompt
    Image {
        /// Image prompt
        prompt: String,
        /// Number of images
        #[arg(short)]
        n: Option<u32>,
        /// Image size (256x256, 512x512, 1024x1024)
        #[arg(long)]
        size: Option<String>,
        /// Response format (url, b64_json)
        #[arg(short, long)]
        format: Option<String>,
    },
    /// List supported models
    Models,
    /// Saved chat sessions
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List saved sessions
    List,
    /// Print a session transcript
    Show {
        /// Session name
        session: String,
    },
    /// Delete a saved session
    Delete {
        /// Session name
        session: String,
    },
}
