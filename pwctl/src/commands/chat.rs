//! Chat command implementation

use crate::commands::drive;
use crate::output::{self, StreamPrinter};
use colored::*;
use promptwire_connector_openai::{MainQueue, PromptWire, TaskEvent};
use promptwire_core::history::HistoryStore;
use promptwire_core::prelude::*;
use std::sync::Arc;
use tracing::info;

pub struct ChatArgs {
    pub message: String,
    pub model: Option<String>,
    pub no_stream: bool,
    pub session: Option<String>,
    pub system: Option<String>,
}

/// Handle chat command
pub async fn handle_chat_command(args: ChatArgs, settings: &Settings) -> CoreResult<()> {
    let store = HistoryStore::new(&settings.history_dir);
    let history = match &args.session {
        Some(session) => store.load(session).await?,
        None => Vec::new(),
    };
    let mut messages = build_messages(history, args.system.as_deref(), &args.message);

    let mut options = settings.chat.clone().with_stream(!args.no_stream);
    if let Some(ref model) = args.model {
        options = options.with_model(name_to_model(model));
    }
    info!("Sending {} messages to {}", messages.len(), options.model);

    let queue = Arc::new(MainQueue::new());
    let wire = PromptWire::new(settings.clone(), queue.clone())?;
    let task = wire.send_messages_custom(messages.clone(), wire.common_options(), options);

    let mut printer = StreamPrinter::new();
    let outcome = drive(&task, &queue, |event| match event {
        TaskEvent::ProgressStarted(response) | TaskEvent::ProgressUpdated(response) => {
            printer.print(response.first_content().unwrap_or_default());
        }
        TaskEvent::ProcessCompleted(response) => {
            printer.finish(response.first_content().unwrap_or_default());
        }
        _ => {}
    })
    .await?;

    match outcome {
        TaskEvent::ProcessCompleted(response) => {
            output::display_usage(&response.usage);
            if let Some(session) = &args.session {
                let reply = response.first_content().unwrap_or_default();
                messages.push(Message::assistant(reply));
                store.save(session, &messages).await?;
                println!("{}", format!("Saved to session {}", session).dimmed());
            }
            Ok(())
        }
        TaskEvent::ErrorReceived(response) => {
            let error = response.error.unwrap_or_default();
            output::display_api_error(&error);
            Err(LlmError::ApiError(error.to_string()).into())
        }
        _ => {
            output::display_request_failed();
            Err(LlmError::NetworkError("Request failed".to_string()).into())
        }
    }
}

/// Conversation to send: saved history, an optional system prompt for a new
/// session, then the new user message
fn build_messages(history: Vec<Message>, system: Option<&str>, message: &str) -> Vec<Message> {
    let mut messages = history;
    if messages.is_empty() {
        if let Some(system) = system.filter(|system| !system.trim().is_empty()) {
            messages.push(Message::system(system));
        }
    }
    messages.push(Message::user(message));
    messages
}
