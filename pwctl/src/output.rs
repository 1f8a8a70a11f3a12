//! Output formatting utilities for pwctl

use colored::*;
use promptwire_core::prelude::*;
use std::io::Write;
use tabled::{Table, Tabled};

/// Prints a streamed reply as it grows
///
/// Every progress event carries the whole content so far; only the part not
/// yet printed is written.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    printed: usize,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the part of `content` not printed before
    pub fn advance<'a>(&mut self, content: &'a str) -> &'a str {
        if content.len() <= self.printed || !content.is_char_boundary(self.printed) {
            return "";
        }
        let unseen = &content[self.printed..];
        self.printed = content.len();
        unseen
    }

    pub fn print(&mut self, content: &str) {
        let unseen = self.advance(content);
        if unseen.is_empty() {
            return;
        }
        print!("{}", unseen);
        let _ = std::io::stdout().flush();
    }

    /// Print whatever is left and end the line
    pub fn finish(&mut self, content: &str) {
        self.print(content);
        println!();
    }
}

pub fn display_api_error(error: &ApiError) {
    println!("{}", "✗ The API returned an error".red().bold());
    println!("{:<10} {}", "Type:".bold(), error.r#type);
    println!("{:<10} {}", "Code:".bold(), error.code);
    println!("{:<10} {}", "Message:".bold(), error.message.red());
}

pub fn display_request_failed() {
    println!("{}", "✗ Request failed".red().bold());
    println!("Run again with -vv (and --internal-logs) for details");
}

pub fn display_usage(usage: &Usage) {
    if usage.total_tokens == 0 {
        return;
    }
    println!(
        "{}",
        format!(
            "tokens: {} prompt + {} completion = {}",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        )
        .dimmed()
    );
}

#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Model")]
    name: &'static str,
    #[tabled(rename = "Chat")]
    chat: &'static str,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
}

pub fn models_table(flavor: ApiFlavor, azure_api_version: &str) -> String {
    let rows: Vec<ModelRow> = ChatModel::ALL
        .iter()
        .map(|model| ModelRow {
            name: model.name(),
            chat: if model.supports_chat() { "yes" } else { "no" },
            endpoint: endpoint_for_model(*model, flavor, azure_api_version),
        })
        .collect();

    Table::new(rows).to_string()
}

pub fn display_sessions(sessions: &[String]) {
    if sessions.is_empty() {
        println!("No saved sessions");
        return;
    }
    for session in sessions {
        println!("{}", session);
    }
}

pub fn display_transcript(messages: &[Message]) {
    if messages.is_empty() {
        println!("Session is empty");
        return;
    }

    for message in messages {
        let role = match message.role {
            Role::User => "user".green().bold(),
            Role::Assistant => "assistant".blue().bold(),
            Role::System => "system".yellow().bold(),
            Role::Function => "function".magenta().bold(),
        };
        println!("{}: {}", role, message.content);
        if let Some(call) = &message.function_call {
            println!("  {} {}({})", "call".dimmed(), call.name, call.arguments);
        }
    }
}

pub fn display_images(response: &ImageResponse, format: ImageFormat) {
    for (index, image) in response.data.iter().enumerate() {
        match format {
            ImageFormat::Url => println!("{} {}", format!("[{}]", index + 1).bold(), image),
            ImageFormat::B64Json => println!(
                "{} base64 image, {} bytes encoded",
                format!("[{}]", index + 1).bold(),
                image.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_printer_only_returns_new_text() {
        let mut printer = StreamPrinter::new();
        assert_eq!(printer.advance(""), "");
        assert_eq!(printer.advance("Hel"), "Hel");
        assert_eq!(printer.advance("Hel"), "");
        assert_eq!(printer.advance("Hello"), "lo");
    }

    #[test]
    fn test_stream_printer_waits_for_char_boundary() {
        let mut printer = StreamPrinter::new();
        assert_eq!(printer.advance("é"), "é");
        assert_eq!(printer.advance("éà"), "à");
    }

    #[test]
    fn test_models_table() {
        let table = models_table(ApiFlavor::OpenAi, "2023-05-15");
        assert!(table.contains("gpt-4"));
        assert!(table.contains("v1/chat/completions"));
        assert!(table.contains("text-davinci-003"));
        assert!(table.contains("v1/completions"));
    }
}
