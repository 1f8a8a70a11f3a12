//! History command implementation

use crate::cli::HistoryCommands;
use crate::output;
use colored::*;
use promptwire_core::errors::CoreResult;
use promptwire_core::history::HistoryStore;
use promptwire_core::settings::Settings;
use tracing::info;

/// Handle history subcommands
pub async fn handle_history_command(command: HistoryCommands, settings: &Settings) -> CoreResult<()> {
    let store = HistoryStore::new(&settings.history_dir);
    info!("Using history directory {}", store.dir().display());

    match command {
        HistoryCommands::List => {
            output::display_sessions(&store.list().await?);
        }
        HistoryCommands::Show { session } => {
            output::display_transcript(&store.load(&session).await?);
        }
        HistoryCommands::Delete { session } => {
            if store.delete(&session).await? {
                println!("{}", format!("✓ Deleted session {}", session).green());
            } else {
                println!("{}", format!("No saved session named {}", session).yellow());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptwire_core::errors::CoreError;
    use promptwire_core::types::Message;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Settings {
        Settings {
            history_dir: dir.path().to_path_buf(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_delete_removes_session() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path());
        store.save("old", &[Message::user("Hi")]).await.unwrap();

        let command = HistoryCommands::Delete {
            session: "old".to_string(),
        };
        handle_history_command(command, &settings(&dir)).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_session_name() {
        let dir = TempDir::new().unwrap();
        let command = HistoryCommands::Show {
            session: "../etc".to_string(),
        };
        let result = handle_history_command(command, &settings(&dir)).await;
        assert!(matches!(result, Err(CoreError::History(_))));
    }

    #[tokio::test]
    async fn test_list_on_missing_directory() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            history_dir: dir.path().join("never-created"),
            ..Settings::default()
        };
        handle_history_command(HistoryCommands::List, &settings).await.unwrap();
    }
}
