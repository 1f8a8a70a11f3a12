//! Process-wide defaults, passed explicitly into task construction

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::image::ImageOptions;
use crate::models::ApiFlavor;
use crate::options::ChatOptions;

/// Settings store providing the default API key and option values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// OpenAI API key
    pub api_key: String,
    /// Default end-user tag
    pub user: Option<String>,
    /// API base URL
    pub endpoint: String,
    pub api_flavor: ApiFlavor,
    pub azure_api_version: String,
    /// Default chat options
    pub chat: ChatOptions,
    /// Default image options
    pub image: ImageOptions,
    /// Log request bodies and raw response content at debug level
    pub enable_internal_logs: bool,
    /// Where chat sessions are saved
    pub history_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            user: None,
            endpoint: "https://api.openai.com/".to_string(),
            api_flavor: ApiFlavor::OpenAi,
            azure_api_version: "2023-05-15".to_string(),
            chat: ChatOptions::default(),
            image: ImageOptions::default(),
            enable_internal_logs: false,
            history_dir: PathBuf::from("Saved/PromptWire"),
        }
    }
}

impl Settings {
    /// Create settings with the given API key and default everything else
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_internal_logs(mut self, enabled: bool) -> Self {
        self.enable_internal_logs = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatModel;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.api_key.is_empty());
        assert_eq!(settings.endpoint, "https://api.openai.com/");
        assert_eq!(settings.chat.model, ChatModel::Gpt35Turbo);
        assert_eq!(settings.chat.max_tokens, 2048);
        assert_eq!(settings.image.images_num, 1);
        assert!(!settings.enable_internal_logs);
    }

    #[test]
    fn test_partial_settings_deserialize() {
        let settings: Settings = serde_json::from_str(
            r#"{"api_key": "sk-1", "api_flavor": "azure", "chat": {"model": "GPT-4", "stream": false}}"#,
        )
        .unwrap();

        assert_eq!(settings.api_key, "sk-1");
        assert_eq!(settings.api_flavor, ApiFlavor::Azure);
        assert_eq!(settings.chat.model, ChatModel::Gpt4);
        assert!(!settings.chat.stream);
        assert_eq!(settings.chat.top_p, 1.0);
    }
}
