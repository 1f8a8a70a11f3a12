//! Per-request options, defaulted from injected [`Settings`]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{endpoint_for_model, ApiFlavor, ChatModel};
use crate::settings::Settings;

/// Options shared by every task kind: credentials and routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonOptions {
    /// Bearer token sent in the `Authorization` header
    pub api_key: String,
    /// Optional end-user tag forwarded as `user`
    pub user: Option<String>,
    /// API base URL
    pub endpoint: String,
    pub flavor: ApiFlavor,
    /// Only used by [`ApiFlavor::Azure`]
    pub azure_api_version: String,
}

impl CommonOptions {
    /// Take credentials and routing defaults from the settings store
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            user: settings.user.clone(),
            endpoint: settings.endpoint.clone(),
            flavor: settings.api_flavor,
            azure_api_version: settings.azure_api_version.clone(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the API base URL (for Azure OpenAI or other compatible services)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_azure(mut self, api_version: impl Into<String>) -> Self {
        self.flavor = ApiFlavor::Azure;
        self.azure_api_version = api_version.into();
        self
    }

    /// Endpoint with exactly one trailing slash, or `None` when blank
    pub fn normalized_endpoint(&self) -> Option<String> {
        let trimmed = self.endpoint.trim();
        if trimmed.trim_end_matches('/').is_empty() {
            return None;
        }
        Some(format!("{}/", trimmed.trim_end_matches('/')))
    }

    /// User tag, ignoring blank values
    pub fn user_tag(&self) -> Option<&str> {
        self.user.as_deref().filter(|user| !user.trim().is_empty())
    }

    /// Full URL of the completion route serving `model`
    pub fn chat_url(&self, model: ChatModel) -> Option<String> {
        self.normalized_endpoint().map(|base| {
            format!("{}{}", base, endpoint_for_model(model, self.flavor, &self.azure_api_version))
        })
    }

    /// Full URL of the image generation route
    pub fn image_url(&self) -> Option<String> {
        self.normalized_endpoint()
            .map(|base| format!("{}{}", base, crate::models::image_endpoint()))
    }
}

impl Default for CommonOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Sampling and shaping options for a chat or completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatOptions {
    pub model: ChatModel,
    pub temperature: f32,
    pub top_p: f32,
    /// Number of choices to generate (`n`)
    pub choices: u32,
    pub stream: bool,
    pub stop: Vec<String>,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub max_tokens: u32,
    /// Token id to bias
    pub logit_bias: BTreeMap<u32, f32>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: ChatModel::Gpt35Turbo,
            temperature: 1.0,
            top_p: 1.0,
            choices: 1,
            stream: true,
            stop: Vec::new(),
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            max_tokens: 2048,
            logit_bias: BTreeMap::new(),
        }
    }
}

impl ChatOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        settings.chat.clone()
    }

    pub fn with_model(mut self, model: ChatModel) -> Self {
        self.model = model;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p.clamp(0.0, 1.0);
        self
    }

    pub fn with_choices(mut self, choices: u32) -> Self {
        self.choices = choices.max(1);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_stop(mut self, stop: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.stop = stop.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_penalties(mut self, presence: f32, frequency: f32) -> Self {
        self.presence_penalty = presence.clamp(-2.0, 2.0);
        self.frequency_penalty = frequency.clamp(-2.0, 2.0);
        self
    }

    pub fn with_logit_bias(mut self, token: u32, bias: f32) -> Self {
        self.logit_bias.insert(token, bias.clamp(-100.0, 100.0));
        self
    }
}
