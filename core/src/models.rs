//! Supported model identifiers and their endpoint routing

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Closed set of models the chat task knows how to address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChatModel {
    Gpt4,
    Gpt4_32k,
    #[default]
    Gpt35Turbo,
    Gpt35Turbo16k,
    TextDavinci003,
    TextDavinci002,
    CodeDavinci002,
}

impl ChatModel {
    pub const ALL: [ChatModel; 7] = [
        ChatModel::Gpt4,
        ChatModel::Gpt4_32k,
        ChatModel::Gpt35Turbo,
        ChatModel::Gpt35Turbo16k,
        ChatModel::TextDavinci003,
        ChatModel::TextDavinci002,
        ChatModel::CodeDavinci002,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChatModel::Gpt4 => "gpt-4",
            ChatModel::Gpt4_32k => "gpt-4-32k",
            ChatModel::Gpt35Turbo => "gpt-3.5-turbo",
            ChatModel::Gpt35Turbo16k => "gpt-3.5-turbo-16k",
            ChatModel::TextDavinci003 => "text-davinci-003",
            ChatModel::TextDavinci002 => "text-davinci-002",
            ChatModel::CodeDavinci002 => "code-davinci-002",
        }
    }

    /// Case-insensitive lookup; unknown names resolve to `gpt-3.5-turbo`
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|model| model.name().eq_ignore_ascii_case(name.trim()))
            .unwrap_or_default()
    }

    /// Whether the model takes a `messages` array rather than a flat `prompt`
    pub fn supports_chat(&self) -> bool {
        matches!(
            self,
            ChatModel::Gpt4 | ChatModel::Gpt4_32k | ChatModel::Gpt35Turbo | ChatModel::Gpt35Turbo16k
        )
    }
}

impl std::fmt::Display for ChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ChatModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ChatModel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ChatModel::from_name(&name))
    }
}

/// Which hosting of the API a deployment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiFlavor {
    /// `api.openai.com`-style routes under `v1/`
    #[default]
    OpenAi,
    /// Enterprise-hosted deployments addressed by model name and api-version
    Azure,
}

impl std::fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiFlavor::OpenAi => write!(f, "openai"),
            ApiFlavor::Azure => write!(f, "azure"),
        }
    }
}

impl std::str::FromStr for ApiFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ApiFlavor::OpenAi),
            "azure" => Ok(ApiFlavor::Azure),
            _ => Err(format!("Unknown API flavor: {}", s)),
        }
    }
}

pub fn model_to_name(model: ChatModel) -> &'static str {
    model.name()
}

pub fn name_to_model(name: &str) -> ChatModel {
    ChatModel::from_name(name)
}

pub fn model_supports_chat(model: ChatModel) -> bool {
    model.supports_chat()
}

/// Names of every supported model, in table order
pub fn available_models() -> Vec<&'static str> {
    ChatModel::ALL.iter().map(ChatModel::name).collect()
}

/// Path (relative to the API base, no leading slash) serving `model`
pub fn endpoint_for_model(model: ChatModel, flavor: ApiFlavor, azure_api_version: &str) -> String {
    let route = if model.supports_chat() {
        "chat/completions"
    } else {
        "completions"
    };

    match flavor {
        ApiFlavor::OpenAi => format!("v1/{}", route),
        ApiFlavor::Azure => format!(
            "openai/deployments/{}/{}?api-version={}",
            model.name(),
            route,
            azure_api_version
        ),
    }
}

/// Path of the image generation route
pub fn image_endpoint() -> &'static str {
    "v1/images/generations"
}
