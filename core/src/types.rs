//! Chat value types: messages, choices, usage and the response accumulator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    User,
    Assistant,
    System,
    Function,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Function => "function",
        }
    }

    /// Case-insensitive lookup. Unrecognized names fall back to [`Role::User`].
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "assistant" => Role::Assistant,
            "system" => Role::System,
            "function" => Role::Function,
            _ => Role::User,
        }
    }
}

pub fn role_to_name(role: Role) -> &'static str {
    role.as_str()
}

pub fn name_to_role(name: &str) -> Role {
    Role::from_name(name)
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Role::from_name(name)
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Role::from_name(&name))
    }
}

/// A function invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            function_call: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_function_call(mut self, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        self.function_call = Some(FunctionCall {
            name: name.into(),
            arguments: arguments.into(),
        });
        self
    }

    /// Request-body form of the message.
    ///
    /// Function-role messages that carry a call are sent as
    /// `{role, name, content}`; everything else as `{role, content}`.
    pub fn to_wire(&self) -> Value {
        match (&self.role, &self.function_call) {
            (Role::Function, Some(call)) => json!({
                "role": self.role.as_str(),
                "name": call.name,
                "content": self.content,
            }),
            _ => json!({
                "role": self.role.as_str(),
                "content": self.content,
            }),
        }
    }
}

/// One candidate completion inside a response
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    pub finish_reason: Option<String>,
}

impl Choice {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }
}

/// Token accounting echoed from the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32, total_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }
}

/// Structured error returned by the API in place of a normal payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApiError {
    pub r#type: String,
    pub code: String,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.r#type, self.code, self.message)
    }
}

/// Accumulated chat response, mutated in place by the decoder
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub choices: Vec<Choice>,
    pub usage: Usage,
    pub success: bool,
    pub error: Option<ApiError>,
}

impl ChatResponse {
    /// Find a choice by its index
    pub fn choice(&self, index: u32) -> Option<&Choice> {
        self.choices.iter().find(|choice| choice.index == index)
    }

    /// Find a choice by index, appending an empty one if none exists yet
    pub fn choice_mut_or_insert(&mut self, index: u32) -> &mut Choice {
        let position = match self.choices.iter().position(|choice| choice.index == index) {
            Some(position) => position,
            None => {
                self.choices.push(Choice::new(index));
                self.choices.len() - 1
            }
        };
        &mut self.choices[position]
    }

    /// Content of the lowest-indexed choice, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .iter()
            .min_by_key(|choice| choice.index)
            .map(|choice| choice.message.content.as_str())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        if self.created == 0 {
            return None;
        }
        DateTime::from_timestamp(self.created, 0)
    }
}
