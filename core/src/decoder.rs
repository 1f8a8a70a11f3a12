//! Incremental response decoder
//!
//! One merge function serves three upstream shapes, keyed purely on which
//! field a choice carries:
//!
//! - `message`: a whole, non-streamed message. Replaces the choice's message.
//! - `delta`: a streamed fragment. Its content is appended.
//! - `text`: a legacy completion. Appended as assistant content.
//!
//! Streamed bodies arrive cumulatively, so [`decode_chat_stream`] rebuilds the
//! choice list from every `data: ` segment seen so far on each call.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::trace;

use crate::image::{ImageFormat, ImageResponse};
use crate::types::{ApiError, ChatResponse, FunctionCall, Role, Usage};

const SSE_DELIMITER: &str = "data: ";
const SSE_DONE: &str = "[done]";

/// Read a field, falling back to its default when it is `null` or mistyped.
///
/// A single odd field never costs the rest of the fragment.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WirePayload {
    #[serde(deserialize_with = "lenient")]
    error: Option<WireError>,
    #[serde(deserialize_with = "lenient")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    object: Option<String>,
    #[serde(deserialize_with = "lenient")]
    created: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    choices: Vec<WireChoice>,
    #[serde(deserialize_with = "lenient")]
    usage: Option<WireUsage>,
    #[serde(deserialize_with = "lenient")]
    data: Vec<WireImage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireError {
    code: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    r#type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireChoice {
    #[serde(deserialize_with = "lenient")]
    index: u32,
    #[serde(deserialize_with = "lenient")]
    message: Option<WireMessage>,
    #[serde(deserialize_with = "lenient")]
    delta: Option<WireDelta>,
    #[serde(deserialize_with = "lenient")]
    text: Option<String>,
    #[serde(deserialize_with = "lenient")]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireMessage {
    #[serde(deserialize_with = "lenient")]
    role: Option<String>,
    #[serde(deserialize_with = "lenient")]
    content: Option<String>,
    #[serde(deserialize_with = "lenient")]
    function_call: Option<WireFunctionCall>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireFunctionCall {
    #[serde(deserialize_with = "lenient")]
    name: String,
    #[serde(deserialize_with = "lenient")]
    arguments: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireDelta {
    #[serde(deserialize_with = "lenient")]
    role: Option<String>,
    #[serde(deserialize_with = "lenient")]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireUsage {
    #[serde(deserialize_with = "lenient")]
    prompt_tokens: u32,
    #[serde(deserialize_with = "lenient")]
    completion_tokens: u32,
    #[serde(deserialize_with = "lenient")]
    total_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireImage {
    #[serde(deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    b64_json: Option<String>,
}

impl From<WireFunctionCall> for FunctionCall {
    fn from(call: WireFunctionCall) -> Self {
        FunctionCall {
            name: call.name,
            arguments: call.arguments,
        }
    }
}

impl From<WireError> for ApiError {
    fn from(error: WireError) -> Self {
        let code = match error.code {
            Some(Value::String(code)) => code,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        ApiError {
            r#type: error.r#type.unwrap_or_default(),
            code,
            message: error.message.unwrap_or_default(),
        }
    }
}

/// Parse a fragment into a payload; `None` for empty, malformed or non-object input
fn parse_payload(fragment: &str) -> Option<WirePayload> {
    if fragment.trim().is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(fragment) {
        Ok(value) => value,
        Err(e) => {
            trace!("Skipping undecodable fragment: {}", e);
            return None;
        }
    };

    if !value.is_object() {
        trace!("Skipping fragment whose root is not an object");
        return None;
    }

    serde_json::from_value(value)
        .map_err(|e| trace!("Skipping fragment with unexpected field types: {}", e))
        .ok()
}

/// Merge one JSON fragment into `response`.
///
/// Returns `false` when the fragment was skipped (empty or malformed).
/// An `error` object marks the response unsuccessful, and no later fragment
/// can flip `success` back while that error is recorded.
pub fn decode_chat_fragment(fragment: &str, response: &mut ChatResponse) -> bool {
    let Some(payload) = parse_payload(fragment) else {
        return false;
    };

    if let Some(error) = payload.error {
        response.error = Some(error.into());
        response.success = false;
        return true;
    }

    response.success = response.error.is_none();

    if let Some(id) = payload.id {
        response.id = id;
    }
    if let Some(object) = payload.object {
        response.object = object;
    }
    if let Some(created) = payload.created {
        response.created = created;
    }

    for entry in payload.choices {
        let choice = response.choice_mut_or_insert(entry.index);

        if let Some(message) = entry.message {
            choice.message.role = Role::from_name(message.role.as_deref().unwrap_or_default());
            choice.message.content = message.content.unwrap_or_default();
            choice.message.function_call = message.function_call.map(FunctionCall::from);
        } else if let Some(delta) = entry.delta {
            // Deltas only distinguish "user" from everything else; the full
            // role table is reserved for whole messages.
            if let Some(role) = delta.role {
                choice.message.role = if role.eq_ignore_ascii_case("user") {
                    Role::User
                } else {
                    Role::Assistant
                };
            }
            if let Some(content) = delta.content {
                choice.message.content.push_str(&content);
            }
        } else if let Some(text) = entry.text {
            choice.message.role = Role::Assistant;
            choice.message.content.push_str(&text);
        }

        strip_leading_newlines(&mut choice.message.content);

        if let Some(reason) = entry.finish_reason {
            choice.finish_reason = Some(reason);
        }
    }

    if let Some(usage) = payload.usage {
        response.usage = Usage::new(usage.prompt_tokens, usage.completion_tokens, usage.total_tokens);
    }

    true
}

fn strip_leading_newlines(content: &mut String) {
    let stripped = content.len() - content.trim_start_matches('\n').len();
    if stripped > 0 {
        content.drain(..stripped);
    }
}

/// Split a raw SSE body into its `data: ` segments.
///
/// A trailing `[DONE]` sentinel is dropped. When nothing usable remains the
/// whole body is returned as the single segment, so plain JSON bodies pass
/// through untouched.
pub fn split_stream(content: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = content
        .split(SSE_DELIMITER)
        .filter(|segment| !segment.trim().is_empty())
        .collect();

    if segments
        .last()
        .is_some_and(|last| last.to_lowercase().contains(SSE_DONE))
    {
        segments.pop();
    }

    if segments.is_empty() {
        segments.push(content);
    }

    segments
}

/// Re-decode the full cumulative stream body seen so far.
///
/// Choices are rebuilt from scratch so that segments already applied by an
/// earlier call are not appended twice. Top-level fields, usage and any
/// recorded error persist.
pub fn decode_chat_stream(content: &str, response: &mut ChatResponse) -> usize {
    let segments = split_stream(content);
    response.choices.clear();

    segments
        .into_iter()
        .filter(|segment| decode_chat_fragment(segment, response))
        .count()
}

/// Decode an image generation body into `response`
pub fn decode_image_response(content: &str, format: ImageFormat, response: &mut ImageResponse) -> bool {
    let Some(payload) = parse_payload(content) else {
        return false;
    };

    if let Some(error) = payload.error {
        response.error = Some(error.into());
        response.success = false;
        return true;
    }

    response.success = response.error.is_none();

    if let Some(created) = payload.created {
        response.created = created;
    }

    response.data = payload
        .data
        .into_iter()
        .filter_map(|image| match format {
            ImageFormat::Url => image.url,
            ImageFormat::B64Json => image.b64_json,
        })
        .collect();

    true
}
