//! OpenAI API request bodies

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use promptwire_core::prelude::*;

/// Body for `chat/completions` and legacy `completions`
///
/// Exactly one of `messages` (conversational models) or `prompt` (legacy
/// completion models) is present.
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'static str,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub n: u32,
    pub stream: bool,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<&'a BTreeMap<u32, f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<&'a str>,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(messages: &'a [Message], options: &'a ChatOptions, common: &'a CommonOptions) -> Self {
        let (messages, prompt) = if options.model.supports_chat() {
            (Some(messages.iter().map(Message::to_wire).collect()), None)
        } else {
            (None, messages.last().map(|message| message.content.as_str()))
        };

        Self {
            model: options.model.name(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            n: options.choices,
            stream: options.stream,
            presence_penalty: options.presence_penalty,
            frequency_penalty: options.frequency_penalty,
            user: common.user_tag(),
            stop: Some(options.stop.as_slice()).filter(|stop| !stop.is_empty()),
            logit_bias: Some(&options.logit_bias).filter(|bias| !bias.is_empty()),
            messages,
            prompt,
        }
    }
}

/// Body for `images/generations`
#[derive(Debug, Serialize)]
pub struct ImageGenerationRequest<'a> {
    pub prompt: &'a str,
    pub n: u32,
    pub size: &'static str,
    pub response_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a str>,
}

impl<'a> ImageGenerationRequest<'a> {
    pub fn new(prompt: &'a str, options: &ImageOptions, common: &'a CommonOptions) -> Self {
        Self {
            prompt,
            n: options.images_num,
            size: options.size.as_str(),
            response_format: options.format.as_str(),
            user: common.user_tag(),
        }
    }
}
