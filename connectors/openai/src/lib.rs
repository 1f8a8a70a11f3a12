//! OpenAI request tasks for PromptWire
//!
//! [`PromptWire`] creates chat and image tasks. A task is inert until
//! activated; its request then runs on the tokio runtime and every event is
//! delivered through the injected [`MainContext`].

use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::debug;

use promptwire_core::prelude::*;

mod chat;
mod config;
mod events;
mod host;
mod image;
mod main_context;
mod models;
mod task;
mod transport;

#[cfg(test)]
mod testing;

pub use chat::{ChatEvent, ChatRequest, ChatTask};
pub use config::TransportConfig;
pub use events::{Listeners, TaskEvent};
pub use host::HostContext;
pub use image::{ImageEvent, ImageRequest, ImageTask};
pub use main_context::{MainContext, MainJob, MainQueue};
pub use models::{CompletionRequest, ImageGenerationRequest};
pub use task::{RequestTask, TaskCore, TaskHandle, TaskState};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, ResponseHandler};

use task::TaskContext;

/// Task factory bound to one settings store, transport and main context
#[derive(Clone)]
pub struct PromptWire {
    settings: Settings,
    transport: Arc<dyn HttpTransport>,
    main: Arc<dyn MainContext>,
    runtime: Handle,
    host: Option<HostContext>,
}

impl PromptWire {
    /// Create a client using the reqwest transport on the current runtime
    pub fn new(settings: Settings, main: Arc<dyn MainContext>) -> LlmResult<Self> {
        let transport = ReqwestTransport::new(TransportConfig::default())?;
        Self::with_transport(settings, Arc::new(transport), main)
    }

    /// Create a client with a custom transport
    pub fn with_transport(
        settings: Settings,
        transport: Arc<dyn HttpTransport>,
        main: Arc<dyn MainContext>,
    ) -> LlmResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| LlmError::ConfigError(format!("No tokio runtime available: {}", e)))?;

        Ok(Self {
            settings,
            transport,
            main,
            runtime,
            host: None,
        })
    }

    /// Register every task created from now on with `host`
    pub fn with_host(mut self, host: HostContext) -> Self {
        self.host = Some(host);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn host(&self) -> Option<&HostContext> {
        self.host.as_ref()
    }

    /// Default common options from the settings store
    pub fn common_options(&self) -> CommonOptions {
        CommonOptions::from_settings(&self.settings)
    }

    /// Single user message with default options
    pub fn send_message(&self, text: impl Into<String>) -> ChatRequest {
        self.send_messages(vec![Message::user(text)])
    }

    /// Message list with default options
    pub fn send_messages(&self, messages: Vec<Message>) -> ChatRequest {
        self.send_messages_custom(messages, self.common_options(), self.settings.chat.clone())
    }

    pub fn send_message_custom(
        &self,
        text: impl Into<String>,
        common: CommonOptions,
        options: ChatOptions,
    ) -> ChatRequest {
        self.send_messages_custom(vec![Message::user(text)], common, options)
    }

    pub fn send_messages_custom(
        &self,
        messages: Vec<Message>,
        common: CommonOptions,
        options: ChatOptions,
    ) -> ChatRequest {
        self.chat_task(messages, common, options, true)
    }

    /// Default options with the model replaced by name
    pub fn send_messages_with_model(&self, messages: Vec<Message>, model: &str) -> ChatRequest {
        let options = self.settings.chat.clone().with_model(name_to_model(model));
        self.send_messages_custom(messages, self.common_options(), options)
    }

    /// Image generation with default options
    pub fn request_images(&self, prompt: impl Into<String>) -> ImageRequest {
        self.request_images_custom(prompt, self.common_options(), self.settings.image.clone())
    }

    pub fn request_images_custom(
        &self,
        prompt: impl Into<String>,
        common: CommonOptions,
        options: ImageOptions,
    ) -> ImageRequest {
        self.image_task(prompt.into(), common, options, true)
    }

    /// Chat task that outlives host shutdown
    pub fn editor_chat_task(&self, messages: Vec<Message>, options: ChatOptions) -> ChatRequest {
        self.chat_task(messages, self.common_options(), options, false)
    }

    /// Image task that outlives host shutdown
    pub fn editor_image_task(&self, prompt: impl Into<String>, options: ImageOptions) -> ImageRequest {
        self.image_task(prompt.into(), self.common_options(), options, false)
    }

    fn chat_task(
        &self,
        messages: Vec<Message>,
        common: CommonOptions,
        options: ChatOptions,
        teardown_hook: bool,
    ) -> ChatRequest {
        debug!(
            "Creating chat task: model={}, messages={}, stream={}",
            options.model,
            messages.len(),
            options.stream
        );
        let task = ChatTask::new(messages, common, options, &self.context());
        TaskHandle::create(task, self.host.as_ref(), teardown_hook)
    }

    fn image_task(
        &self,
        prompt: String,
        common: CommonOptions,
        options: ImageOptions,
        teardown_hook: bool,
    ) -> ImageRequest {
        debug!(
            "Creating image task: images={}, size={}, format={}",
            options.images_num, options.size, options.format
        );
        let task = ImageTask::new(prompt, common, options, &self.context());
        TaskHandle::create(task, self.host.as_ref(), teardown_hook)
    }

    fn context(&self) -> TaskContext {
        TaskContext {
            transport: self.transport.clone(),
            main: self.main.clone(),
            runtime: self.runtime.clone(),
            host: self.host.clone(),
            internal_logs: self.settings.enable_internal_logs,
        }
    }
}

impl std::fmt::Debug for PromptWire {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptWire")
            .field("endpoint", &self.settings.endpoint)
            .field("flavor", &self.settings.api_flavor)
            .field("host", &self.host)
            .finish()
    }
}
