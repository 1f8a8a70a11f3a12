//! Image generation task

use tracing::warn;

use promptwire_core::decoder::decode_image_response;
use promptwire_core::prelude::*;

use crate::events::TaskEvent;
use crate::models::ImageGenerationRequest;
use crate::task::{RequestTask, TaskContext, TaskCore, TaskHandle, TaskState};
use crate::transport::HttpResponse;

pub type ImageEvent = TaskEvent<ImageResponse>;

/// Handle to an image generation task
pub type ImageRequest = TaskHandle<ImageTask>;

pub struct ImageTask {
    core: TaskCore<ImageResponse>,
    prompt: String,
    options: ImageOptions,
}

impl ImageTask {
    pub(crate) fn new(prompt: String, common: CommonOptions, options: ImageOptions, context: &TaskContext) -> Self {
        Self {
            core: TaskCore::new("image", common, context),
            prompt,
            options,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn options(&self) -> &ImageOptions {
        &self.options
    }
}

impl RequestTask for ImageTask {
    type Response = ImageResponse;

    fn core(&self) -> &TaskCore<ImageResponse> {
        &self.core
    }

    fn check_preconditions(&self) -> Result<(), ActivationError> {
        if self.prompt.trim().is_empty() {
            return Err(ActivationError::EmptyPrompt);
        }
        Ok(())
    }

    fn endpoint_url(&self) -> Option<String> {
        self.core.common().image_url()
    }

    fn request_body(&self) -> serde_json::Result<String> {
        serde_json::to_string(&ImageGenerationRequest::new(
            &self.prompt,
            &self.options,
            self.core.common(),
        ))
    }

    fn on_complete(&self, response: &HttpResponse, state: &mut TaskState<ImageResponse>) -> Vec<ImageEvent> {
        if response.body.trim().is_empty() {
            warn!(task = %self.core.id(), status = response.status, "Empty response body");
            return vec![TaskEvent::RequestFailed];
        }

        let decoded = decode_image_response(&response.body, self.options.format, &mut state.response);
        let snapshot = state.response.clone();

        if snapshot.error.is_some() {
            return vec![TaskEvent::ErrorReceived(snapshot)];
        }
        if !decoded || !snapshot.success || !response.is_success() {
            warn!(
                task = %self.core.id(),
                status = response.status,
                "Response could not be decoded into images"
            );
            return vec![TaskEvent::RequestFailed];
        }

        vec![TaskEvent::ProcessCompleted(snapshot)]
    }
}

impl ImageRequest {
    pub fn prompt(&self) -> &str {
        self.task().prompt()
    }

    pub fn image_options(&self) -> &ImageOptions {
        self.task().options()
    }
}
