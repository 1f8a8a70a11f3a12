//! Image command implementation

use crate::commands::drive;
use crate::output;
use promptwire_connector_openai::{MainQueue, PromptWire, TaskEvent};
use promptwire_core::prelude::*;
use std::sync::Arc;
use tracing::info;

pub struct ImageArgs {
    pub prompt: String,
    pub n: Option<u32>,
    pub size: Option<String>,
    pub format: Option<String>,
}

/// Handle image command
pub async fn handle_image_command(args: ImageArgs, settings: &Settings) -> CoreResult<()> {
    let options = image_options(&args, &settings.image);
    info!(
        "Requesting {} image(s) of {} as {}",
        options.images_num, options.size, options.format
    );

    let queue = Arc::new(MainQueue::new());
    let wire = PromptWire::new(settings.clone(), queue.clone())?;
    let format = options.format;
    let task = wire.request_images_custom(args.prompt, wire.common_options(), options);

    match drive(&task, &queue, |_| {}).await? {
        TaskEvent::ProcessCompleted(response) => {
            output::display_images(&response, format);
            Ok(())
        }
        TaskEvent::ErrorReceived(response) => {
            let error = response.error.unwrap_or_default();
            output::display_api_error(&error);
            Err(LlmError::ApiError(error.to_string()).into())
        }
        _ => {
            output::display_request_failed();
            Err(LlmError::NetworkError("Request failed".to_string()).into())
        }
    }
}

/// Settings defaults with command-line overrides applied
fn image_options(args: &ImageArgs, defaults: &ImageOptions) -> ImageOptions {
    let mut options = defaults.clone();
    if let Some(n) = args.n {
        options = options.with_images(n);
    }
    if let Some(ref size) = args.size {
        options = options.with_size(ImageSize::from_name(size));
    }
    if let Some(ref format) = args.format {
        options = options.with_format(ImageFormat::from_name(format));
    }
    options
}
