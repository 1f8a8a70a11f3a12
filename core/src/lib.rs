//! # PromptWire Core
//!
//! Value types, the model table, injected settings and the incremental
//! response decoder shared by every PromptWire task. Nothing in this crate
//! performs network I/O.

pub mod types;
pub mod image;
pub mod models;
pub mod options;
pub mod settings;
pub mod decoder;
pub mod history;
pub mod errors;

// Re-export commonly used types
pub use types::{ApiError, ChatResponse, Choice, FunctionCall, Message, Role, Usage};
pub use image::{ImageFormat, ImageOptions, ImageResponse, ImageSize};
pub use models::{ApiFlavor, ChatModel};
pub use options::{ChatOptions, CommonOptions};
pub use settings::Settings;
pub use errors::{ActivationError, CoreError, HistoryError, LlmError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::types::*;
    pub use crate::image::*;
    pub use crate::models::*;
    pub use crate::options::*;
    pub use crate::settings::*;
    pub use crate::errors::*;
}
