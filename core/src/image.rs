//! Image generation value types

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::ApiError;

/// Square output resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSize {
    #[default]
    X256,
    X512,
    X1024,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::X256 => "256x256",
            ImageSize::X512 => "512x512",
            ImageSize::X1024 => "1024x1024",
        }
    }

    /// Case-insensitive lookup; unknown names resolve to `256x256`
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "512x512" => ImageSize::X512,
            "1024x1024" => ImageSize::X1024,
            _ => ImageSize::X256,
        }
    }
}

/// How generated images are returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Url,
    B64Json,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Url => "url",
            ImageFormat::B64Json => "b64_json",
        }
    }

    /// Case-insensitive lookup; unknown names resolve to `url`
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "b64_json" => ImageFormat::B64Json,
            _ => ImageFormat::Url,
        }
    }
}

macro_rules! serde_by_name {
    ($ty:ty) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let name = String::deserialize(deserializer)?;
                Ok(<$ty>::from_name(&name))
            }
        }
    };
}

serde_by_name!(ImageSize);
serde_by_name!(ImageFormat);

/// Options for an image generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// Number of images to generate
    pub images_num: u32,
    pub size: ImageSize,
    pub format: ImageFormat,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            images_num: 1,
            size: ImageSize::default(),
            format: ImageFormat::default(),
        }
    }
}

impl ImageOptions {
    pub fn with_images(mut self, images_num: u32) -> Self {
        self.images_num = images_num.max(1);
        self
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }
}

/// Decoded image generation response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageResponse {
    pub created: i64,
    /// One entry per image: a URL or a base64 payload, per the requested format
    pub data: Vec<String>,
    pub success: bool,
    pub error: Option<ApiError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_and_format_names() {
        assert_eq!(ImageSize::from_name("1024X1024"), ImageSize::X1024);
        assert_eq!(ImageSize::from_name("512x512"), ImageSize::X512);
        assert_eq!(ImageSize::from_name("huge"), ImageSize::X256);
        assert_eq!(ImageFormat::from_name("B64_JSON"), ImageFormat::B64Json);
        assert_eq!(ImageFormat::from_name("png"), ImageFormat::Url);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ImageOptions = serde_json::from_str(r#"{"size": "512x512"}"#).unwrap();
        assert_eq!(options.size, ImageSize::X512);
        assert_eq!(options.images_num, 1);
        assert_eq!(options.format, ImageFormat::Url);
    }
}
