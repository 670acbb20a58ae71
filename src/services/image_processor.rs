// src/services/image_processor.rs
use crate::errors::StyleLensError;
use crate::models::ImageInput;
use crate::services::redis_service::ImageStore;
use base64::{Engine as _, engine::general_purpose};
use futures_util::future::join_all;
use image::{GenericImageView, ImageOutputFormat};
use log::{debug, warn};
use std::sync::Arc;

/// Longest side sent to the model after downsizing.
pub const MAX_DIMENSION: u32 = 1568;
/// Inputs larger than this on either side are rejected outright.
pub const MAX_INPUT_DIMENSION: u32 = 8192;
pub const JPEG_QUALITY: u8 = 85;

/// A base64 JPEG ready to be placed in an image content block.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    pub media_type: &'static str,
    pub data: String,
}

pub struct ImageProcessor {
    store: Option<Arc<dyn ImageStore>>,
    max_dimension: u32,
    max_input_dimension: u32,
}

impl ImageProcessor {
    pub fn new() -> Self {
        Self {
            store: None,
            max_dimension: MAX_DIMENSION,
            max_input_dimension: MAX_INPUT_DIMENSION,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Prepares every input concurrently. Inputs that fail are logged and dropped;
    /// survivors keep their relative order.
    pub async fn prepare_all(&self, inputs: &[ImageInput]) -> Vec<PreparedImage> {
        let results = join_all(inputs.iter().map(|input| self.prepare(input))).await;

        results
            .into_iter()
            .enumerate()
            .filter_map(|(index, result)| match result {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("Dropping image {}: {}", index, e);
                    None
                }
            })
            .collect()
    }

    pub async fn prepare(&self, input: &ImageInput) -> Result<PreparedImage, StyleLensError> {
        let raw = match input {
            ImageInput::Encoded { data } => {
                if data.trim().is_empty() {
                    return Err(StyleLensError::ImageProcessing(
                        "Empty encoded image payload".to_string(),
                    ));
                }
                return Ok(PreparedImage {
                    media_type: "image/jpeg",
                    data: data.clone(),
                });
            }
            ImageInput::Bytes(bytes) => bytes.to_vec(),
            ImageInput::File { path } => tokio::fs::read(path).await.map_err(|e| {
                StyleLensError::ImageProcessing(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ))
            })?,
            ImageInput::Upload { id } => {
                let store = self.store.as_ref().ok_or_else(|| {
                    StyleLensError::ImageProcessing("No upload store configured".to_string())
                })?;
                store.fetch_image(id).await?.ok_or_else(|| {
                    StyleLensError::ImageProcessing(format!("Upload {} not found", id))
                })?
            }
        };

        let max_dimension = self.max_dimension;
        let max_input_dimension = self.max_input_dimension;
        let jpeg = tokio::task::spawn_blocking(move || {
            normalize_image(&raw, max_dimension, max_input_dimension)
        })
        .await
        .map_err(|e| StyleLensError::ImageProcessing(format!("Image task failed: {}", e)))??;

        Ok(PreparedImage {
            media_type: "image/jpeg",
            data: general_purpose::STANDARD.encode(jpeg),
        })
    }

    pub fn validate_image(&self, data: &[u8]) -> Result<(u32, u32), StyleLensError> {
        let img = image::load_from_memory(data).map_err(|e| {
            StyleLensError::ImageProcessing(format!("Invalid image format: {}", e))
        })?;
        check_dimensions(img.dimensions(), self.max_input_dimension)
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn check_dimensions(
    (width, height): (u32, u32),
    max_input_dimension: u32,
) -> Result<(u32, u32), StyleLensError> {
    if width == 0 || height == 0 {
        return Err(StyleLensError::ImageProcessing(
            "Image has zero width or height".to_string(),
        ));
    }
    if width > max_input_dimension || height > max_input_dimension {
        return Err(StyleLensError::ImageProcessing(format!(
            "Image dimensions exceed {}x{}",
            max_input_dimension, max_input_dimension
        )));
    }
    Ok((width, height))
}

/// Decodes, bounds, downsizes and re-encodes one image as JPEG.
fn normalize_image(
    data: &[u8],
    max_dimension: u32,
    max_input_dimension: u32,
) -> Result<Vec<u8>, StyleLensError> {
    let img = image::load_from_memory(data)
        .map_err(|e| StyleLensError::ImageProcessing(format!("Failed to load image: {}", e)))?;

    let (width, height) = check_dimensions(img.dimensions(), max_input_dimension)?;

    let img = if width > max_dimension || height > max_dimension {
        debug!(
            "Downsizing {}x{} image to fit {}px",
            width, height, max_dimension
        );
        img.resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Lanczos3,
        )
    } else {
        img
    };

    let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());
    let mut output = Vec::new();
    rgb.write_to(
        &mut std::io::Cursor::new(&mut output),
        ImageOutputFormat::Jpeg(JPEG_QUALITY),
    )
    .map_err(|e| StyleLensError::ImageProcessing(format!("Failed to encode image: {}", e)))?;

    Ok(output)
}
