//! PNG thumbnails for preset images

use image::imageops::FilterType;
use image::ImageFormat;
use std::io::Cursor;
use tracing::{debug, warn};

use crate::constants::thumbnail::WIDTH;
use crate::model::ImageDraft;

/// Scale an image to [`WIDTH`] pixels wide, keeping its aspect ratio, and
/// encode it as PNG. Returns `None` for bytes that are not a decodable image.
pub fn generate(bytes: &[u8]) -> Option<Vec<u8>> {
    let image = match image::load_from_memory(bytes) {
        Ok(image) => image,
        Err(e) => {
            warn!(error = %e, bytes = bytes.len(), "Cannot decode image, storing it without a thumbnail");
            return None;
        }
    };

    let (width, height) = (image.width().max(1), image.height());
    let scaled_height = (u64::from(height) * u64::from(WIDTH) / u64::from(width)).max(1);
    let scaled_height = u32::try_from(scaled_height).unwrap_or(u32::MAX);
    let thumbnail = image.resize_exact(WIDTH, scaled_height, FilterType::Triangle);

    let mut encoded = Cursor::new(Vec::new());
    if let Err(e) = thumbnail.write_to(&mut encoded, ImageFormat::Png) {
        warn!(error = %e, "Failed to encode thumbnail");
        return None;
    }
    debug!(width = WIDTH, height = scaled_height, "Generated thumbnail");
    Some(encoded.into_inner())
}

/// Image draft with its thumbnail filled in
pub fn image_draft(bytes: Vec<u8>) -> ImageDraft {
    let thumbnail = generate(&bytes);
    ImageDraft { bytes, thumbnail }
}
