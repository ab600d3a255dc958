//! Recipe image upload helpers.
//!
//! Uploads are decoded before anything is written, so a payload that is not a
//! JPEG, PNG or WebP image never reaches the media directory.

use std::{io::Cursor, path::Path};

use bytes::BufMut;
use futures_util::TryStreamExt;
use image::{ImageFormat, ImageReader, Limits};
use uuid::Uuid;
use warp::multipart::FormData;

use crate::{
    constants::{
        INVALID_IMAGE, MAX_IMAGE_DECODE_BYTES, MAX_IMAGE_DIMENSION, MISSING_IMAGE,
        RECIPE_IMAGE_DIR,
    },
    database::error::{ApiError, FieldErrors},
};

pub const IMAGE_FIELD: &str = "image";

const SUPPORTED_FORMATS: &[(ImageFormat, &str)] = &[
    (ImageFormat::Jpeg, "jpg"),
    (ImageFormat::Png, "png"),
    (ImageFormat::WebP, "webp"),
];

/// Reads the bytes of the `image` part, skipping every other part.
pub async fn read_image_field(form: FormData) -> Result<Vec<u8>, ApiError> {
    let mut form = Box::pin(form);

    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart request: {e}")))?
    {
        if part.name() != IMAGE_FIELD {
            continue;
        }

        let data = part
            .stream()
            .try_fold(Vec::new(), |mut acc, buf| async move {
                acc.put(buf);
                Ok::<_, warp::Error>(acc)
            })
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid multipart request: {e}")))?;

        if data.is_empty() {
            return Err(FieldErrors::single(IMAGE_FIELD, "The submitted file is empty.").into());
        }
        return Ok(data);
    }

    Err(FieldErrors::single(IMAGE_FIELD, MISSING_IMAGE).into())
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits.max_alloc = Some(MAX_IMAGE_DECODE_BYTES);
    limits
}

/// Checks the header dimensions, then decodes within [`decode_limits`].
/// Returns the file extension of the detected format.
pub fn validate_image(data: &[u8]) -> Result<&'static str, FieldErrors> {
    let invalid = || FieldErrors::single(IMAGE_FIELD, INVALID_IMAGE);
    let reader = || ImageReader::new(Cursor::new(data)).with_guessed_format();

    let format = reader()
        .ok()
        .and_then(|reader| reader.format())
        .ok_or_else(invalid)?;
    let extension = SUPPORTED_FORMATS
        .iter()
        .find(|(supported, _)| *supported == format)
        .map(|(_, extension)| *extension)
        .ok_or_else(invalid)?;

    let (width, height) = reader()
        .map_err(|_| invalid())?
        .into_dimensions()
        .map_err(|_| invalid())?;
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        log::debug!("Rejected {width}x{height} {format:?} upload");
        return Err(FieldErrors::single(
            IMAGE_FIELD,
            &format!("Image dimensions may not exceed {MAX_IMAGE_DIMENSION}x{MAX_IMAGE_DIMENSION} pixels."),
        ));
    }

    let mut reader = reader().map_err(|_| invalid())?;
    reader.limits(decode_limits());
    reader.decode().map_err(|e| {
        log::debug!("Rejected {format:?} upload: {e}");
        invalid()
    })?;

    Ok(extension)
}

/// Writes the image under a fresh name and returns its path relative to `media_root`.
pub async fn save_image(
    media_root: &Path,
    data: &[u8],
    extension: &str,
) -> Result<String, ApiError> {
    let relative = format!("{RECIPE_IMAGE_DIR}/{}.{extension}", Uuid::new_v4());
    let path = media_root.join(&relative);

    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(ApiError::internal)?;
    }
    tokio::fs::write(&path, data)
        .await
        .map_err(ApiError::internal)?;

    log::info!("Stored recipe image {relative} ({} bytes)", data.len());
    Ok(relative)
}

pub async fn remove_image(media_root: &Path, relative: &str) {
    if let Err(e) = tokio::fs::remove_file(media_root.join(relative)).await {
        log::warn!("Failed to remove recipe image {relative}: {e}");
    }
}

#[cfg(test)]
pub(crate) fn sample_png() -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image::RgbImage::new(10, 10)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}
