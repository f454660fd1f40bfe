//! Scannable QR image rendering

use image::{DynamicImage, Rgba};
use qrcode::QrCode;
use std::io::Cursor;

/// Maximum edge of the rendered QR image in pixels.
const QR_MAX_DIMENSION_PX: u32 = 300;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("cannot render a QR image for an empty link")]
    EmptyInput,

    #[error("QR encoding failed: {0}")]
    Encoding(String),
}

/// Encodes the deep link into a PNG QR image.
///
/// Deterministic: the same link always yields the same bytes.
pub fn render_png(link: &str) -> Result<Vec<u8>, RenderError> {
    if link.trim().is_empty() {
        return Err(RenderError::EmptyInput);
    }

    let code = QrCode::new(link.as_bytes()).map_err(|e| RenderError::Encoding(e.to_string()))?;

    let qr_image = code
        .render::<Rgba<u8>>()
        .max_dimensions(QR_MAX_DIMENSION_PX, QR_MAX_DIMENSION_PX)
        .build();

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(qr_image)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| RenderError::Encoding(e.to_string()))?;

    Ok(buffer.into_inner())
}
