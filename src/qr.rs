use std::io::Cursor;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;

const MIN_DIMENSION: u32 = 256;

/// Renders `url` as a black-on-white QR code and encodes it as PNG.
pub fn encode_url_as_png(url: &str) -> Result<Vec<u8>> {
    let code = QrCode::new(url.as_bytes()).context("failed to encode url as QR code")?;
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .build();

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .context("failed to encode QR code as PNG")?;
    Ok(buffer.into_inner())
}
