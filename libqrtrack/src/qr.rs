//! Rendering the server's address as a QR code so that a phone can open it
//! with its camera

use crate::Result;
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use std::{io::Cursor, path::Path};
use tracing::debug;

/// Smallest edge length of the rendered image, in pixels
const MIN_DIMENSION: u32 = 256;

/// Encode `url` as a QR code and return it as PNG image data
pub fn render_png(url: &str) -> Result<Vec<u8>> {
    let code = QrCode::new(url.as_bytes())?;
    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .build();
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Encode `url` as a QR code and write it to a PNG file
pub async fn save_png<P: AsRef<Path>>(url: &str, path: P) -> Result<()> {
    let png = render_png(url)?;
    debug!(path = ?path.as_ref(), bytes = png.len(), "Writing QR code");
    tokio::fs::write(path, png).await?;
    Ok(())
}
