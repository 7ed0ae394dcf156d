//! QR encoding of the share link

use image::{Rgba, RgbaImage};
use qrcode::{Color, QrCode};

use crate::{Error, Result};

/// Pixels per QR module
const MODULE_PX: u32 = 8;

/// Quiet-zone width in modules
const QUIET_MODULES: u32 = 4;

/// Render a URL as a QR image with a white quiet zone
///
/// # Errors
///
/// Returns error if the data does not fit in a QR code
pub fn encode(url: &str) -> Result<RgbaImage> {
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| Error::Canvas(format!("QR encoding failed: {e}")))?;

    let modules = code.width() as u32;
    let colors = code.to_colors();
    let side = (modules + QUIET_MODULES * 2) * MODULE_PX;

    let white = Rgba([255, 255, 255, 255]);
    let black = Rgba([0, 0, 0, 255]);

    let mut img = RgbaImage::from_pixel(side, side, white);
    for (index, color) in colors.iter().enumerate() {
        if *color == Color::Dark {
            let index = index as u32;
            let mx = (index % modules + QUIET_MODULES) * MODULE_PX;
            let my = (index / modules + QUIET_MODULES) * MODULE_PX;
            for dy in 0..MODULE_PX {
                for dx in 0..MODULE_PX {
                    img.put_pixel(mx + dx, my + dy, black);
                }
            }
        }
    }

    Ok(img)
}
