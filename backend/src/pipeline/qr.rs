//! QR code rendering for contact links.
//!
//! The image is drawn module by module into an RGBA buffer and written with
//! the `png` encoder, so identical input and options give identical bytes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{Rgba, RgbaImage};
use png::{BitDepth as PngBitDepth, ColorType as PngColorType, Encoder as PngEncoder};
use qrcode::types::QrError as QrEncodeError;
use qrcode::{Color, EcLevel, QrCode};
use std::str::FromStr;
use thiserror::Error;

pub const DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcLevelSetting {
    L,
    M,
    Q,
    H,
}

impl EcLevelSetting {
    fn level(self) -> EcLevel {
        match self {
            EcLevelSetting::L => EcLevel::L,
            EcLevelSetting::M => EcLevel::M,
            EcLevelSetting::Q => EcLevel::Q,
            EcLevelSetting::H => EcLevel::H,
        }
    }
}

impl FromStr for EcLevelSetting {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "L" => Ok(EcLevelSetting::L),
            "M" => Ok(EcLevelSetting::M),
            "Q" => Ok(EcLevelSetting::Q),
            "H" => Ok(EcLevelSetting::H),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrOptions {
    pub error_correction: EcLevelSetting,
    /// Target image side in pixels; the actual side is the largest whole
    /// multiple of the module count that fits (at least one pixel per module).
    pub width: u32,
    /// Quiet zone around the code, in modules.
    pub margin: u32,
    /// RGBA color of dark modules.
    pub dark: [u8; 4],
    /// RGBA color of light modules and the margin.
    pub light: [u8; 4],
}

impl Default for QrOptions {
    /// White modules on a transparent background.
    fn default() -> Self {
        QrOptions {
            error_correction: EcLevelSetting::M,
            width: 300,
            margin: 1,
            dark: [0xFF, 0xFF, 0xFF, 0xFF],
            light: [0x00, 0x00, 0x00, 0x00],
        }
    }
}

#[derive(Debug, Error)]
pub enum QrError {
    #[error("QR encoding failed: {0}")]
    Encode(#[from] QrEncodeError),

    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
}

/// Public page of a contact: `<base>/contact/<contact_id>`.
pub fn contact_url(base_url: &str, contact_id: &str) -> String {
    format!("{}/contact/{}", base_url.trim_end_matches('/'), contact_id)
}

/// Parses `#RRGGBB` or `#RRGGBBAA` (the `#` is optional).
pub fn parse_color(value: &str) -> Option<[u8; 4]> {
    let hex = value.trim().trim_start_matches('#');
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return None;
    }
    let mut rgba = [0xFF; 4];
    for (i, slot) in rgba.iter_mut().take(hex.len() / 2).enumerate() {
        *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(rgba)
}

pub fn render(target: &str, options: &QrOptions) -> Result<RgbaImage, QrError> {
    let code = QrCode::with_error_correction_level(target.as_bytes(), options.error_correction.level())?;
    let modules = code.width() as u32;
    let span = modules + 2 * options.margin;
    let scale = (options.width / span).max(1);
    let side = span * scale;

    let dark = Rgba(options.dark);
    let mut img = RgbaImage::from_pixel(side, side, Rgba(options.light));
    for (i, color) in code.to_colors().iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let i = i as u32;
        let x0 = (i % modules + options.margin) * scale;
        let y0 = (i / modules + options.margin) * scale;
        for y in y0..y0 + scale {
            for x in x0..x0 + scale {
                img.put_pixel(x, y, dark);
            }
        }
    }
    Ok(img)
}

pub fn encode_png(target: &str, options: &QrOptions) -> Result<Vec<u8>, QrError> {
    let img = render(target, options)?;
    let (w, h) = img.dimensions();
    let mut out = Vec::new();
    {
        let mut encoder = PngEncoder::new(&mut out, w, h);
        encoder.set_color(PngColorType::Rgba);
        encoder.set_depth(PngBitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(img.as_raw())?;
        writer.finish()?;
    }
    Ok(out)
}

/// The PNG as a `data:image/png;base64,...` URL, the form stored on contacts.
pub fn encode_data_url(target: &str, options: &QrOptions) -> Result<String, QrError> {
    let png = encode_png(target, options)?;
    Ok(format!("{}{}", DATA_URL_PREFIX, BASE64.encode(png)))
}

/// PNG bytes back out of a stored data URL; `None` if it is not one.
pub fn decode_data_url(data_url: &str) -> Option<Vec<u8>> {
    let payload = data_url.strip_prefix(DATA_URL_PREFIX)?;
    BASE64.decode(payload).ok().filter(|png| !png.is_empty())
}
