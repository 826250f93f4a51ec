//! Box identity generation: id, scannable payload and QR renderings.
//!
//! Pure and CPU-bound. No I/O, no shared counters; safe to call from any
//! number of threads at once.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, Luma};
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};

use qrbox_core::{ServiceError, new_id};

use crate::model::QrImage;

/// Path segment between the base URL and the box id.
pub const PAYLOAD_PATH: &str = "/box/";

/// Minimum edge length, in pixels, of both renderings.
pub const SYMBOL_PIXELS: u32 = 256;

/// A freshly minted identity. Nothing is persisted yet.
#[derive(Debug, Clone)]
pub struct BoxIdentity {
    pub id: String,
    pub qr_payload: String,
    pub qr_image: QrImage,
}

/// Mint a new id and render its QR payload.
///
/// `base_url` is used exactly as given. On error no identity escapes, so the
/// caller has nothing to clean up.
pub fn generate(base_url: &str) -> Result<BoxIdentity, ServiceError> {
    let id = new_id();
    let qr_payload = payload_url(base_url, &id);
    let qr_image = render(&qr_payload)?;
    Ok(BoxIdentity {
        id,
        qr_payload,
        qr_image,
    })
}

/// `{base_url}/box/{id}`.
pub fn payload_url(base_url: &str, id: &str) -> String {
    format!("{base_url}{PAYLOAD_PATH}{id}")
}

/// Encode `payload` at error-correction level M as a PNG and an SVG symbol.
pub fn render(payload: &str) -> Result<QrImage, ServiceError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| ServiceError::Encoding(format!("cannot encode QR payload: {e}")))?;

    let raster = code
        .render::<Luma<u8>>()
        .min_dimensions(SYMBOL_PIXELS, SYMBOL_PIXELS)
        .build();
    let mut png = Vec::new();
    raster
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ServiceError::Encoding(format!("cannot write QR png: {e}")))?;

    let svg = code
        .render::<svg::Color<'_>>()
        .min_dimensions(SYMBOL_PIXELS, SYMBOL_PIXELS)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(QrImage {
        png_base64: STANDARD.encode(&png),
        svg,
    })
}
