//! Raster encoding for previews and for embedding into output PDFs.
//!
//! Thumbnails and previews are JPEG: they are only looked at, and JPEG keeps
//! a gallery of several hundred pages small. Fallback pages are the opposite
//! case. They become the document content, so their pixels are stored
//! losslessly (zlib/Flate, the same compression PNG uses) as an RGB image
//! XObject, avoiding a second round of lossy artefacts on text.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use serde::{Serialize, Serializer};
use std::io::{Cursor, Write};
use tracing::debug;

/// An encoded raster image and its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// `data:` URL suitable for an `<img src>` attribute.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type {
            "image/png" => "png",
            _ => "jpg",
        }
    }
}

/// Serialises as a data URL so JSON manifests are self-contained.
impl Serialize for EncodedImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

/// Lossy JPEG encode for thumbnails and previews.
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<EncodedImage, image::ImageError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(img)?;
    debug!("Encoded JPEG {}x{} → {} bytes", img.width(), img.height(), buf.len());
    Ok(EncodedImage {
        mime_type: "image/jpeg",
        bytes: buf,
        width: img.width(),
        height: img.height(),
    })
}

/// Lossless PNG encode.
pub fn encode_png(img: &RgbImage) -> Result<EncodedImage, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded PNG {}x{} → {} bytes", img.width(), img.height(), buf.len());
    Ok(EncodedImage {
        mime_type: "image/png",
        bytes: buf,
        width: img.width(),
        height: img.height(),
    })
}

/// zlib-compress raw RGB samples for a `/FlateDecode` image XObject.
pub fn deflate_pixels(img: &RgbImage) -> std::io::Result<Vec<u8>> {
    let raw = img.as_raw();
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(raw.len() / 4), Compression::default());
    encoder.write_all(raw)?;
    encoder.finish()
}
