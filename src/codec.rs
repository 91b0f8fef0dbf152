//! Image inputs and their PNG encoding.
//!
//! Uploads always send PNG bytes. Whatever the host hands over (a file, an
//! already-encoded buffer, a raw RGB frame) goes through [`PngSource`].

use base64::Engine;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::PathBuf;

use crate::error::{ViduError, ViduResult};

pub trait PngSource {
    fn to_png(&self) -> ViduResult<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub enum ImageInput {
    /// Image file on local disk, any format the decoder understands.
    File(PathBuf),
    /// Encoded image bytes (PNG, JPEG).
    Encoded(Vec<u8>),
    /// Raw RGB8 pixels, row-major.
    Rgb {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
}

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

impl ImageInput {
    /// Parse a host reference: a `data:<mime>;base64,<payload>` URI or a local path.
    pub fn from_reference(reference: &str) -> ViduResult<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ViduError::validation("empty image reference"));
        }
        if let Some(rest) = reference.strip_prefix("data:") {
            let (_, payload) = rest
                .split_once(";base64,")
                .ok_or_else(|| ViduError::validation("data URI must be base64 encoded"))?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(payload.trim())
                .map_err(|e| ViduError::validation(format!("invalid base64 image data: {e}")))?;
            return Ok(ImageInput::Encoded(bytes));
        }
        Ok(ImageInput::File(PathBuf::from(reference)))
    }
}

impl PngSource for ImageInput {
    fn to_png(&self) -> ViduResult<Vec<u8>> {
        match self {
            ImageInput::File(path) => {
                let bytes = std::fs::read(path).map_err(|e| {
                    ViduError::validation(format!("cannot read image {}: {e}", path.display()))
                })?;
                encode_png(&bytes)
            }
            ImageInput::Encoded(bytes) => encode_png(bytes),
            ImageInput::Rgb {
                width,
                height,
                pixels,
            } => {
                let img = RgbImage::from_raw(*width, *height, pixels.clone()).ok_or_else(|| {
                    ViduError::validation(format!(
                        "RGB buffer of {} bytes does not match {width}x{height}",
                        pixels.len()
                    ))
                })?;
                write_png(&image::DynamicImage::ImageRgb8(img))
            }
        }
    }
}

fn encode_png(bytes: &[u8]) -> ViduResult<Vec<u8>> {
    if bytes.starts_with(PNG_MAGIC) {
        return Ok(bytes.to_vec());
    }
    let img = image::load_from_memory(bytes)
        .map_err(|e| ViduError::validation(format!("cannot decode image: {e}")))?;
    write_png(&img)
}

fn write_png(img: &image::DynamicImage) -> ViduResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ViduError::validation(format!("cannot encode PNG: {e}")))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_frame_encodes_to_png() {
        let input = ImageInput::Rgb {
            width: 2,
            height: 1,
            pixels: vec![255, 0, 0, 0, 255, 0],
        };
        let png = input.to_png().unwrap();
        assert!(png.starts_with(PNG_MAGIC));
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 2);
        assert_eq!(decoded.height(), 1);
    }

    #[test]
    fn rgb_buffer_size_mismatch_is_rejected() {
        let input = ImageInput::Rgb {
            width: 4,
            height: 4,
            pixels: vec![0; 3],
        };
        assert!(matches!(input.to_png(), Err(ViduError::Validation(_))));
    }

    #[test]
    fn png_bytes_pass_through_unchanged() {
        let png = ImageInput::Rgb {
            width: 1,
            height: 1,
            pixels: vec![1, 2, 3],
        }
        .to_png()
        .unwrap();
        let again = ImageInput::Encoded(png.clone()).to_png().unwrap();
        assert_eq!(png, again);
    }

    #[test]
    fn data_uri_is_decoded() {
        let png = ImageInput::Rgb {
            width: 1,
            height: 1,
            pixels: vec![9, 9, 9],
        }
        .to_png()
        .unwrap();
        let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
        let input = ImageInput::from_reference(&format!("data:image/png;base64,{b64}")).unwrap();
        match input {
            ImageInput::Encoded(bytes) => assert_eq!(bytes, png),
            other => panic!("expected Encoded, got {other:?}"),
        }
    }

    #[test]
    fn plain_reference_is_a_file_path() {
        let input = ImageInput::from_reference("/tmp/frame.png").unwrap();
        assert!(matches!(input, ImageInput::File(p) if p == PathBuf::from("/tmp/frame.png")));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = ImageInput::Encoded(b"not an image".to_vec()).to_png().unwrap_err();
        assert!(matches!(err, ViduError::Validation(_)));
    }
}
