//! Still-image encoding of extracted frames.

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

use super::ExtractedFrame;
use crate::error::MediaError;

fn to_image(frame: &ExtractedFrame) -> Result<RgbImage, MediaError> {
    RgbImage::from_raw(frame.width, frame.height, frame.pixel_data.clone()).ok_or_else(|| {
        MediaError::invalid_input(format!(
            "Frame {} has {} bytes, not {}x{} RGB24",
            frame.index,
            frame.pixel_data.len(),
            frame.width,
            frame.height
        ))
    })
}

fn encode_err(e: image::ImageError) -> MediaError {
    MediaError::invalid_input(format!("Image encoding failed: {}", e))
}

/// Encodes a frame as PNG.
pub fn encode_png(frame: &ExtractedFrame) -> Result<Vec<u8>, MediaError> {
    let img = to_image(frame)?;
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).map_err(encode_err)?;
    Ok(buf.into_inner())
}

/// Encodes a frame as JPEG at the given quality (1-100).
pub fn encode_jpeg(frame: &ExtractedFrame, quality: u8) -> Result<Vec<u8>, MediaError> {
    let img = to_image(frame)?;
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(&img)
        .map_err(encode_err)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{placeholder_frames, FrameSize};

    #[test]
    fn test_png_signature() {
        let frame = &placeholder_frames(&[0], FrameSize::new(8, 6), [1, 2, 3])[0];
        let png = encode_png(frame).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_jpeg_signature() {
        let frame = &placeholder_frames(&[0], FrameSize::new(8, 6), [200, 10, 10])[0];
        let jpeg = encode_jpeg(frame, 80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_malformed_frame() {
        let mut frame = placeholder_frames(&[0], FrameSize::new(8, 6), [0, 0, 0]).remove(0);
        frame.pixel_data.truncate(10);
        assert!(encode_png(&frame).is_err());
    }
}
