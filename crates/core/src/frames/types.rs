//! Frame types.

use serde::{Deserialize, Serialize};

/// `source_method` of synthesized frames.
pub const PLACEHOLDER_METHOD: &str = "placeholder";

/// Output dimensions requested from a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of one RGB24 frame of this size.
    pub fn rgb24_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// One decoded RGB24 picture as returned by a decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Packed RGB24, row-major, no padding.
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Whether the buffer length matches the dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == FrameSize::new(self.width, self.height).rgb24_len()
    }
}

/// A representative frame owned by one `ProcessingResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFrame {
    pub index: usize,
    pub timestamp_ms: u64,
    pub width: u32,
    pub height: u32,
    /// Packed RGB24 pixels; not part of the JSON form.
    #[serde(skip)]
    pub pixel_data: Vec<u8>,
    /// Strategy that produced the frame ("ffmpeg", "libav", "placeholder", ...).
    pub source_method: String,
}

impl ExtractedFrame {
    pub fn from_raw(index: usize, timestamp_ms: u64, raw: RawFrame, source_method: &str) -> Self {
        Self {
            index,
            timestamp_ms,
            width: raw.width,
            height: raw.height,
            pixel_data: raw.data,
            source_method: source_method.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source_method == PLACEHOLDER_METHOD
    }

    /// Average Rec. 601 luma in [0, 255], if pixels are present.
    pub fn mean_luma(&self) -> Option<f64> {
        if self.pixel_data.len() < 3 {
            return None;
        }
        let (sum, count) = self
            .pixel_data
            .chunks_exact(3)
            .fold((0.0f64, 0usize), |(sum, count), px| {
                let luma = 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64;
                (sum + luma, count + 1)
            });
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed() {
        let raw = RawFrame {
            width: 2,
            height: 2,
            data: vec![0; 12],
        };
        assert!(raw.is_well_formed());

        let short = RawFrame {
            width: 2,
            height: 2,
            data: vec![0; 11],
        };
        assert!(!short.is_well_formed());
    }

    #[test]
    fn test_mean_luma() {
        let white = ExtractedFrame::from_raw(
            0,
            0,
            RawFrame {
                width: 1,
                height: 2,
                data: vec![255; 6],
            },
            "ffmpeg",
        );
        assert!((white.mean_luma().unwrap() - 255.0).abs() < 1e-6);
        assert!(!white.is_placeholder());

        let mut empty = white.clone();
        empty.pixel_data.clear();
        assert_eq!(empty.mean_luma(), None);
    }

    #[test]
    fn test_pixels_not_serialized() {
        let frame = ExtractedFrame::from_raw(
            3,
            1500,
            RawFrame {
                width: 1,
                height: 1,
                data: vec![1, 2, 3],
            },
            PLACEHOLDER_METHOD,
        );
        let json = serde_json::to_value(&frame).unwrap();
        assert!(json.get("pixel_data").is_none());
        assert_eq!(json["source_method"], "placeholder");
        assert_eq!(json["timestamp_ms"], 1500);
    }
}
