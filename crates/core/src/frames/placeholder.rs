//! Solid-color placeholder frames, the last resort of the extraction chain.

use super::{ExtractedFrame, FrameSize, PLACEHOLDER_METHOD};

/// Synthesizes one placeholder per timestamp.
pub fn placeholder_frames(timestamps: &[u64], size: FrameSize, rgb: [u8; 3]) -> Vec<ExtractedFrame> {
    let pixels: Vec<u8> = rgb
        .iter()
        .copied()
        .cycle()
        .take(size.rgb24_len())
        .collect();

    timestamps
        .iter()
        .enumerate()
        .map(|(index, &timestamp_ms)| ExtractedFrame {
            index,
            timestamp_ms,
            width: size.width,
            height: size.height,
            pixel_data: pixels.clone(),
            source_method: PLACEHOLDER_METHOD.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        let frames = placeholder_frames(&[0, 1000, 2000], FrameSize::new(4, 2), [10, 20, 30]);
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(ExtractedFrame::is_placeholder));
        assert_eq!(frames[2].index, 2);
        assert_eq!(frames[2].timestamp_ms, 2000);
        assert_eq!(frames[0].pixel_data.len(), 24);
        assert_eq!(&frames[0].pixel_data[3..6], &[10, 20, 30]);
    }
}
