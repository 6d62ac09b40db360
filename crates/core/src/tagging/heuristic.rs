//! Cheap local tags used when no inference service answers.

use super::{Tag, HEURISTIC_CONFIDENCE, HEURISTIC_METHOD};
use crate::frames::ExtractedFrame;
use crate::transcript::TranscriptSegment;

const DARK_LUMA: f64 = 70.0;
const BRIGHT_LUMA: f64 = 180.0;
/// Mean absolute per-channel difference between consecutive frames.
const MOTION_THRESHOLD: f64 = 12.0;

/// Derives a small fixed vocabulary of tags from local signals.
///
/// Always returns at least `video` plus a speech tag.
pub fn heuristic_tags(frames: &[ExtractedFrame], transcript: &[TranscriptSegment]) -> Vec<Tag> {
    let tag = |label: &str| Tag::new(label, HEURISTIC_CONFIDENCE, HEURISTIC_METHOD);

    let mut tags = vec![tag("video")];
    tags.push(tag(if transcript.is_empty() {
        "no-speech"
    } else {
        "speech"
    }));

    let real: Vec<&ExtractedFrame> = frames
        .iter()
        .filter(|f| !f.is_placeholder() && !f.pixel_data.is_empty())
        .collect();

    if real.is_empty() {
        tags.push(tag("visuals-unavailable"));
        return tags;
    }

    let lumas: Vec<f64> = real.iter().filter_map(|f| f.mean_luma()).collect();
    if !lumas.is_empty() {
        let mean = lumas.iter().sum::<f64>() / lumas.len() as f64;
        tags.push(tag(if mean < DARK_LUMA {
            "dark"
        } else if mean > BRIGHT_LUMA {
            "bright"
        } else {
            "balanced"
        }));
    }

    if let Some(motion) = mean_motion(&real) {
        tags.push(tag(if motion < MOTION_THRESHOLD {
            "static"
        } else {
            "dynamic"
        }));
    }

    tags
}

/// Average difference over consecutive same-sized frame pairs.
fn mean_motion(frames: &[&ExtractedFrame]) -> Option<f64> {
    let diffs: Vec<f64> = frames
        .windows(2)
        .filter(|w| w[0].pixel_data.len() == w[1].pixel_data.len())
        .map(|w| {
            let total: u64 = w[0]
                .pixel_data
                .iter()
                .zip(&w[1].pixel_data)
                .map(|(a, b)| a.abs_diff(*b) as u64)
                .sum();
            total as f64 / w[0].pixel_data.len() as f64
        })
        .collect();

    if diffs.is_empty() {
        None
    } else {
        Some(diffs.iter().sum::<f64>() / diffs.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{placeholder_frames, FrameSize, RawFrame};

    fn solid(index: usize, value: u8) -> ExtractedFrame {
        ExtractedFrame::from_raw(
            index,
            index as u64 * 1000,
            RawFrame {
                width: 2,
                height: 2,
                data: vec![value; 12],
            },
            "ffmpeg",
        )
    }

    fn labels(tags: &[Tag]) -> Vec<&str> {
        tags.iter().map(|t| t.label.as_str()).collect()
    }

    #[test]
    fn test_placeholders_only() {
        let frames = placeholder_frames(&[0, 1000], FrameSize::new(2, 2), [64, 64, 64]);
        let tags = heuristic_tags(&frames, &[]);
        assert_eq!(labels(&tags), vec!["video", "no-speech", "visuals-unavailable"]);
        assert!(tags.iter().all(|t| t.confidence == HEURISTIC_CONFIDENCE));
        assert!(tags.iter().all(Tag::is_heuristic));
    }

    #[test]
    fn test_dark_static_with_speech() {
        let frames = vec![solid(0, 10), solid(1, 12)];
        let transcript = vec![TranscriptSegment::new("hi", 0, 100, 0.9)];
        let tags = heuristic_tags(&frames, &transcript);
        assert_eq!(labels(&tags), vec!["video", "speech", "dark", "static"]);
    }

    #[test]
    fn test_bright_dynamic() {
        let frames = vec![solid(0, 250), solid(1, 150), solid(2, 250)];
        let tags = heuristic_tags(&frames, &[]);
        assert_eq!(labels(&tags), vec!["video", "no-speech", "bright", "dynamic"]);
    }

    #[test]
    fn test_single_frame_has_no_motion_tag() {
        let tags = heuristic_tags(&[solid(0, 128)], &[]);
        assert_eq!(labels(&tags), vec!["video", "no-speech", "balanced"]);
    }
}
