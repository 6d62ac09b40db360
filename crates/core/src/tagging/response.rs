//! Prompt construction and response handling shared by inference providers.

use serde::Deserialize;
use std::collections::HashMap;

use super::{InferenceRequest, Tag};
use crate::error::MediaError;

/// Instruction sent with every inference request.
pub(crate) fn build_prompt(request: &InferenceRequest) -> String {
    let mut prompt = format!(
        "You are tagging a video for search. You are given {} still frame(s) sampled \
         evenly across the video and an excerpt of its speech transcript.\n\
         Return at most {} short lowercase tags describing the subjects, setting, \
         activities and mood.\n\
         Respond with JSON only, in the form \
         {{\"tags\": [{{\"label\": \"beach\", \"confidence\": 0.9}}]}}, \
         confidence between 0 and 1.\n",
        request.frames.len(),
        request.max_tags
    );
    let excerpt = request.transcript_excerpt.trim();
    if excerpt.is_empty() {
        prompt.push_str("\nThe video has no recognised speech.\n");
    } else {
        prompt.push_str("\nTranscript excerpt:\n");
        prompt.push_str(excerpt);
        prompt.push('\n');
    }
    prompt
}

#[derive(Debug, Deserialize)]
struct TagResponse {
    #[serde(default)]
    tags: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    label: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// The outermost JSON object in model output, dropping any prose or code
/// fence around it.
fn extract_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

/// Parses `{"tags": [{"label", "confidence"}]}` from model output.
pub(crate) fn parse_tag_response(text: &str, source_method: &str) -> Result<Vec<Tag>, MediaError> {
    let json = extract_json_object(text);
    let parsed: TagResponse = serde_json::from_str(json).map_err(|e| {
        // Retryable: garbled output rarely repeats.
        MediaError::transient(format!("Unparseable tag response: {}", e))
    })?;

    Ok(parsed
        .tags
        .into_iter()
        .map(|t| Tag::new(t.label, t.confidence.unwrap_or(0.5), source_method))
        .collect())
}

/// Trims, lower-cases and deduplicates labels (highest confidence wins),
/// clamps confidence to [0, 1], sorts by confidence and keeps `max_tags`.
pub fn normalize_tags(tags: Vec<Tag>, max_tags: usize) -> Vec<Tag> {
    let mut best: HashMap<String, Tag> = HashMap::new();
    for mut tag in tags {
        let label = tag.label.trim().to_lowercase();
        if label.is_empty() {
            continue;
        }
        tag.label = label;
        tag.confidence = if tag.confidence.is_finite() {
            tag.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        match best.get(&tag.label) {
            Some(existing) if existing.confidence >= tag.confidence => {}
            _ => {
                best.insert(tag.label.clone(), tag);
            }
        }
    }

    let mut tags: Vec<Tag> = best.into_values().collect();
    tags.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.label.cmp(&b.label))
    });
    tags.truncate(max_tags);
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object("```json\n{\"tags\": []}\n```"), "{\"tags\": []}");
        assert_eq!(extract_json_object("```\n{}\n```\n"), "{}");
        assert_eq!(extract_json_object("  {\"tags\": []} "), "{\"tags\": []}");
        assert_eq!(
            extract_json_object("Here are the tags: {\"tags\": []} Hope that helps!"),
            "{\"tags\": []}"
        );
        assert_eq!(extract_json_object(" no json "), "no json");
    }

    #[test]
    fn test_parse_tags_wrapped_in_prose() {
        let text = "Sure! Here are the tags: {\"tags\": [{\"label\": \"surfing\", \"confidence\": 0.8}]}";
        let tags = parse_tag_response(text, "anthropic").unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].label, "surfing");
    }

    #[test]
    fn test_parse_tag_response() {
        let text = "```json\n{\"tags\": [{\"label\": \"Beach\", \"confidence\": 0.92}, {\"label\": \"sunset\"}]}\n```";
        let tags = parse_tag_response(text, "gemini").unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].label, "Beach");
        assert_eq!(tags[1].confidence, 0.5);
        assert!(tags.iter().all(|t| t.source_method == "gemini"));
    }

    #[test]
    fn test_parse_garbage_is_retryable() {
        let err = parse_tag_response("I think this video shows a cat.", "gemini").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            Tag::new(" Beach ", 0.7, "gemini"),
            Tag::new("beach", 0.9, "gemini"),
            Tag::new("dog", 1.4, "gemini"),
            Tag::new("", 0.9, "gemini"),
            Tag::new("sky", f32::NAN, "gemini"),
            Tag::new("people", 0.4, "gemini"),
        ];
        let normalized = normalize_tags(tags, 3);
        let labels: Vec<_> = normalized.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["dog", "beach", "people"]);
        assert_eq!(normalized[0].confidence, 1.0);
        assert_eq!(normalized[1].confidence, 0.9);
    }

    #[test]
    fn test_prompt_mentions_transcript() {
        let request = InferenceRequest {
            frames: vec![],
            transcript_excerpt: "welcome to the cooking show".to_string(),
            max_tags: 5,
        };
        let prompt = build_prompt(&request);
        assert!(prompt.contains("at most 5"));
        assert!(prompt.contains("welcome to the cooking show"));
    }
}
