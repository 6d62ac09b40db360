//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::response::{build_prompt, parse_tag_response};
use super::{InferenceRequest, Tag, TagInference};
use crate::error::MediaError;

/// Gemini client sending frames as inline JPEG parts.
pub struct GeminiInference {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    timeout: Duration,
}

impl GeminiInference {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            timeout,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn build_request(request: &InferenceRequest) -> GeminiRequest {
        let mut parts = vec![GeminiPart::Text {
            text: build_prompt(request),
        }];
        parts.extend(request.frames.iter().map(|f| GeminiPart::InlineData {
            inline_data: GeminiBlob {
                mime_type: "image/jpeg".to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(&f.jpeg),
            },
        }));

        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json".to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: GeminiBlob },
}

#[derive(Debug, Serialize)]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Concatenated text of the first candidate.
fn response_text(response: GeminiResponse) -> Result<String, MediaError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::invalid_input("Gemini returned no candidates (prompt blocked)"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(MediaError::invalid_input(format!(
            "Gemini returned no text (finish reason {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }
    Ok(text)
}

#[async_trait]
impl TagInference for GeminiInference {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<Vec<Tag>, MediaError> {
        let body = Self::build_request(request);

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.api_base, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| MediaError::from_reqwest(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(MediaError::from_response(response).await);
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| MediaError::from_reqwest(e, self.timeout))?;

        parse_tag_response(&response_text(parsed)?, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagging::EncodedFrame;

    #[test]
    fn test_request_shape() {
        let request = InferenceRequest {
            frames: vec![EncodedFrame {
                timestamp_ms: 0,
                jpeg: vec![0xFF, 0xD8, 0xFF],
            }],
            transcript_excerpt: "hello".to_string(),
            max_tags: 4,
        };
        let json = serde_json::to_value(GeminiInference::build_request(&request)).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("hello"));
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "/9j/");
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_response_text() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "{\"tags\": []}"}]}, "finishReason": "STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(response).unwrap(), "{\"tags\": []}");
    }

    #[test]
    fn test_blocked_prompt_is_invalid_input() {
        let response: GeminiResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let err = response_text(response).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }
}
