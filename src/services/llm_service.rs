// src/services/llm_service.rs
use crate::config::{MAX_OUTPUT_TOKENS, VISION_MODEL};
use crate::errors::StyleLensError;
use crate::services::image_processor::PreparedImage;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::time::Instant;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One model call: images first, then the prompt. Returns the reply's single text block.
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn complete(
        &self,
        images: &[PreparedImage],
        prompt: &str,
    ) -> Result<String, StyleLensError>;
}

pub struct AnthropicVisionClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl AnthropicVisionClient {
    pub fn new(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            client: Client::new(),
        }
    }
}

/// Builds the messages body: image blocks in order followed by exactly one text block.
pub fn build_request_body(images: &[PreparedImage], prompt: &str) -> Value {
    let mut content: Vec<Value> = images
        .iter()
        .map(|image| {
            json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.media_type,
                    "data": image.data
                }
            })
        })
        .collect();
    content.push(json!({
        "type": "text",
        "text": prompt
    }));

    json!({
        "model": VISION_MODEL,
        "max_tokens": MAX_OUTPUT_TOKENS,
        "messages": [{
            "role": "user",
            "content": content
        }]
    })
}

/// Pulls the only text block out of a messages response.
pub fn extract_text(result: &Value) -> Result<String, StyleLensError> {
    let texts: Vec<&str> = result["content"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter(|block| block["type"] == "text")
                .filter_map(|block| block["text"].as_str())
                .collect()
        })
        .unwrap_or_default();

    match texts.as_slice() {
        [text] => Ok(text.to_string()),
        other => Err(StyleLensError::MissingTextBlock(other.len())),
    }
}

#[async_trait]
impl VisionClient for AnthropicVisionClient {
    async fn complete(
        &self,
        images: &[PreparedImage],
        prompt: &str,
    ) -> Result<String, StyleLensError> {
        let start = Instant::now();

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&build_request_body(images, prompt))
            .send()
            .await
            .map_err(StyleLensError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                StyleLensError::RateLimited(error_text)
            } else {
                StyleLensError::Api {
                    status: status.as_u16(),
                    body: error_text,
                }
            });
        }

        let result: Value = response.json().await.map_err(|e| {
            if e.is_decode() {
                StyleLensError::malformed(format!("Failed to parse Anthropic response: {}", e))
            } else {
                StyleLensError::Transport(e)
            }
        })?;

        debug!(
            "Vision call with {} image(s) took {} ms",
            images.len(),
            start.elapsed().as_millis()
        );

        extract_text(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_precede_the_single_text_block() {
        let images = vec![
            PreparedImage {
                media_type: "image/jpeg",
                data: "first".into(),
            },
            PreparedImage {
                media_type: "image/jpeg",
                data: "second".into(),
            },
        ];
        let body = build_request_body(&images, "style me");
        let content = body["messages"][0]["content"].as_array().unwrap();

        assert_eq!(body["model"], VISION_MODEL);
        assert_eq!(body["max_tokens"], MAX_OUTPUT_TOKENS);
        assert_eq!(content.len(), 3);
        assert_eq!(content[0]["source"]["data"], "first");
        assert_eq!(content[1]["source"]["data"], "second");
        assert_eq!(content[2], json!({"type": "text", "text": "style me"}));
    }

    #[test]
    fn text_only_request_has_one_block() {
        let body = build_request_body(&[], "outfit please");
        assert_eq!(body["messages"][0]["content"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn reply_must_contain_exactly_one_text_block() {
        let ok = json!({"content": [{"type": "text", "text": "{\"analysis\": \"hi\"}"}]});
        assert_eq!(extract_text(&ok).unwrap(), "{\"analysis\": \"hi\"}");

        let none = json!({"content": [{"type": "tool_use", "id": "x"}]});
        assert!(matches!(
            extract_text(&none),
            Err(StyleLensError::MissingTextBlock(0))
        ));

        let two = json!({"content": [
            {"type": "text", "text": "a"},
            {"type": "text", "text": "b"}
        ]});
        assert!(matches!(
            extract_text(&two),
            Err(StyleLensError::MissingTextBlock(2))
        ));

        assert!(extract_text(&json!({})).is_err());
    }
}
