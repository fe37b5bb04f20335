use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use invoicelens_contracts::config::AppConfig;
use invoicelens_contracts::error::ConfigError;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};

use crate::{GenerativeModel, ModelRequest};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini `generateContent` over the blocking HTTP client.
///
/// One call per submission: no retries, and the client is built without a
/// request timeout.
pub struct GeminiModel {
    api_base: String,
    api_key: String,
    model: String,
    http: HttpClient,
}

impl GeminiModel {
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        let http = HttpClient::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| ConfigError::ModelClient(err.to_string()))?;
        Ok(Self {
            api_base: config.gemini_api_base.clone(),
            api_key: config.google_api_key.clone(),
            model: config.gemini_model.clone(),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    /// Instruction, image, prompt. Blank text parts are left out because the
    /// API rejects empty `text` fields.
    fn build_parts(request: &ModelRequest<'_>) -> Vec<Value> {
        let mut parts = Vec::new();
        if !request.instruction.trim().is_empty() {
            parts.push(json!({ "text": request.instruction }));
        }
        parts.push(json!({
            "inlineData": {
                "mimeType": request.image.mime_type(),
                "data": BASE64.encode(&request.image.bytes),
            }
        }));
        if !request.prompt.trim().is_empty() {
            parts.push(json!({ "text": request.prompt }));
        }
        parts
    }

    fn build_payload(request: &ModelRequest<'_>) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": Self::build_parts(request),
            }]
        })
    }

    fn extract_text(response_payload: &Value) -> Result<String> {
        let candidate = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first());
        let Some(candidate) = candidate else {
            let reason = response_payload
                .get("promptFeedback")
                .and_then(|feedback| feedback.get("blockReason"))
                .and_then(Value::as_str)
                .unwrap_or("no candidates returned");
            bail!("Gemini returned no text ({reason})");
        };

        let text: String = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        if text.is_empty() {
            let reason = candidate
                .get("finishReason")
                .and_then(Value::as_str)
                .unwrap_or("empty content");
            bail!("Gemini returned no text ({reason})");
        }
        Ok(text)
    }
}

impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_text(&self, request: &ModelRequest<'_>) -> Result<String> {
        let endpoint = self.endpoint_for_model(&self.model);
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&Self::build_payload(request))
            .send()
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let payload = response_json_or_error("Gemini", response)?;
        Self::extract_text(&payload)
    }
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use image::ImageFormat;
    use invoicelens_contracts::config::{AppConfig, INVOICE_INSTRUCTION};
    use invoicelens_contracts::interaction::ImageSubtype;
    use serde_json::{json, Value};

    use super::{truncate_text, GeminiModel, BASE64};
    use crate::image_input::fixtures::encoded_image;
    use crate::image_input::DecodedImage;
    use crate::{GenerativeModel, ModelRequest};
    use base64::Engine as _;

    fn config_for_test() -> AppConfig {
        AppConfig {
            google_api_key: "test-key".to_string(),
            mongo_uri: "mongodb://localhost:27017".to_string(),
            gemini_api_base: "https://gemini.test/v1beta".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            database: "invoice".to_string(),
            collection: "invoice details".to_string(),
        }
    }

    fn decoded_png() -> DecodedImage {
        DecodedImage {
            file_name: "invoice.png".to_string(),
            subtype: ImageSubtype::Png,
            width: 8,
            height: 8,
            bytes: encoded_image(8, 8, ImageFormat::Png),
        }
    }

    #[test]
    fn endpoint_accepts_bare_and_prefixed_model_names() -> anyhow::Result<()> {
        let model = GeminiModel::new(&config_for_test())?;
        assert_eq!(model.model(), "gemini-1.5-flash");
        assert_eq!(
            model.endpoint_for_model("gemini-1.5-flash"),
            "https://gemini.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(
            model.endpoint_for_model(" models/gemini-2.0-flash "),
            "https://gemini.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
        Ok(())
    }

    #[test]
    fn payload_orders_instruction_image_prompt() -> anyhow::Result<()> {
        let image = decoded_png();
        let request = ModelRequest {
            instruction: INVOICE_INSTRUCTION,
            image: &image,
            prompt: "What is the total?",
        };
        let payload = GeminiModel::build_payload(&request);
        let parts = payload["contents"][0]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        assert_eq!(payload["contents"][0]["role"], json!("user"));
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], json!(INVOICE_INSTRUCTION));
        assert_eq!(parts[1]["inlineData"]["mimeType"], json!("image/png"));
        let data = parts[1]["inlineData"]["data"].as_str().unwrap_or_default();
        assert_eq!(BASE64.decode(data)?, image.bytes);
        assert_eq!(parts[2]["text"], json!("What is the total?"));
        Ok(())
    }

    #[test]
    fn blank_prompt_is_left_out_of_the_payload() {
        let image = decoded_png();
        let request = ModelRequest {
            instruction: INVOICE_INSTRUCTION,
            image: &image,
            prompt: "  ",
        };
        let parts = GeminiModel::build_parts(&request);
        assert_eq!(parts.len(), 2);
        assert!(parts[1].get("inlineData").is_some());
    }

    #[test]
    fn extract_text_joins_first_candidate_parts() -> anyhow::Result<()> {
        let payload = json!({
            "candidates": [
                {"content": {"parts": [{"text": "Total: "}, {"text": "$42.00"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        });
        assert_eq!(GeminiModel::extract_text(&payload)?, "Total: $42.00");
        Ok(())
    }

    #[test]
    fn extract_text_reports_block_and_finish_reasons() {
        let blocked = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = GeminiModel::extract_text(&blocked).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));

        let empty = json!({"candidates": [{"finishReason": "RECITATION", "content": {"parts": []}}]});
        let err = GeminiModel::extract_text(&empty).unwrap_err();
        assert!(err.to_string().contains("RECITATION"));

        let nothing = Value::Null;
        assert!(GeminiModel::extract_text(&nothing).is_err());
    }

    #[test]
    fn transport_errors_do_not_expose_the_api_key() -> anyhow::Result<()> {
        let mut config = config_for_test();
        config.google_api_key = "SECRET-KEY-123".to_string();
        config.gemini_api_base = "http://127.0.0.1:1/v1beta".to_string();
        let model = GeminiModel::new(&config)?;
        let image = decoded_png();
        let request = ModelRequest {
            instruction: INVOICE_INSTRUCTION,
            image: &image,
            prompt: "What is the total?",
        };

        let err = model.generate_text(&request).unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains("Gemini request failed"));
        assert!(!rendered.contains("SECRET-KEY-123"));
        Ok(())
    }

    #[test]
    fn truncate_text_marks_cut_bodies() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc…");
    }
}
