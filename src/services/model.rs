use crate::config::ModelConfig;
use crate::error::{FeedbackError, Result};
use crate::types::UploadedFile;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Completion service used by the assessor.
#[async_trait]
pub trait ModelClient: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;

    async fn upload(&self, bytes: Vec<u8>, mime_type: &str, display_name: &str) -> Result<UploadedFile>;

    async fn generate_with_file(&self, file: &UploadedFile, prompt: &str) -> Result<String>;
}

pub struct GeminiClient {
    http: Client,
    config: ModelConfig,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: UploadedFileResource,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFileResource {
    name: String,
    uri: String,
    mime_type: String,
}

impl GeminiClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            http: Client::new(),
            config,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/v1beta/files", self.config.base_url.trim_end_matches('/'))
    }

    async fn send_generate(&self, parts: Vec<Value>) -> Result<String> {
        let body = json!({
            "contents": [{ "role": "user", "parts": parts }]
        });

        let response = self
            .http
            .post(self.generate_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FeedbackError::HttpStatus { status, body });
        }

        let response_json: Value = response.json().await?;
        let text = Self::extract_text(&response_json)?;
        debug!("Model returned {} characters", text.len());
        Ok(text)
    }

    fn extract_text(response_json: &Value) -> Result<String> {
        let parts = response_json
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array);

        let text: String = parts
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            let reason = response_json
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .map(|r| format!("prompt blocked ({})", r))
                .or_else(|| {
                    response_json
                        .pointer("/candidates/0/finishReason")
                        .and_then(Value::as_str)
                        .map(|r| format!("finish reason {}", r))
                })
                .unwrap_or_else(|| "no candidate text".to_string());
            return Err(FeedbackError::EmptyResponse { reason });
        }

        Ok(text)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Sending prompt of {} characters to {}", prompt.len(), self.config.model);
        self.send_generate(vec![json!({ "text": prompt })]).await
    }

    async fn upload(&self, bytes: Vec<u8>, mime_type: &str, display_name: &str) -> Result<UploadedFile> {
        info!("Uploading '{}' ({} bytes) to the file API", display_name, bytes.len());

        let response = self
            .http
            .post(self.upload_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "raw")
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FeedbackError::HttpStatus { status, body });
        }

        let uploaded: UploadResponse = response.json().await.map_err(|e| FeedbackError::Upload {
            reason: format!("Unexpected upload response: {}", e),
        })?;

        debug!("Uploaded '{}' as {}", display_name, uploaded.file.name);

        Ok(UploadedFile {
            name: uploaded.file.name,
            uri: uploaded.file.uri,
            mime_type: uploaded.file.mime_type,
        })
    }

    async fn generate_with_file(&self, file: &UploadedFile, prompt: &str) -> Result<String> {
        self.send_generate(vec![
            json!({ "file_data": { "mime_type": file.mime_type, "file_uri": file.uri } }),
            json!({ "text": prompt }),
        ])
        .await
    }
}
