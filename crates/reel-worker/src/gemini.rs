//! Gemini client for key-moment extraction.
//!
//! Sends the source video by reference (`fileData`) together with the
//! system instruction and returns the model's raw JSON answer.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::{AnalysisProvider, AnalysisRequest};
use crate::config::GeminiConfig;
use crate::error::{WorkerError, WorkerResult};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a sports video analyst. Identify the key moments of the \
video and answer with a JSON array. Each element must have \"start_timestamp\" and \
\"end_timestamp\" in HH:MM:SS format and a short \"description\".";

/// Header carrying the API key. Request URLs show up in error logs.
const API_KEY_HEADER: &str = "x-goog-api-key";

const USER_PROMPT: &str =
    "Analyze this video and identify key moments with timestamps and descriptions.";

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    models: Vec<String>,
    base_url: String,
    system_prompt: String,
    client: Client,
}

/// Gemini API request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: Instruction,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Instruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    File {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    file_uri: String,
    mime_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "application/json",
        }
    }
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// Reads the system instruction from the configured file when it exists.
    pub fn new(config: GeminiConfig) -> WorkerResult<Self> {
        let api_key = config
            .api_key
            .ok_or_else(|| WorkerError::config_error("GEMINI_API_KEY not set"))?;
        if config.models.is_empty() {
            return Err(WorkerError::config_error("No Gemini models configured"));
        }

        let system_prompt = match std::fs::read_to_string(&config.system_prompt_file) {
            Ok(prompt) if !prompt.trim().is_empty() => prompt,
            _ => {
                warn!(
                    "System prompt {} not readable, using built-in prompt",
                    config.system_prompt_file.display()
                );
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
        };

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| WorkerError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            models: config.models,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            system_prompt,
            client,
        })
    }

    fn build_request(&self, request: &AnalysisRequest) -> GeminiRequest {
        let mut prompt = USER_PROMPT.to_string();
        if let Some(duration) = request.duration_hint {
            prompt.push_str(&format!(
                " The video is {:.1} seconds long; every timestamp must fall within it.",
                duration
            ));
        }

        GeminiRequest {
            system_instruction: Instruction {
                parts: vec![Part::Text {
                    text: self.system_prompt.clone(),
                }],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::File {
                        file_data: FileData {
                            file_uri: request.source_uri.clone(),
                            mime_type: "video/mp4",
                        },
                    },
                    Part::Text { text: prompt },
                ],
            }],
            generation_config: GenerationConfig::default(),
        }
    }

    /// Call one model.
    async fn call_model(&self, model: &str, body: &GeminiRequest) -> WorkerResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| WorkerError::analysis_failed(format!("Gemini API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(WorkerError::analysis_failed(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            WorkerError::analysis_failed(format!("Failed to parse Gemini response: {}", e))
        })?;

        gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| WorkerError::analysis_failed("No content in Gemini response"))
    }
}

#[async_trait]
impl AnalysisProvider for GeminiClient {
    async fn analyze(&self, request: &AnalysisRequest) -> WorkerResult<String> {
        let body = self.build_request(request);
        let mut last_error = None;

        for model in &self.models {
            info!("Analyzing {} with model {}", request.source_uri, model);
            match self.call_model(model, &body).await {
                Ok(text) => {
                    info!("Got analysis from {} ({} bytes)", model, text.len());
                    return Ok(text);
                }
                Err(e) => {
                    warn!("Failed with model {}: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| WorkerError::analysis_failed("All Gemini models failed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, models: &[&str]) -> GeminiConfig {
        GeminiConfig {
            api_key: Some("test-key".to_string()),
            models: models.iter().map(|m| m.to_string()).collect(),
            base_url: server.uri(),
            system_prompt_file: "/nonexistent/system-prompt.txt".into(),
            ..GeminiConfig::default()
        }
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            source_uri: "gs://montage-sources/source_748231_480p.mp4".to_string(),
            duration_hint: Some(183.5),
        }
    }

    fn answer(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        })
    }

    #[test]
    fn test_missing_api_key() {
        let result = GeminiClient::new(GeminiConfig::default());
        assert!(matches!(result, Err(WorkerError::Config(_))));
    }

    #[tokio::test]
    async fn test_sends_file_reference() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-a:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [{"fileData": {
                        "fileUri": "gs://montage-sources/source_748231_480p.mp4",
                        "mimeType": "video/mp4"
                    }}]
                }],
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("[]")))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server, &["gemini-a"])).unwrap();
        assert_eq!(client.analyze(&request()).await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_falls_back_to_next_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-a:generateContent"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-b:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer(
                r#"[{"start_timestamp":"00:00:01","end_timestamp":"00:00:04"}]"#,
            )))
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server, &["gemini-a", "gemini-b"])).unwrap();
        let text = client.analyze(&request()).await.unwrap();
        assert!(text.contains("start_timestamp"));
    }

    #[tokio::test]
    async fn test_all_models_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server, &["gemini-a", "gemini-b"])).unwrap();
        let err = client.analyze(&request()).await.unwrap_err();
        assert!(matches!(err, WorkerError::AnalysisFailure(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_api_key_not_in_errors() {
        let server = MockServer::start().await;
        let mut config = config(&server, &["gemini-a"]);
        // Nothing listens here, so the request itself fails
        config.base_url = "http://127.0.0.1:9".to_string();
        drop(server);

        let client = GeminiClient::new(config).unwrap();
        let err = client.analyze(&request()).await.unwrap_err();
        assert!(matches!(err, WorkerError::AnalysisFailure(_)));
        assert!(!err.to_string().contains("test-key"));
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server, &["gemini-a"])).unwrap();
        assert!(client.analyze(&request()).await.is_err());
    }
}
