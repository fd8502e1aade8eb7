use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, error};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum VertexError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("decode error: {0}")] Decode(String),
    #[error("empty response: {0}")] Empty(String),
}

/// One prompt in, one markdown document out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String, VertexError>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_images(&self, request: &ImageRequest) -> Result<Vec<ImagePayload>, VertexError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub count: u32,
    pub aspect_ratio: String,
    pub safety_filter_level: String,
    pub person_generation: String,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, count: u32, aspect_ratio: &str) -> Self {
        Self {
            prompt: prompt.into(),
            count,
            aspect_ratio: aspect_ratio.to_string(),
            safety_filter_level: "block_some".to_string(),
            person_generation: "allow_adult".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" || key == "bytesBase64Encoded" {
                    if let serde_json::Value::String(s) = val {
                        if s.len() > 100 {
                            *val = serde_json::Value::String(format!("{}...[truncated {} chars]", crate::prompt::truncate_chars(s, 50), s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

fn log_preview(raw: &str) -> String {
    if raw.len() <= 1000 {
        return raw.to_string();
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(mut value) => {
            truncate_base64_in_json(&mut value);
            serde_json::to_string(&value).unwrap_or_default()
        }
        Err(_) => format!("{}...", crate::prompt::truncate_chars(raw, 1000)),
    }
}

/// Vertex AI client for the Gemini text model and the Imagen image model.
pub struct VertexClient {
    client: Client,
    base_url: String,
    project_id: String,
    location: String,
    text_model: String,
    image_model: String,
    access_token: Option<String>,
}

impl VertexClient {
    pub fn new(config: &Config) -> Result<Self, VertexError> {
        // Each run uses its own short-lived runtime; pooled connections
        // must not outlive it.
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| VertexError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_base.clone(),
            project_id: config.project_id.clone(),
            location: config.location.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/projects/{}/locations/{}/publishers/google/models/{}:{}",
            self.base_url, self.project_id, self.location, model, method
        )
    }

    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<String, VertexError> {
        info!("🔗 Making request to: {}", url);

        let mut request = self.client.post(url).json(body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| VertexError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);
        let response_text = response.text().await.map_err(|e| VertexError::Http(e.to_string()))?;

        if !status.is_success() {
            error!("❌ API Error response: {}", log_preview(&response_text));
            return Err(VertexError::Http(format!("status={} body={}", status, response_text)));
        }
        info!("📥 Raw Vertex response: {}", log_preview(&response_text));
        Ok(response_text)
    }

    async fn generate_content(&self, parts: serde_json::Value) -> Result<String, VertexError> {
        let url = self.model_url(&self.text_model, "generateContent");
        let payload = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "temperature": 0.7 }
        });
        let raw = self.post(&url, &payload).await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|e| VertexError::Decode(format!("Failed to parse response: {}", e)))?;
        let text = parsed.first_text();
        if text.trim().is_empty() {
            return Err(VertexError::Empty("No text content found in response".to_string()));
        }
        Ok(text)
    }

    /// Sends text plus one inline image to the multimodal model.
    pub async fn generate_with_image(&self, prompt: &str, image: &[u8], mime_type: &str) -> Result<String, VertexError> {
        info!("🎨 Sending {} byte {} image for analysis", image.len(), mime_type);
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        self.generate_content(json!([
            { "text": prompt },
            { "inlineData": { "mimeType": mime_type, "data": encoded } }
        ]))
        .await
    }
}

#[async_trait]
impl TextGenerator for VertexClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, VertexError> {
        info!("Generating text with Vertex AI ({})...", self.text_model);
        let text = self.generate_content(json!([{ "text": prompt }])).await?;
        info!("✅ Generated {} chars of text", text.len());
        Ok(text)
    }
}

#[async_trait]
impl ImageGenerator for VertexClient {
    async fn generate_images(&self, request: &ImageRequest) -> Result<Vec<ImagePayload>, VertexError> {
        let url = self.model_url(&self.image_model, "predict");
        info!(
            "🖼️ Requesting {} image(s) at {} with prompt: {}",
            request.count,
            request.aspect_ratio,
            crate::prompt::truncate_chars(&request.prompt, 100)
        );
        let payload = json!({
            "instances": [{ "prompt": request.prompt }],
            "parameters": {
                "sampleCount": request.count,
                "aspectRatio": request.aspect_ratio,
                "safetySetting": request.safety_filter_level,
                "personGeneration": request.person_generation,
                "language": "en"
            }
        });
        let raw = self.post(&url, &payload).await?;
        let parsed: PredictResponse = serde_json::from_str(&raw)
            .map_err(|e| VertexError::Decode(format!("parse error: {}", e)))?;
        let images = parsed.decode()?;
        if images.is_empty() {
            return Err(VertexError::Empty("no image data in response".into()));
        }
        info!("✅ Received {} image(s)", images.len());
        Ok(images)
    }
}

pub const OFFLINE_RESPONSE: &str = "## Overall Concept and Style
This is a test response for the interior design generator. It demonstrates the structure and formatting of the output.

## Color Scheme and Materials
- Primary colors: Test colors
- Materials: Test materials

## Furniture and Layout
- Test furniture arrangement
- Test layout details

## Decorative Elements
- Test decorative items
- Test styling elements
";

/// Stand-in for the hosted text model when running offline without credentials.
pub struct OfflineTextGenerator;

#[async_trait]
impl TextGenerator for OfflineTextGenerator {
    async fn generate_text(&self, _prompt: &str) -> Result<String, VertexError> {
        info!("Using offline mode - returning canned design text");
        Ok(OFFLINE_RESPONSE.to_string())
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> String {
        self.candidates
            .first()
            .map(|c| c.content.parts.iter().filter_map(|p| p.text.as_deref()).collect::<String>())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64_encoded: Option<String>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

impl PredictResponse {
    fn decode(self) -> Result<Vec<ImagePayload>, VertexError> {
        self.predictions
            .into_iter()
            .filter_map(|p| p.bytes_base64_encoded.map(|data| (data, p.mime_type)))
            .map(|(data, mime_type)| {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(data.as_bytes())
                    .map_err(|e| VertexError::Decode(format!("image base64 decode failed: {}", e)))?;
                Ok(ImagePayload { bytes, mime_type })
            })
            .collect()
    }
}
