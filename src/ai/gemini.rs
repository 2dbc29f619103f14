// src/ai/gemini.rs
use base64::{engine::general_purpose, Engine as _};
use log::{info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use super::connector::InvoiceAnalyzer;
use super::error::{AiError, Result};
use crate::invoice::attachment::InvoiceImage;

/// Default generateContent endpoint base.
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default multimodal model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

//Fixed instruction sent ahead of every question
pub const INVOICE_INSTRUCTION: &str = "You are an expert in understanding invoices. \
You will receive input images as invoices, and you will have to answer questions \
based on the input image.";

/// Explicit configuration for the Gemini client. Built once at startup
/// (from the environment or CLI flags) and passed in; the client itself
/// never reads the environment.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Build a config from `GOOGLE_API_KEY`, honoring a `GEMINI_API_URL` override.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("GOOGLE_API_KEY")
            .map_err(|_| AiError::Config("GOOGLE_API_KEY is not set".to_string()))?;
        let mut config = Self::new(api_key);
        if let Ok(url) = env::var("GEMINI_API_URL") {
            config.api_url = url;
        }
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

//Wire types for generateContent. Shared between request and response.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// One entry from the service's model index.
#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

//Client for the Gemini generateContent API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(AiError::Config("API key is empty".to_string()));
        }

        info!(
            "Initializing Gemini client for model {} at {}",
            config.model, config.api_url
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self { config, client })
    }

    /// List the models available to the configured key.
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/models", self.config.api_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .map_err(|e| self.tag_transport_error(e))?;

        let status = response.status();
        let body = response.text().map_err(AiError::Http)?;
        if !status.is_success() {
            return Err(Self::api_error(status.as_u16(), &body));
        }

        let parsed: ListModelsResponse = serde_json::from_str(&body)?;
        Ok(parsed.models)
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_url, self.config.model
        )
    }

    fn tag_transport_error(&self, error: reqwest::Error) -> AiError {
        if error.is_timeout() {
            AiError::Timeout(self.config.timeout)
        } else {
            AiError::Http(error)
        }
    }

    //Pull the service's message out of an error body, falling back to the raw text
    fn api_error(status: u16, body: &str) -> AiError {
        let message = serde_json::from_str::<ApiErrorEnvelope>(body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body.trim().to_string());
        AiError::Api { status, message }
    }
}

impl InvoiceAnalyzer for GeminiClient {
    fn answer_question(&self, image: Option<&InvoiceImage>, question: &str) -> Result<String> {
        // Abort before any network activity when there is nothing to send
        let image = match image {
            Some(image) if !image.is_empty() => image,
            _ => return Err(AiError::MissingImage),
        };

        info!(
            "Asking {} about a {} byte {} invoice",
            self.config.model,
            image.len(),
            image.mime_type()
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![
                    Part::Text {
                        text: INVOICE_INSTRUCTION.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type().to_string(),
                            data: general_purpose::STANDARD.encode(image.bytes()),
                        },
                    },
                    Part::Text {
                        text: question.to_string(),
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .map_err(|e| self.tag_transport_error(e))?;

        let status = response.status();
        let body = response.text().map_err(AiError::Http)?;
        if !status.is_success() {
            warn!("Gemini returned {} for generateContent", status);
            return Err(Self::api_error(status.as_u16(), &body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;
        let answer = parsed
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .filter_map(|part| match part {
                        Part::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(AiError::EmptyAnswer);
        }

        Ok(answer)
    }
}
