//! Cliente OpenRouter (`POST /api/v1/chat/completions`).
//!
//! Clasificación de errores por modelo:
//! - timeout del cliente -> `Timeout`
//! - conexión / 408 / 429 / 5xx / cuerpo ilegible -> `Transient`
//! - resto de 4xx, texto vacío -> `NonRetryable`
use alt_core::{ModelProvider, ProviderContent, ProviderError, ProviderErrorKind, ProviderRequest, ProviderResponse};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64_STD;
use base64::Engine as _;
use log::{debug, error};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::fmt;
use std::path::PathBuf;

use crate::error::ProviderSetupError;
use crate::parse::parse_openrouter_response;

pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const ERROR_BODY_LIMIT: usize = 500;

#[derive(Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub endpoint: String,
    /// Cabecera `HTTP-Referer` (atribución de la app en OpenRouter).
    pub referer: Option<String>,
    /// Cabecera `X-Title`.
    pub title: Option<String>,
    /// Bundle PEM adicional para servidores con CA propia.
    pub ca_bundle: Option<PathBuf>,
}

impl OpenRouterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(),
               endpoint: OPENROUTER_API_URL.to_string(),
               referer: None,
               title: Some("altflow".to_string()),
               ca_bundle: None }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterConfig")
         .field("api_key", &"<redacted>")
         .field("endpoint", &self.endpoint)
         .field("referer", &self.referer)
         .field("title", &self.title)
         .field("ca_bundle", &self.ca_bundle)
         .finish()
    }
}

#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    config: OpenRouterConfig,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig) -> Result<Self, ProviderSetupError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderSetupError::Config("OPENROUTER_API_KEY vacío".into()));
        }
        let mut builder = reqwest::Client::builder().user_agent(concat!("altflow/", env!("CARGO_PKG_VERSION")));
        if let Some(path) = &config.ca_bundle {
            let pem = std::fs::read(path)?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| ProviderSetupError::Client(format!("CA bundle inválido {}: {e}", path.display())))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder.build()
                            .map_err(|e| ProviderSetupError::Client(format!("no se pudo crear el cliente HTTP: {e}")))?;
        Ok(Self { config, client })
    }

    fn payload(model: &str, prompt: &str, content: &ProviderContent) -> Value {
        json!({
            "model": model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": image_data_url(content)}}
                ]
            }]
        })
    }
}

/// `data:<mime>;base64,<bytes>`.
pub fn image_data_url(content: &ProviderContent) -> String {
    format!("data:{};base64,{}", content.mime_type, B64_STD.encode(&content.bytes))
}

fn classify_status(status: StatusCode) -> ProviderErrorKind {
    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ProviderErrorKind::Transient
    } else {
        ProviderErrorKind::NonRetryable
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait]
impl ModelProvider for OpenRouterProvider {
    fn name(&self) -> &str { "openrouter" }

    async fn generate(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.as_str();
        let mut builder = self.client
                              .post(&self.config.endpoint)
                              .bearer_auth(&self.config.api_key)
                              .timeout(request.timeout)
                              .json(&Self::payload(model, &request.prompt, &request.content));
        if let Some(referer) = &self.config.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.config.title {
            builder = builder.header("X-Title", title);
        }

        let response = builder.send().await.map_err(|e| {
                                                 if e.is_timeout() {
                                                     ProviderError::timeout(model, request.timeout)
                                                 } else {
                                                     ProviderError::transient(model, format!("request failed: {e}"))
                                                 }
                                             })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
                                            if e.is_timeout() {
                                                ProviderError::timeout(model, request.timeout)
                                            } else {
                                                ProviderError::transient(model, format!("failed to read body: {e}"))
                                            }
                                        })?;
        if !status.is_success() {
            error!("openrouter:http_error status={} model={model} body={}", status.as_u16(), truncate(&body));
            return Err(ProviderError::new(model, classify_status(status), format!("HTTP {}: {}", status.as_u16(), truncate(&body))));
        }

        let raw: Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::transient(model, format!("invalid JSON response: {e}")))?;
        let parsed = parse_openrouter_response(&raw);
        debug!("openrouter:response model={model} id={:?} finish_reason={:?}", parsed.response_id, parsed.finish_reason);
        if parsed.text.is_empty() {
            return Err(ProviderError::non_retryable(model, "empty generated text"));
        }
        Ok(parsed.into_response(raw))
    }
}
