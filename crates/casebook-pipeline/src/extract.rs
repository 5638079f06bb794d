use std::time::Duration;

use async_trait::async_trait;
use casebook_core::config::ExtractionConfig;
use casebook_core::{CasebookError, DocumentKind, ExtractionOptions, ExtractionResult, Result};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

/// Turns an uploaded document into text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, kind: DocumentKind) -> bool;

    async fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<ExtractionResult>;
}

pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "plain_text"
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Text
    }

    async fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<ExtractionResult> {
        let text = match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => {
                tracing::warn!("{} is not valid UTF-8, decoding lossily", file_name);
                String::from_utf8_lossy(bytes).into_owned()
            }
        };
        Ok(ExtractionResult::from_text(text, 1, "plain_text"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub models_loaded: bool,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    error: String,
}

/// Client for the layout-aware PDF extraction service
pub struct PdfServiceClient {
    client: reqwest::Client,
    base_url: String,
    options: ExtractionOptions,
}

impl PdfServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CasebookError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            options: ExtractionOptions::default(),
        })
    }

    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        Self::new(
            &config.pdf_service_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_options(mut self, options: ExtractionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<ServiceHealth> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CasebookError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CasebookError::Http(format!(
                "PDF service health check failed: {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| CasebookError::Http(e.to_string()))
    }
}

#[async_trait]
impl TextExtractor for PdfServiceClient {
    fn name(&self) -> &str {
        "pdf_service"
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Pdf
    }

    async fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<ExtractionResult> {
        let url = format!("{}/extract", self.base_url);

        let part = Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| CasebookError::Http(e.to_string()))?;

        let mut form = Form::new().part("file", part);
        for (key, value) in self.options.form_fields() {
            form = form.text(key, value);
        }
        form = form.text("output_format", "json");

        tracing::debug!("Sending {} ({} bytes) to {}", file_name, bytes.len(), url);

        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CasebookError::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CasebookError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ServiceError>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| body.chars().take(500).collect());
            return Err(CasebookError::Extraction(format!("{}: {}", status, message)));
        }

        parse_extraction(&body)
    }
}

fn parse_extraction(body: &str) -> Result<ExtractionResult> {
    let result: ExtractionResult = serde_json::from_str(body).map_err(|e| {
        CasebookError::Extraction(format!(
            "Failed to parse response: {} - Body: {}",
            e,
            body.chars().take(500).collect::<String>()
        ))
    })?;

    if let Some(error) = &result.metadata.error {
        return Err(CasebookError::Extraction(error.clone()));
    }
    Ok(result)
}
