//! HTTP transport for the processing server

use anyhow::{Context, Result};
use pdfstudio_core::remote::{classify_response, RemoteOutput, RemoteRequest, RemoteResponse};
use pdfstudio_core::RemoteTool;
use reqwest::multipart::{Form, Part};

pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn endpoint(&self, tool: RemoteTool) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), tool.route())
    }

    /// Post `request` as multipart form data and classify the answer
    pub async fn send(&self, request: RemoteRequest, file_name: &str) -> Result<RemoteOutput> {
        let url = self.endpoint(request.tool);
        let part = Part::bytes(request.file.clone())
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let mut form = Form::new().part("file", part);
        for (name, value) in request.text_fields() {
            form = form.text(name, value);
        }

        tracing::info!(url = %url, bytes = request.file.len(), "Sending to processing server");
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Could not reach processing server at {}", url))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .context("Failed to read processing server response")?
            .to_vec();
        tracing::debug!(status, bytes = body.len(), "Processing server answered");

        Ok(classify_response(
            request.tool,
            RemoteResponse {
                status,
                headers,
                body,
            },
        )?)
    }
}
