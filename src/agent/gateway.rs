//! Access to the local language model.
//!
//! Chat goes through `genai`, which routes un-prefixed model names to
//! Ollama. Model administration (health, listing, pulls) talks to the Ollama
//! HTTP API directly with `reqwest`.

use std::time::Duration;

use genai::chat::{ChatMessage, ChatRequest};
use genai::Client;
use serde::Deserialize;

use crate::error::GatewayError;

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Sends one system prompt plus one context block to a model.
#[allow(async_fn_in_trait)]
pub trait ModelGateway {
    /// Returns the model's reply text, a descriptive message when the
    /// transport failed, or `None` when the model answered with nothing.
    async fn chat(&mut self, model: &str, system_prompt: &str, context: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// One progress line from `/api/pull`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PullProgress {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PullProgress {
    /// One-line rendering for a progress display.
    pub fn describe(&self) -> String {
        match (self.completed, self.total) {
            (Some(done), Some(total)) if total > 0 => {
                let percent = done as f64 / total as f64 * 100.0;
                let status = self.status.as_deref().unwrap_or("Downloading");
                format!("{status}... {percent:.1}%")
            }
            _ => self.status.clone().unwrap_or_default(),
        }
    }
}

/// Ollama over HTTP.
pub struct OllamaGateway {
    client: Client,
    http: reqwest::Client,
    base_url: String,
}

impl Default for OllamaGateway {
    fn default() -> Self {
        Self::new(OLLAMA_BASE_URL)
    }
}

impl OllamaGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::default(),
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// True if the server answers on its root URL (200 or 404).
    pub async fn server_alive(&self) -> bool {
        let url = format!("{}/", self.base_url);
        match self
            .http
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => matches!(resp.status().as_u16(), 200 | 404),
            Err(e) => {
                tracing::debug!(url, "Ollama health check failed: {e}");
                false
            }
        }
    }

    /// Names of installed models.
    pub async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let url = format!("{}/api/tags", self.base_url);
        let unavailable = |e: reqwest::Error| GatewayError::OllamaUnavailable {
            url: url.clone(),
            message: e.to_string(),
        };

        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(unavailable)?;
        if !resp.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "GET {url} returned HTTP {}",
                resp.status()
            )));
        }
        let tags: TagsResponse = resp.json().await.map_err(unavailable)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    pub async fn model_installed(&self, model: &str) -> bool {
        match self.list_models().await {
            Ok(models) => models.iter().any(|m| m == model),
            Err(e) => {
                tracing::warn!("Could not list models: {e}");
                false
            }
        }
    }

    /// Pull `model`, calling `on_progress` for every complete progress line
    /// the server streams back.
    pub async fn pull_model(
        &self,
        model: &str,
        mut on_progress: impl FnMut(&PullProgress),
    ) -> Result<(), GatewayError> {
        let url = format!("{}/api/pull", self.base_url);
        let failed = |message: String| GatewayError::PullFailed {
            model: model.to_string(),
            message,
        };

        let mut resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "name": model, "stream": true }))
            .send()
            .await
            .map_err(|e| GatewayError::OllamaUnavailable {
                url: url.clone(),
                message: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(failed(format!("HTTP {}", resp.status())));
        }

        // Chunks do not align with lines; buffer until a newline arrives.
        let mut pending = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| failed(e.to_string()))? {
            pending.extend_from_slice(&chunk);
            while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                handle_progress_line(&line, &mut on_progress).map_err(failed)?;
            }
        }
        handle_progress_line(&pending, &mut on_progress).map_err(failed)?;

        tracing::info!(model, "Model pulled");
        Ok(())
    }
}

fn handle_progress_line(
    line: &[u8],
    on_progress: &mut impl FnMut(&PullProgress),
) -> Result<(), String> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }
    match serde_json::from_str::<PullProgress>(text) {
        Ok(progress) => {
            if let Some(error) = &progress.error {
                return Err(error.clone());
            }
            on_progress(&progress);
        }
        Err(e) => tracing::debug!("Ignoring malformed pull progress line: {e}"),
    }
    Ok(())
}

impl ModelGateway for OllamaGateway {
    async fn chat(&mut self, model: &str, system_prompt: &str, context: &str) -> Option<String> {
        let request =
            ChatRequest::from_system(system_prompt).append_message(ChatMessage::user(context));

        match self.client.exec_chat(model, request, None).await {
            Ok(response) => {
                let text = response.first_text().unwrap_or_default().trim().to_string();
                if text.is_empty() {
                    tracing::warn!(model, "Model returned an empty reply");
                    None
                } else {
                    Some(text)
                }
            }
            Err(e) => {
                let error = GatewayError::Transport(e.to_string());
                tracing::warn!(model, "{error}");
                Some(format!(
                    "Cannot get a reply from Ollama ({error}). Is it running? Try: `ollama serve`"
                ))
            }
        }
    }
}
