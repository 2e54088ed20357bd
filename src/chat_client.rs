use reqwest::{Certificate, Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;

use crate::config::ChatClientSettings;
use crate::domain::chat_message::ChatMessage;

const RESPONSES_PATH: &str = "/v1/responses";

#[derive(Debug)]
pub struct ChatClient {
    http_client: Client,
    base_url: String,
    model: String,
    reply_language: String,
    api_key: Option<Secret<String>>,
}

#[derive(serde::Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    input: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ChatClientError {
    #[error("No API key is configured for the completion API.")]
    MissingApiKey,
    #[error("Failed to load the certificate authority at {path}.")]
    CertificateAuthority {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Failed to build the HTTP client for the completion API.")]
    HttpClient(#[source] reqwest::Error),
    #[error("The request to the completion API failed.")]
    Request(#[from] reqwest::Error),
    #[error("The completion API answered with status {0}.")]
    UpstreamStatus(StatusCode),
    #[error("The completion API answered with a body that is not JSON.")]
    InvalidBody(#[source] serde_json::Error),
    #[error("The completion API response did not contain any reply text.")]
    EmptyReply,
}

/// The response shapes a reply can be read from, in the order they are tried.
#[derive(Debug, PartialEq)]
pub enum UpstreamReply {
    /// Top level `output_text` string.
    OutputText(String),
    /// `text` of every content block of every `output` item.
    Output(Vec<String>),
    /// `text` of every content block of assistant-authored `messages`.
    Messages(Vec<String>),
}

impl UpstreamReply {
    pub fn from_body(body: &Value) -> Vec<UpstreamReply> {
        let mut shapes = Vec::new();

        if let Some(text) = body.get("output_text").and_then(Value::as_str) {
            shapes.push(UpstreamReply::OutputText(text.to_string()));
        }

        if let Some(items) = body.get("output").and_then(Value::as_array) {
            shapes.push(UpstreamReply::Output(content_texts(items.iter())));
        }

        if let Some(messages) = body.get("messages").and_then(Value::as_array) {
            let assistant_messages = messages
                .iter()
                .filter(|message| message.get("role").and_then(Value::as_str) == Some("assistant"));
            shapes.push(UpstreamReply::Messages(content_texts(assistant_messages)));
        }

        shapes
    }

    /// Trimmed reply text, or `None` when this shape carries nothing useful.
    pub fn text(&self) -> Option<String> {
        let text = match self {
            UpstreamReply::OutputText(text) => text.trim().to_string(),
            UpstreamReply::Output(blocks) | UpstreamReply::Messages(blocks) => blocks
                .iter()
                .map(|block| block.trim())
                .filter(|block| !block.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        };

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

fn content_texts<'a>(items: impl Iterator<Item = &'a Value>) -> Vec<String> {
    items
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .map(String::from)
        .collect()
}

pub fn extract_reply(body: &Value) -> Option<String> {
    UpstreamReply::from_body(body)
        .iter()
        .find_map(UpstreamReply::text)
}

impl ChatClient {
    pub fn new(settings: &ChatClientSettings) -> Result<ChatClient, ChatClientError> {
        let mut builder = Client::builder().timeout(settings.get_timeout());

        if settings.skip_tls_verify {
            tracing::warn!(
                "TLS certificate verification is disabled for requests to the completion API"
            );
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(path) = &settings.ca_cert_path {
            // The default trust store stays in use when the file is unusable.
            match load_certificate(path) {
                Ok(certificate) => {
                    tracing::info!(path = %path.display(), "Loaded a custom certificate authority for the completion API");
                    builder = builder.add_root_certificate(certificate);
                }
                Err(err) => {
                    tracing::error!("Custom certificate authority ignored: {:?}", err);
                }
            }
        }

        let api_key = settings.get_api_key();
        if api_key.is_none() {
            tracing::warn!("No API key configured, /api/chat will answer with an error");
        }

        Ok(ChatClient {
            http_client: builder.build().map_err(ChatClientError::HttpClient)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            reply_language: settings.reply_language.clone(),
            api_key,
        })
    }

    #[tracing::instrument(name = "Relay a chat message to the completion API", skip(self, message))]
    pub async fn reply(&self, message: &ChatMessage) -> Result<String, ChatClientError> {
        let api_key = self.api_key.as_ref().ok_or(ChatClientError::MissingApiKey)?;
        let url = format!("{}{}", self.base_url, RESPONSES_PATH);
        let body = CompletionRequest {
            model: &self.model,
            input: self.instruction(message),
        };

        let response = self
            .http_client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let upstream_body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                upstream_body = %upstream_body,
                "The completion API returned an error"
            );
            return Err(ChatClientError::UpstreamStatus(status));
        }

        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes).map_err(ChatClientError::InvalidBody)?;

        extract_reply(&body).ok_or_else(|| {
            tracing::error!(upstream_body = %body, "The completion API response has no reply text");
            ChatClientError::EmptyReply
        })
    }

    fn instruction(&self, message: &ChatMessage) -> String {
        format!(
            "User said: \"{}\". Answer briefly, clearly, in {}.",
            message.as_ref(),
            self.reply_language
        )
    }
}

fn load_certificate(path: &std::path::Path) -> Result<Certificate, ChatClientError> {
    let to_error = |source: Box<dyn std::error::Error + Send + Sync>| {
        ChatClientError::CertificateAuthority {
            path: path.display().to_string(),
            source,
        }
    };
    let pem = std::fs::read(path).map_err(|err| to_error(Box::new(err)))?;

    Certificate::from_pem(&pem).map_err(|err| to_error(Box::new(err)))
}
