use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::chat_client::{ChatClient, ChatClientError};
use crate::domain::chat_message::ChatMessage;
use crate::routes::{error_chain_fmt, ErrorBody};

pub const INVALID_MESSAGE_MESSAGE: &str = "Please write a message.";

#[derive(Deserialize)]
pub struct ChatBody {
    pub message: String,
}

#[derive(serde::Serialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Failed to relay the chat message.")]
    RelayError(#[from] ChatClientError),
}

impl std::fmt::Debug for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ChatError {
    fn status_code(&self) -> StatusCode {
        match self {
            ChatError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ChatError::RelayError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ChatError::ValidationError(_) => {
                tracing::warn!("Validation error: {:?}", self);
                INVALID_MESSAGE_MESSAGE
            }
            ChatError::RelayError(ChatClientError::MissingApiKey) => {
                tracing::error!("Chat relay is not configured: {:?}", self);
                "Server configuration is incomplete."
            }
            ChatError::RelayError(_) => {
                tracing::error!("Chat relay failed: {:?}", self);
                "Server error"
            }
        };

        ErrorBody::response(self.status_code(), message)
    }
}

#[tracing::instrument(
    name = "Relaying a chat message handler",
    skip(body, chat_client),
    fields(
        message_length = body.message.len()
    )
)]
pub async fn handle_chat(
    body: web::Json<ChatBody>,
    chat_client: web::Data<ChatClient>,
) -> Result<HttpResponse, ChatError> {
    let message =
        ChatMessage::parse(body.into_inner().message).map_err(ChatError::ValidationError)?;
    let reply = chat_client.reply(&message).await?;

    Ok(HttpResponse::Ok().json(ChatReply { reply }))
}
