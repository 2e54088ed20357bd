use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};

use crate::domain::new_subscriber::{NewSubscriber, SubscribeBody};
use crate::domain::subscriber_record::SubscriberRecord;
use crate::ledger::{Insertion, Ledger, LedgerError};
use crate::routes::{error_chain_fmt, ErrorBody};

pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address.";

#[derive(serde::Serialize)]
pub struct SubscribeResponse {
    pub ok: bool,
    pub message: &'static str,
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0} is already subscribed.")]
    ConflictError(String),
    #[error("Failed to store the new subscriber.")]
    StorageError(#[from] LedgerError),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SubscribeError::ConflictError(_) => StatusCode::CONFLICT,
            SubscribeError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            SubscribeError::ValidationError(_) => {
                tracing::warn!("Validation error: {:?}", self);
                INVALID_EMAIL_MESSAGE
            }
            SubscribeError::ConflictError(_) => {
                tracing::info!("Duplicate subscription: {:?}", self);
                "This email address is already subscribed."
            }
            SubscribeError::StorageError(_) => {
                tracing::error!("Failed to store subscriber: {:?}", self);
                "Server error"
            }
        };

        ErrorBody::response(self.status_code(), message)
    }
}

#[tracing::instrument(
    name = "Creating a new subscriber handler",
    skip(body, ledger),
    fields(
        subscriber_email = %body.email
    )
)]
pub async fn handle_subscribe(
    body: web::Json<SubscribeBody>,
    ledger: web::Data<Ledger>,
) -> Result<HttpResponse, SubscribeError> {
    let new_subscriber: NewSubscriber = body
        .into_inner()
        .try_into()
        .map_err(SubscribeError::ValidationError)?;

    subscribe(&ledger, new_subscriber).await?;

    Ok(HttpResponse::Ok().json(SubscribeResponse {
        ok: true,
        message: "Thanks for subscribing!",
    }))
}

/// Adds the subscriber to the ledger unless the address is already there.
#[tracing::instrument(
    name = "Store a new subscriber in the ledger",
    skip(ledger, new_subscriber)
)]
pub async fn subscribe(
    ledger: &Ledger,
    new_subscriber: NewSubscriber,
) -> Result<SubscriberRecord, SubscribeError> {
    ledger.ensure_exists().await?;

    let record = SubscriberRecord::new(new_subscriber.email);

    match ledger.insert_unique(&record).await? {
        Insertion::Inserted => Ok(record),
        Insertion::AlreadyPresent => Err(SubscribeError::ConflictError(
            record.email.as_ref().to_string(),
        )),
    }
}
