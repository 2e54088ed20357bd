mod chat;
mod health_check;
mod subscriptions;

pub use chat::*;
pub use health_check::*;
pub use subscriptions::*;

use actix_web::error::InternalError;
use actix_web::{web, HttpResponse};

/// Body of every error response. Only generic text reaches the client.
#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

impl ErrorBody {
    pub fn response(status: actix_web::http::StatusCode, error: &'static str) -> HttpResponse {
        HttpResponse::build(status).json(ErrorBody { error })
    }
}

/// Rejects unreadable JSON bodies (missing fields, wrong types) with a 400
/// carrying `message`, like every other validation failure of the route.
pub fn json_config(message: &'static str) -> web::JsonConfig {
    web::JsonConfig::default().error_handler(move |err, _req| {
        tracing::warn!("Rejected request body: {}", err);
        let response = HttpResponse::BadRequest().json(ErrorBody { error: message });

        InternalError::from_response(err, response).into()
    })
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
