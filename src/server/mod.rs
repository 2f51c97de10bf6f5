//! The user-facing JSON web server

use crate::error::PredictError;
use actix_cors::Cors;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use anyhow::anyhow;
use tracing::error;

pub mod protocol;
pub mod routes;

#[derive(Debug)]
pub struct WebError {
    err: PredictError,
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.err)
    }
}

impl actix_web::error::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if !self.err.is_client_error() {
            error!("request failed: {}", self.err);
        }

        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .json(protocol::ErrorResponse {
                error: self.to_string(),
            })
    }

    fn status_code(&self) -> StatusCode {
        match self.err {
            PredictError::MissingImage => StatusCode::BAD_REQUEST,
            PredictError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PredictError> for WebError {
    fn from(err: PredictError) -> WebError {
        WebError { err }
    }
}

impl From<actix_web::error::BlockingError> for WebError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        WebError {
            err: PredictError::Inference(anyhow!(err)),
        }
    }
}

impl From<actix_multipart::MultipartError> for WebError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        WebError {
            err: PredictError::Upload(err.to_string()),
        }
    }
}

/// Cross-origin requests are accepted from anywhere
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
}

/// Register every route, accepting image payloads up to `max_upload_bytes`.
/// Expects a `web::Data<InferenceService>` to be set as app data.
pub fn configure(max_upload_bytes: usize) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(routes::UploadLimit(max_upload_bytes)))
            .app_data(web::FormConfig::default().limit(max_upload_bytes))
            .service(routes::predict)
            .service(routes::health)
            .service(routes::self_test);
    }
}
