//! HTTP handlers. Image decoding and inference are CPU bound, so they run on
//! the blocking thread pool rather than on the async workers.

use super::protocol::{DataUriForm, HealthResponse, PredictResponse, SelfTestResponse};
use super::WebError;
use crate::error::PredictError;
use crate::preprocess::ImageSource;
use crate::service::InferenceService;
use actix_multipart::Multipart;
use actix_web::error::UrlencodedError;
use actix_web::{get, post, web, FromRequest, HttpMessage, HttpRequest, Responder};
use futures_util::TryStreamExt;
use tracing::debug;

type Result<T> = std::result::Result<T, WebError>;

/// Name of the file part or form field carrying the image
const IMAGE_FIELD: &str = "image";

/// Largest accepted image payload, in bytes
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

#[post("/predict")]
pub async fn predict(
    req: HttpRequest,
    payload: web::Payload,
    service: web::Data<InferenceService>,
    limit: web::Data<UploadLimit>,
) -> Result<impl Responder> {
    let source = read_image_source(&req, payload, limit.0).await?;
    debug!("got inference request {source:?}");

    let prediction = web::block(move || service.predict(&source)).await??;
    Ok(web::Json(PredictResponse::from(prediction)))
}

#[get("/health")]
pub async fn health() -> impl Responder {
    web::Json(HealthResponse { status: "healthy" })
}

/// Run the built-in synthetic digit through the model
#[get("/test")]
pub async fn self_test(service: web::Data<InferenceService>) -> Result<impl Responder> {
    let result = web::block(move || service.self_test()).await??;
    Ok(web::Json(SelfTestResponse::from(result)))
}

async fn read_image_source(
    req: &HttpRequest,
    payload: web::Payload,
    limit: usize,
) -> Result<ImageSource> {
    let content_type = req
        .mime_type()
        .map_err(|e| PredictError::Upload(e.to_string()))?;
    let Some(content_type) = content_type else {
        return Err(PredictError::MissingImage.into());
    };

    if content_type.type_() == mime::MULTIPART && content_type.subtype() == mime::FORM_DATA {
        return read_multipart(Multipart::new(req.headers(), payload), limit).await;
    }
    if content_type.type_() != mime::APPLICATION
        || content_type.subtype() != mime::WWW_FORM_URLENCODED
    {
        return Err(PredictError::MissingImage.into());
    }

    let form = web::Form::<DataUriForm>::from_request(req, &mut payload.into_inner())
        .await
        .map_err(|e| match e.as_error::<UrlencodedError>() {
            Some(UrlencodedError::Overflow { .. }) => PredictError::TooLarge { limit },
            _ => PredictError::Upload(e.to_string()),
        })?;
    match form.into_inner().image {
        Some(uri) if !uri.trim().is_empty() => Ok(ImageSource::DataUri(uri)),
        _ => Err(PredictError::MissingImage.into()),
    }
}

/// Pull the `image` part out of a multipart body. A file part wins over a
/// plain text part holding a data URI.
async fn read_multipart(mut multipart: Multipart, limit: usize) -> Result<ImageSource> {
    let mut file = None;
    let mut text = None;

    while let Some(mut field) = multipart.try_next().await? {
        let (is_image, is_file) = {
            let disposition = field.content_disposition();
            (
                disposition.get_name() == Some(IMAGE_FIELD),
                disposition.get_filename().is_some(),
            )
        };
        if !is_image {
            continue;
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if data.len() + chunk.len() > limit {
                return Err(PredictError::TooLarge { limit }.into());
            }
            data.extend_from_slice(&chunk);
        }

        if is_file {
            file.get_or_insert(data);
        } else {
            text.get_or_insert(data);
        }
    }

    if let Some(bytes) = file.filter(|b| !b.is_empty()) {
        return Ok(ImageSource::Upload(bytes));
    }
    match text.filter(|t| !t.is_empty()) {
        Some(text) => {
            let uri = String::from_utf8(text)
                .map_err(|_| PredictError::Upload("image field is not valid UTF-8".into()))?;
            Ok(ImageSource::DataUri(uri))
        }
        None => Err(PredictError::MissingImage.into()),
    }
}
