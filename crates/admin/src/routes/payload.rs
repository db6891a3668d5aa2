//! Request body extractors.
//!
//! Rejections are turned into [`AppError::BadRequest`] so that every malformed
//! body is a 400 with the same JSON error shape as other failures.

use axum::Json;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::services::ImageUpload;

/// Multipart part holding the JSON form.
const PAYLOAD_PART: &str = "payload";
/// Multipart part holding the image file.
const IMAGE_PART: &str = "image";

/// JSON body whose rejection is a 400.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// A rule form with an optional image.
///
/// Accepts either a JSON body or `multipart/form-data` with a `payload` part
/// holding the JSON form and an optional `image` file part.
#[derive(Debug)]
pub struct RulePayload<F> {
    pub form: F,
    pub image: Option<ImageUpload>,
}

impl<S, F> FromRequest<S> for RulePayload<F>
where
    S: Send + Sync,
    F: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let ApiJson(form) = ApiJson::<F>::from_request(req, state).await?;
            return Ok(Self { form, image: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        let mut form = None;
        let mut image = None;

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some(PAYLOAD_PART) => {
                    let text = field.text().await.map_err(bad_multipart)?;
                    let parsed = serde_json::from_str::<F>(&text).map_err(|e| {
                        AppError::BadRequest(format!("invalid {PAYLOAD_PART} part: {e}"))
                    })?;
                    form = Some(parsed);
                }
                Some(IMAGE_PART) => {
                    let file_name = field.file_name().unwrap_or("upload").to_owned();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_owned();
                    let bytes = field.bytes().await.map_err(bad_multipart)?;
                    if !bytes.is_empty() {
                        image = Some(ImageUpload {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                _ => {}
            }
        }

        let form =
            form.ok_or_else(|| AppError::BadRequest(format!("missing '{PAYLOAD_PART}' part")))?;

        Ok(Self { form, image })
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

#[allow(clippy::needless_pass_by_value)]
fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(err.to_string())
}
