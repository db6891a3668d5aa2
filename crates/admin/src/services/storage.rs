//! Object storage for banner and promo images.
//!
//! Images are stored under generated keys (`rules/<uuid>.<ext>`) in an
//! HTTP object store that accepts `PUT` and `DELETE` on `{base_url}/{key}`.
//! Authentication, when configured, is a bearer token.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::StorageConfig;

/// Errors that can occur when talking to object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage returned an error response.
    #[error("storage error: {status} on {operation} {key}")]
    Api {
        operation: &'static str,
        key: String,
        status: u16,
    },

    /// Client or key could not be built.
    #[error("invalid storage request: {0}")]
    Invalid(String),
}

/// An image file received with a banner or promo mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// File extension used for the generated key, from the file name or content type.
    #[must_use]
    pub fn extension(&self) -> &str {
        let from_name = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| {
                !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
            });

        from_name.unwrap_or(match self.content_type.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "bin",
        })
    }
}

/// Object storage operations needed by the rule service.
#[automock]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store an image under a fresh key and return the key.
    async fn put(&self, upload: ImageUpload) -> Result<String, StorageError>;

    /// Delete the object stored under `key`. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Upload `upload` and delete `old_key` concurrently, returning the new key.
///
/// Both operations must succeed. When only the upload succeeds, the new
/// object is deleted again before the error is returned.
///
/// # Errors
///
/// Returns the upload error if the upload failed, otherwise the delete error.
pub async fn replace_image(
    storage: &dyn ObjectStorage,
    old_key: Option<&str>,
    upload: ImageUpload,
) -> Result<String, StorageError> {
    let delete_old = async {
        match old_key {
            Some(key) => storage.delete(key).await,
            None => Ok(()),
        }
    };

    match tokio::join!(storage.put(upload), delete_old) {
        (Ok(new_key), Ok(())) => Ok(new_key),
        (Ok(new_key), Err(err)) => {
            if let Err(cleanup) = storage.delete(&new_key).await {
                warn!(key = %new_key, error = %cleanup, "Failed to discard replacement image");
            }
            Err(err)
        }
        (Err(err), _) => Err(err),
    }
}

/// [`ObjectStorage`] backed by an HTTP object store.
#[derive(Clone)]
pub struct HttpObjectStorage {
    inner: Arc<HttpObjectStorageInner>,
}

struct HttpObjectStorageInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpObjectStorage {
    /// Create a new object storage client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| StorageError::Invalid(format!("invalid token format: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpObjectStorageInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StorageError::Invalid("base URL cannot hold a path".to_owned()))?
            .pop_if_empty()
            .extend(key.split('/'));
        Ok(url)
    }
}

impl std::fmt::Debug for HttpObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpObjectStorage")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    #[instrument(
        name = "storage.put",
        skip(self, upload),
        fields(key = tracing::field::Empty),
        err
    )]
    async fn put(&self, upload: ImageUpload) -> Result<String, StorageError> {
        let key = format!("rules/{}.{}", uuid::Uuid::new_v4(), upload.extension());
        tracing::Span::current().record("key", key.as_str());

        let content_type = HeaderValue::from_str(&upload.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

        let response = self
            .inner
            .client
            .put(self.object_url(&key)?)
            .header(CONTENT_TYPE, content_type)
            .body(upload.bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Api {
                operation: "PUT",
                key,
                status: response.status().as_u16(),
            });
        }

        debug!("stored image");
        Ok(key)
    }

    #[instrument(name = "storage.delete", skip(self), err)]
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let response = self
            .inner
            .client
            .delete(self.object_url(key)?)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }

        Err(StorageError::Api {
            operation: "DELETE",
            key: key.to_owned(),
            status: status.as_u16(),
        })
    }
}
