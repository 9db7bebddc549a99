//! S3 (and S3-compatible) document store.

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use super::{DocumentStore, Location};
use crate::error::StoreError;

/// Store for `s3://bucket/key` locations.
///
/// Reads with `GetObject` and writes with `PutObject`.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn bucket_and_key(location: &str) -> Result<(String, String), StoreError> {
        match Location::parse(location)? {
            Location::S3 { bucket, key } => Ok((bucket, key)),
            _ => Err(StoreError::InvalidLocation {
                location: location.to_string(),
                reason: "not an s3:// URI".to_string(),
            }),
        }
    }
}

/// Translate an SDK error into a store error.
///
/// Errors with a raw response are post-flight and keep the status code;
/// the rest (dispatch, timeout, construction) are client side.
fn map_sdk_error<E>(location: &str, e: SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata,
    SdkError<E>: std::fmt::Display,
{
    let code = e
        .as_service_error()
        .and_then(|se| se.code())
        .map(str::to_string);

    let Some(status) = e.raw_response().map(|r| r.status().as_u16()) else {
        return StoreError::Connection {
            location: location.to_string(),
            reason: e.to_string(),
        };
    };

    match code.as_deref() {
        Some("NoSuchKey" | "NoSuchBucket") => StoreError::NotFound {
            location: location.to_string(),
            status: Some(status),
        },
        Some("AccessDenied") => StoreError::Auth {
            location: location.to_string(),
            status: Some(status),
        },
        _ => StoreError::from_status(location, status, code.unwrap_or_else(|| e.to_string())),
    }
}

#[async_trait]
impl DocumentStore for S3Store {
    fn name(&self) -> &'static str {
        "s3"
    }

    fn is_writable(&self, _location: &str) -> bool {
        true
    }

    async fn read(&self, location: &str) -> Result<Bytes, StoreError> {
        let (bucket, key) = Self::bucket_and_key(location)?;

        let response = self
            .client
            .get_object()
            .bucket(&bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| map_sdk_error(location, e))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Connection {
                location: location.to_string(),
                reason: e.to_string(),
            })?
            .into_bytes();

        Ok(data)
    }

    async fn write(&self, location: &str, body: Bytes) -> Result<(), StoreError> {
        let (bucket, key) = Self::bucket_and_key(location)?;
        let size = body.len();

        self.client
            .put_object()
            .bucket(&bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| map_sdk_error(location, e))?;

        debug!(location, bytes = size, "Wrote mosaic object");
        Ok(())
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// A custom endpoint (MinIO, LocalStack, ...) switches to path-style
/// addressing.
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(endpoint_url.is_some())
        .build();

    Client::from_conf(s3_config)
}
