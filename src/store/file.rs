use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{DocumentStore, Location};
use crate::error::StoreError;

/// Local filesystem store.
///
/// Accepts plain paths and `file://` URLs. A missing file is a client-side
/// [`StoreError::NotFound`] (no status code).
#[derive(Debug, Clone, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }

    fn path(location: &str) -> Result<PathBuf, StoreError> {
        match Location::parse(location)? {
            Location::File(path) => Ok(path),
            _ => Err(StoreError::InvalidLocation {
                location: location.to_string(),
                reason: "not a local path".to_string(),
            }),
        }
    }
}

fn map_io_error(location: &str, e: std::io::Error) -> StoreError {
    match e.kind() {
        ErrorKind::NotFound => StoreError::NotFound {
            location: location.to_string(),
            status: None,
        },
        ErrorKind::PermissionDenied => StoreError::Auth {
            location: location.to_string(),
            status: None,
        },
        _ => StoreError::Io {
            location: location.to_string(),
            reason: e.to_string(),
        },
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn is_writable(&self, _location: &str) -> bool {
        true
    }

    async fn read(&self, location: &str) -> Result<Bytes, StoreError> {
        let path = Self::path(location)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| map_io_error(location, e))?;
        Ok(Bytes::from(data))
    }

    async fn write(&self, location: &str, body: Bytes) -> Result<(), StoreError> {
        let path = Self::path(location)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| map_io_error(location, e))?;
        }
        tokio::fs::write(&path, &body)
            .await
            .map_err(|e| map_io_error(location, e))?;
        debug!(location, bytes = body.len(), "Wrote mosaic file");
        Ok(())
    }
}
