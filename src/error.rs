use thiserror::Error;

/// Errors raised by a document store while reading or writing mosaic bytes.
///
/// Pre-flight failures (the medium never answered) carry no status code;
/// post-flight failures keep the status reported by the medium so callers
/// can decide on a retry policy.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Transport failure before any response (DNS, refused connection, timeout)
    #[error("Connection error for {location}: {reason}")]
    Connection { location: String, reason: String },

    /// Document does not exist (HTTP 404, S3 NoSuchKey, missing local file)
    #[error("Mosaic not found: {location}")]
    NotFound {
        location: String,
        status: Option<u16>,
    },

    /// Access denied by the medium (HTTP 401/403, S3 AccessDenied, permissions)
    #[error("Access denied to {location}")]
    Auth {
        location: String,
        status: Option<u16>,
    },

    /// Any other post-flight failure, with the raw status and response body
    #[error("Storage error for {location}: status {status}: {body}")]
    Status {
        location: String,
        status: u16,
        body: String,
    },

    /// Local I/O failure other than not-found/permission
    #[error("I/O error for {location}: {reason}")]
    Io { location: String, reason: String },

    /// Location string cannot be mapped to a store
    #[error("Invalid mosaic location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    /// The store does not support this operation (e.g. writing over HTTP)
    #[error("{store} store does not support {operation}")]
    Unsupported {
        store: &'static str,
        operation: &'static str,
    },
}

impl StoreError {
    /// Status code reported by the medium, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::NotFound { status, .. } | StoreError::Auth { status, .. } => *status,
            StoreError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures that happened before the medium answered.
    pub fn is_client_side(&self) -> bool {
        match self {
            StoreError::Unsupported { .. } => false,
            _ => self.status().is_none(),
        }
    }

    /// Map a post-flight status code onto the closest error variant.
    pub fn from_status(location: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let location = location.into();
        match status {
            401 | 403 => StoreError::Auth {
                location,
                status: Some(status),
            },
            404 => StoreError::NotFound {
                location,
                status: Some(status),
            },
            _ => StoreError::Status {
                location,
                status,
                body: body.into(),
            },
        }
    }
}

/// Field-level validation failures of a mosaic document or build options.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be between 0 and {max}, got {value}")]
    ZoomOutOfRange {
        field: &'static str,
        value: u8,
        max: u8,
    },

    #[error("minzoom ({minzoom}) must be less than or equal to maxzoom ({maxzoom})")]
    ZoomOrder { minzoom: u8, maxzoom: u8 },

    #[error("Invalid bounds {bounds:?}: {reason}")]
    InvalidBounds { bounds: [f64; 4], reason: String },

    #[error("Invalid center ({lng}, {lat}, {zoom}): {reason}")]
    InvalidCenter {
        lng: f64,
        lat: f64,
        zoom: u8,
        reason: String,
    },

    #[error("Invalid quadkey '{quadkey}' in tiles: expected {expected_zoom} digits in 0-3")]
    InvalidQuadkey { quadkey: String, expected_zoom: u8 },

    #[error("Quadkey '{quadkey}' has an empty asset list")]
    EmptyTile { quadkey: String },

    #[error("Invalid {field}: {reason}")]
    InvalidOption { field: &'static str, reason: String },
}

/// Tile grid errors (bad coordinates supplied by a caller).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("Invalid tile {z}/{x}/{y}: coordinates must be below 2^z")]
    InvalidTile { x: u32, y: u32, z: u8 },

    #[error("Invalid zoom level: {0} (max 30)")]
    InvalidZoom(u8),

    #[error("Invalid quadkey: '{0}' (digits must be 0-3, length <= 30)")]
    InvalidQuadkey(String),

    #[error("Invalid coordinates: lng {lng}, lat {lat}")]
    InvalidCoordinates { lng: f64, lat: f64 },
}

/// A single dataset reference failed footprint extraction.
#[derive(Debug, Clone, Error)]
#[error("Failed to extract footprint for {reference}: {reason}")]
pub struct ExtractionError {
    pub reference: String,
    pub reason: String,
}

impl ExtractionError {
    pub fn new(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error for building, loading and querying mosaics.
#[derive(Debug, Clone, Error)]
pub enum MosaicError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Footprint batch spans more than one pixel datatype
    #[error("Datasets should have the same data type, found: {}", .datatypes.join(", "))]
    MixedDatasetType { datatypes: Vec<String> },

    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Bytes could not be decompressed or parsed as a mosaic document
    #[error("Failed to decode mosaic {location}: {reason}")]
    Decode { location: String, reason: String },

    #[error("Failed to encode mosaic: {0}")]
    Encode(String),

    /// Every footprint extraction failed, or none were supplied where required
    #[error("No footprints available: {0}")]
    NoFootprints(String),
}

impl MosaicError {
    /// Status code carried by an underlying store error.
    pub fn status(&self) -> Option<u16> {
        match self {
            MosaicError::Store(e) => e.status(),
            _ => None,
        }
    }

    /// True when the operation is not supported by the store.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, MosaicError::Store(StoreError::Unsupported { .. }))
    }
}
