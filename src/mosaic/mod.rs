//! MosaicJSON document model.
//!
//! A [`MosaicJson`] maps quadkeys at a single indexing zoom to ordered lists
//! of asset identifiers, plus descriptive metadata. Documents are validated
//! whenever they are built or decoded, so a value of this type that came out
//! of [`MosaicJson::from_bytes`] or [`build`] always satisfies the field
//! constraints.
//!
//! # Wire format
//!
//! Field names follow the MosaicJSON format:
//! `mosaicjson, name, description, version, attribution, minzoom, maxzoom,
//! quadkey_zoom, bounds, center, tiles`. Documents may be stored gzip
//! compressed; [`should_decompress`] implements the `.gz` suffix rule.

mod builder;
mod lookup;

pub use builder::{build, build_with_accessor, update_tiles, BuildOptions};
pub use lookup::{items_for_point, items_for_tile};

use std::collections::BTreeMap;
use std::io::{Read, Write};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224};

use crate::error::{MosaicError, ValidationError};
use crate::grid::{is_quadkey_at_zoom, LngLatBbox, MAX_ZOOM, WORLD_BOUNDS};

/// MosaicJSON format version written by this crate.
pub const MOSAICJSON_VERSION: &str = "0.0.2";

/// Default document version.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Quadkey → ordered asset identifiers.
pub type TileIndex = BTreeMap<String, Vec<String>>;

/// `(lng, lat, zoom)`
pub type Center = (f64, f64, u8);

/// A MosaicJSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MosaicJson {
    /// MosaicJSON format version
    pub mosaicjson: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Document version
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,

    #[serde(default)]
    pub minzoom: u8,

    #[serde(default = "default_maxzoom")]
    pub maxzoom: u8,

    /// Indexing zoom; absent in old documents, where it equals `minzoom`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quadkey_zoom: Option<u8>,

    #[serde(default = "default_bounds")]
    pub bounds: LngLatBbox,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Center>,

    pub tiles: TileIndex,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_maxzoom() -> u8 {
    MAX_ZOOM
}

fn default_bounds() -> LngLatBbox {
    WORLD_BOUNDS
}

/// Every document field except `tiles`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MosaicMetadata {
    pub mosaicjson: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub quadkey_zoom: u8,
    pub bounds: LngLatBbox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<Center>,
}

impl MosaicJson {
    /// Create and validate a document with default metadata.
    ///
    /// `center` is set to the middle of `bounds` at `minzoom`.
    pub fn new(
        minzoom: u8,
        maxzoom: u8,
        quadkey_zoom: Option<u8>,
        bounds: LngLatBbox,
        tiles: TileIndex,
    ) -> Result<Self, ValidationError> {
        let doc = Self {
            mosaicjson: MOSAICJSON_VERSION.to_string(),
            name: None,
            description: None,
            version: DEFAULT_VERSION.to_string(),
            attribution: None,
            minzoom,
            maxzoom,
            quadkey_zoom,
            bounds,
            center: Some(center_of(&bounds, minzoom)),
            tiles,
        };
        doc.validate()?;
        Ok(doc)
    }

    /// Zoom at which `tiles` is keyed.
    pub fn quadkey_zoom(&self) -> u8 {
        self.quadkey_zoom.unwrap_or(self.minzoom)
    }

    /// Check every field constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_zoom("minzoom", self.minzoom)?;
        check_zoom("maxzoom", self.maxzoom)?;
        if let Some(z) = self.quadkey_zoom {
            check_zoom("quadkey_zoom", z)?;
        }
        if self.minzoom > self.maxzoom {
            return Err(ValidationError::ZoomOrder {
                minzoom: self.minzoom,
                maxzoom: self.maxzoom,
            });
        }

        check_bounds(&self.bounds)?;

        if let Some((lng, lat, zoom)) = self.center {
            let reason = if !lng.is_finite() || !lat.is_finite() {
                Some("coordinates must be finite")
            } else if lng.abs() > 180.0 || lat.abs() > 90.0 {
                Some("coordinates out of range")
            } else if zoom > MAX_ZOOM {
                Some("zoom out of range")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ValidationError::InvalidCenter {
                    lng,
                    lat,
                    zoom,
                    reason: reason.to_string(),
                });
            }
        }

        let quadkey_zoom = self.quadkey_zoom();
        for (quadkey, assets) in &self.tiles {
            if !is_quadkey_at_zoom(quadkey, quadkey_zoom) {
                return Err(ValidationError::InvalidQuadkey {
                    quadkey: quadkey.clone(),
                    expected_zoom: quadkey_zoom,
                });
            }
            if assets.is_empty() {
                return Err(ValidationError::EmptyTile {
                    quadkey: quadkey.clone(),
                });
            }
        }

        Ok(())
    }

    /// All fields except `tiles`.
    pub fn metadata(&self) -> MosaicMetadata {
        MosaicMetadata {
            mosaicjson: self.mosaicjson.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            attribution: self.attribution.clone(),
            minzoom: self.minzoom,
            maxzoom: self.maxzoom,
            quadkey_zoom: self.quadkey_zoom(),
            bounds: self.bounds,
            center: self.center,
        }
    }

    /// Content id: sha224 hex digest of the format tag and the JSON body.
    pub fn mosaic_id(&self) -> Result<String, MosaicError> {
        let body = self.to_json()?;
        let mut hasher = Sha224::new();
        hasher.update(self.mosaicjson.as_bytes());
        hasher.update(b"\n");
        hasher.update(&body);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Compact JSON body. `tiles` keys are emitted in sorted order.
    pub fn to_json(&self) -> Result<Vec<u8>, MosaicError> {
        serde_json::to_vec(self).map_err(|e| MosaicError::Encode(e.to_string()))
    }

    /// Serialize, optionally gzip compressed.
    pub fn to_bytes(&self, gzip: bool) -> Result<Bytes, MosaicError> {
        let body = self.to_json()?;
        if !gzip {
            return Ok(Bytes::from(body));
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&body)
            .map_err(|e| MosaicError::Encode(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| MosaicError::Encode(e.to_string()))?;
        Ok(Bytes::from(compressed))
    }

    /// Parse and validate a document, decompressing it first if asked to.
    ///
    /// `location` is only used in error messages.
    pub fn from_bytes(body: &[u8], gzip: bool, location: &str) -> Result<Self, MosaicError> {
        let decode_error = |reason: String| MosaicError::Decode {
            location: location.to_string(),
            reason,
        };

        let doc: MosaicJson = if gzip {
            let mut decompressed = Vec::new();
            GzDecoder::new(body)
                .read_to_end(&mut decompressed)
                .map_err(|e| decode_error(format!("gzip: {e}")))?;
            serde_json::from_slice(&decompressed)
        } else {
            serde_json::from_slice(body)
        }
        .map_err(|e| decode_error(e.to_string()))?;

        doc.validate()?;
        Ok(doc)
    }
}

/// Gzip decision for a location: an explicit flag wins, else the `.gz` suffix.
pub fn should_decompress(location: &str, gzip: Option<bool>) -> bool {
    gzip.unwrap_or_else(|| location.ends_with(".gz"))
}

/// Midpoint of `bounds` at `zoom`.
pub fn center_of(bounds: &LngLatBbox, zoom: u8) -> Center {
    (
        (bounds[0] + bounds[2]) / 2.0,
        (bounds[1] + bounds[3]) / 2.0,
        zoom,
    )
}

fn check_zoom(field: &'static str, value: u8) -> Result<(), ValidationError> {
    if value > MAX_ZOOM {
        return Err(ValidationError::ZoomOutOfRange {
            field,
            value,
            max: MAX_ZOOM,
        });
    }
    Ok(())
}

fn check_bounds(bounds: &LngLatBbox) -> Result<(), ValidationError> {
    let [west, south, east, north] = *bounds;
    let reason = if bounds.iter().any(|v| !v.is_finite()) {
        Some("values must be finite")
    } else if west.abs() > 180.0 || east.abs() > 180.0 {
        Some("longitude out of range")
    } else if south.abs() > 90.0 || north.abs() > 90.0 {
        Some("latitude out of range")
    } else if west > east || south > north {
        Some("min must not exceed max")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ValidationError::InvalidBounds {
            bounds: *bounds,
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
