//! Dataset footprints.
//!
//! A [`Footprint`] is what the mosaic builder needs to know about one raster
//! dataset: its outline, identifier, native zoom range and pixel datatype.
//! Reading those from a raster file is delegated to a [`FootprintExtractor`]
//! implementation; this module runs extractors over a bounded worker pool
//! and keeps the successes separate from the failures.
//!
//! Footprints can also be loaded from a GeoJSON FeatureCollection (see
//! [`footprints_from_geojson`]).

mod geojson;
mod pool;

pub use geojson::footprints_from_geojson;
pub use pool::{get_footprints, ExtractionReport, DEFAULT_MAX_THREADS};

use geo::Polygon;
use tracing::warn;

use crate::error::{ExtractionError, MosaicError};
use crate::geometry::union_bounds;
use crate::grid::{LngLatBbox, WORLD_BOUNDS};

/// Spatial extent and descriptive metadata of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    /// Dataset identifier (path or URL)
    pub id: String,

    /// Outline of the dataset in lng/lat
    pub geometry: Polygon<f64>,

    /// `[minx, miny, maxx, maxy]` of the dataset
    pub bounds: LngLatBbox,

    /// Coarsest zoom at which the dataset is useful
    pub native_minzoom: Option<u8>,

    /// Zoom matching the dataset's native resolution
    pub native_maxzoom: Option<u8>,

    /// Pixel datatype (e.g. `uint8`)
    pub datatype: Option<String>,
}

impl Footprint {
    /// Create a footprint; bounds are derived from the geometry.
    pub fn new(id: impl Into<String>, geometry: Polygon<f64>) -> Self {
        let bounds = union_bounds([&geometry]).unwrap_or(WORLD_BOUNDS);
        Self {
            id: id.into(),
            geometry,
            bounds,
            native_minzoom: None,
            native_maxzoom: None,
            datatype: None,
        }
    }

    /// Set the native zoom range.
    pub fn with_zooms(mut self, minzoom: u8, maxzoom: u8) -> Self {
        self.native_minzoom = Some(minzoom);
        self.native_maxzoom = Some(maxzoom);
        self
    }

    /// Set the pixel datatype.
    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = Some(datatype.into());
        self
    }
}

/// Reads the footprint of a dataset reference (file path, URL, ...).
///
/// Implementations must be thread-safe: extraction runs on a worker pool.
pub trait FootprintExtractor: Send + Sync {
    fn extract(&self, reference: &str) -> Result<Footprint, ExtractionError>;
}

impl<F> FootprintExtractor for F
where
    F: Fn(&str) -> Result<Footprint, ExtractionError> + Send + Sync,
{
    fn extract(&self, reference: &str) -> Result<Footprint, ExtractionError> {
        self(reference)
    }
}

/// Resolve the mosaic zoom range.
///
/// Forced values win. Otherwise the largest native minzoom and the largest
/// native maxzoom across the footprints are used, with a warning when the
/// footprints disagree.
pub fn find_zooms(
    footprints: &[Footprint],
    minzoom: Option<u8>,
    maxzoom: Option<u8>,
) -> Result<(u8, u8), MosaicError> {
    let minzoom = match minzoom {
        Some(z) => z,
        None => {
            let zooms = distinct(footprints.iter().filter_map(|f| f.native_minzoom));
            if zooms.len() > 1 {
                warn!(minzooms = ?zooms, "Multiple minzoom values, assets have different minzoom");
            }
            zooms.last().copied().ok_or_else(|| {
                MosaicError::NoFootprints("no footprint declares a native minzoom".to_string())
            })?
        }
    };

    let maxzoom = match maxzoom {
        Some(z) => z,
        None => {
            let zooms = distinct(footprints.iter().filter_map(|f| f.native_maxzoom));
            if zooms.len() > 1 {
                warn!(maxzooms = ?zooms, "Multiple maxzoom values, assets have multiple resolutions");
            }
            zooms.last().copied().ok_or_else(|| {
                MosaicError::NoFootprints("no footprint declares a native maxzoom".to_string())
            })?
        }
    };

    Ok((minzoom, maxzoom))
}

/// Placeholder reported for footprints that declare no datatype.
const UNKNOWN_DATATYPE: &str = "unknown";

/// Check that all footprints share one datatype.
///
/// A missing datatype counts as its own kind, so a batch either declares
/// the same datatype everywhere or declares none at all.
pub fn check_datatype(footprints: &[Footprint]) -> Result<(), MosaicError> {
    let mut datatypes: Vec<String> = footprints
        .iter()
        .map(|f| {
            f.datatype
                .clone()
                .unwrap_or_else(|| UNKNOWN_DATATYPE.to_string())
        })
        .collect();
    datatypes.sort();
    datatypes.dedup();

    if datatypes.len() > 1 {
        return Err(MosaicError::MixedDatasetType { datatypes });
    }
    Ok(())
}

fn distinct(values: impl Iterator<Item = u8>) -> Vec<u8> {
    let mut values: Vec<u8> = values.collect();
    values.sort_unstable();
    values.dedup();
    values
}
