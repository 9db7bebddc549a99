//! Index builder: footprints → MosaicJSON document.
//!
//! ```text
//! footprints ──► union bounds ──► burn tiles at quadkey_zoom
//!                                        │
//!                 FootprintIndex ◄───────┤ (one query per tile,
//!                                        │  exact intersects)
//!                                        ▼
//!                 cover filter ─► cover sort ─► truncate ─► tiles[quadkey]
//! ```
//!
//! Tiles are independent, so the per-tile step runs on the rayon pool.
//! Results are collected into a sorted map, which keeps the output
//! identical from one build to the next.

use geo::Polygon;
use rayon::prelude::*;
use tracing::{debug, info};

use super::{center_of, MosaicJson, TileIndex};
use crate::error::{MosaicError, ValidationError};
use crate::footprint::{check_datatype, Footprint};
use crate::geometry::{coverage_ratio, union_bounds, FootprintIndex};
use crate::grid::{burn_tiles, MAX_ZOOM, WORLD_BOUNDS};

/// Options for [`build`].
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Indexing zoom; `minzoom` when `None`
    pub quadkey_zoom: Option<u8>,

    /// Keep only assets covering strictly more than this fraction of a tile
    pub minimum_tile_cover: Option<f64>,

    /// Order assets by tile coverage, largest first
    pub tile_cover_sort: bool,

    /// Keep at most this many assets per tile
    pub maximum_items_per_tile: Option<usize>,

    pub name: Option<String>,
    pub description: Option<String>,
    pub attribution: Option<String>,
}

impl BuildOptions {
    /// Check option ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(z) = self.quadkey_zoom {
            if z > MAX_ZOOM {
                return Err(ValidationError::ZoomOutOfRange {
                    field: "quadkey_zoom",
                    value: z,
                    max: MAX_ZOOM,
                });
            }
        }

        if let Some(cover) = self.minimum_tile_cover {
            if !(0.0..=1.0).contains(&cover) {
                return Err(ValidationError::InvalidOption {
                    field: "minimum_tile_cover",
                    reason: format!("{cover} is not within [0, 1]"),
                });
            }
        }

        if self.maximum_items_per_tile == Some(0) {
            return Err(ValidationError::InvalidOption {
                field: "maximum_items_per_tile",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    fn needs_coverage(&self) -> bool {
        self.minimum_tile_cover.is_some() || self.tile_cover_sort
    }
}

/// Build a mosaic, storing each footprint's `id` as its asset identifier.
pub fn build(
    footprints: &[Footprint],
    minzoom: u8,
    maxzoom: u8,
    options: &BuildOptions,
) -> Result<MosaicJson, MosaicError> {
    build_with_accessor(footprints, minzoom, maxzoom, options, |f: &Footprint| {
        f.id.clone()
    })
}

/// Build a mosaic, storing `accessor(footprint)` as the asset identifier.
///
/// # Arguments
///
/// * `footprints` - Dataset footprints; must share one datatype
/// * `minzoom`, `maxzoom` - Zoom range of the mosaic
/// * `options` - Indexing zoom, filtering and descriptive fields
/// * `accessor` - Maps a footprint to the identifier written in `tiles`
pub fn build_with_accessor<A>(
    footprints: &[Footprint],
    minzoom: u8,
    maxzoom: u8,
    options: &BuildOptions,
    accessor: A,
) -> Result<MosaicJson, MosaicError>
where
    A: Fn(&Footprint) -> String + Sync,
{
    options.validate()?;
    check_datatype(footprints)?;

    let quadkey_zoom = options.quadkey_zoom.unwrap_or(minzoom);

    let geometries = footprints.iter().map(|f| &f.geometry);
    let bounds = union_bounds(geometries.clone()).unwrap_or(WORLD_BOUNDS);

    let candidate_tiles = burn_tiles(geometries.clone(), quadkey_zoom)?;
    debug!(
        footprints = footprints.len(),
        quadkey_zoom,
        candidate_tiles = candidate_tiles.len(),
        "Burned footprints into tiles"
    );

    let index = FootprintIndex::new(geometries);

    let tiles: TileIndex = candidate_tiles
        .par_iter()
        .filter_map(|tile| {
            let polygon = tile.polygon();
            let selected = select_assets(&polygon, index.query(&polygon), footprints, options);
            if selected.is_empty() {
                return None;
            }
            let assets = selected.into_iter().map(|i| accessor(&footprints[i])).collect();
            Some((tile.quadkey(), assets))
        })
        .collect();

    let mut doc = MosaicJson::new(minzoom, maxzoom, Some(quadkey_zoom), bounds, tiles)?;
    doc.name = options.name.clone();
    doc.description = options.description.clone();
    doc.attribution = options.attribution.clone();

    info!(
        footprints = footprints.len(),
        tiles = doc.tiles.len(),
        quadkey_zoom,
        "Built mosaic"
    );

    Ok(doc)
}

/// Merge new footprints into an existing document.
///
/// The new footprints are indexed at the document's zooms with `options`
/// filtering, then merged per quadkey: new assets go before the existing
/// ones when `add_first` is set, after them otherwise. Duplicate identifiers
/// keep their first position. Bounds are widened and the center recomputed.
pub fn update_tiles(
    existing: &MosaicJson,
    footprints: &[Footprint],
    add_first: bool,
    options: &BuildOptions,
) -> Result<MosaicJson, MosaicError> {
    if footprints.is_empty() {
        return Ok(existing.clone());
    }

    let options = BuildOptions {
        quadkey_zoom: Some(existing.quadkey_zoom()),
        ..options.clone()
    };
    let addition = build(footprints, existing.minzoom, existing.maxzoom, &options)?;

    let mut merged = existing.clone();
    for (quadkey, new_assets) in addition.tiles {
        let old_assets = merged.tiles.remove(&quadkey).unwrap_or_default();
        let (first, second) = if add_first {
            (new_assets, old_assets)
        } else {
            (old_assets, new_assets)
        };

        let mut assets: Vec<String> = Vec::with_capacity(first.len() + second.len());
        for asset in first.into_iter().chain(second) {
            if !assets.contains(&asset) {
                assets.push(asset);
            }
        }
        merged.tiles.insert(quadkey, assets);
    }

    let [w, s, e, n] = existing.bounds;
    let [aw, as_, ae, an] = addition.bounds;
    merged.bounds = [w.min(aw), s.min(as_), e.max(ae), n.max(an)];
    merged.center = Some(center_of(&merged.bounds, merged.minzoom));
    merged.validate()?;

    debug!(
        added = footprints.len(),
        tiles = merged.tiles.len(),
        add_first,
        "Merged footprints into mosaic"
    );

    Ok(merged)
}

/// Apply cover filter, cover sort and truncation to one tile's candidates.
fn select_assets(
    tile: &Polygon<f64>,
    candidates: Vec<usize>,
    footprints: &[Footprint],
    options: &BuildOptions,
) -> Vec<usize> {
    let mut selected = if options.needs_coverage() {
        let mut scored: Vec<(usize, f64)> = candidates
            .into_iter()
            .map(|i| (i, coverage_ratio(tile, &footprints[i].geometry)))
            .collect();

        if let Some(threshold) = options.minimum_tile_cover {
            scored.retain(|(_, ratio)| *ratio > threshold);
        }
        if options.tile_cover_sort {
            // sort_by is stable: ties keep input order
            scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        }
        scored.into_iter().map(|(i, _)| i).collect()
    } else {
        candidates
    };

    if let Some(max) = options.maximum_items_per_tile {
        selected.truncate(max);
    }
    selected
}
