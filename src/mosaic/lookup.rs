//! Asset lookups against a mosaic document.
//!
//! The document is keyed at a single zoom (`quadkey_zoom`), so requests at
//! other zooms are reconciled:
//!
//! ```text
//! z == quadkey_zoom   direct key lookup
//! z >  quadkey_zoom   lookup of the ancestor at quadkey_zoom
//! z <  quadkey_zoom   union of all descendants at quadkey_zoom,
//!                     children visited TL, TR, BR, BL,
//!                     duplicates keep their first position
//! ```
//!
//! The descendant walk skips any subtree with no key under its quadkey
//! prefix, which the sorted `tiles` map answers with a single range query.

use std::collections::HashSet;

use super::{MosaicJson, TileIndex};
use crate::error::GridError;
use crate::grid::Tile;

/// Assets for tile `(x, y, z)`, in document order.
///
/// A tile with no covering assets yields an empty list.
pub fn items_for_tile(doc: &MosaicJson, x: u32, y: u32, z: u8) -> Result<Vec<String>, GridError> {
    let tile = Tile::new(x, y, z)?;
    let quadkey_zoom = doc.quadkey_zoom();

    if let Some(ancestor) = tile.ancestor(quadkey_zoom) {
        return Ok(doc
            .tiles
            .get(&ancestor.quadkey())
            .cloned()
            .unwrap_or_default());
    }

    let mut collector = Collector::default();
    collect_descendants(&doc.tiles, tile, quadkey_zoom, &mut collector);
    Ok(collector.assets)
}

/// Assets for the tile containing `(lng, lat)` at the indexing zoom.
pub fn items_for_point(doc: &MosaicJson, lng: f64, lat: f64) -> Result<Vec<String>, GridError> {
    let tile = Tile::from_lng_lat(lng, lat, doc.quadkey_zoom())?;
    items_for_tile(doc, tile.x, tile.y, tile.z)
}

#[derive(Default)]
struct Collector<'a> {
    seen: HashSet<&'a str>,
    assets: Vec<String>,
}

fn collect_descendants<'a>(tiles: &'a TileIndex, tile: Tile, zoom: u8, out: &mut Collector<'a>) {
    let quadkey = tile.quadkey();

    if tile.z == zoom {
        if let Some(assets) = tiles.get(&quadkey) {
            for asset in assets {
                if out.seen.insert(asset.as_str()) {
                    out.assets.push(asset.clone());
                }
            }
        }
        return;
    }

    let populated = tiles
        .range(quadkey.clone()..)
        .next()
        .is_some_and(|(key, _)| key.starts_with(&quadkey));
    if !populated {
        return;
    }

    for child in tile.children() {
        collect_descendants(tiles, child, zoom, out);
    }
}
