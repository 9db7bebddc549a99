//! Geometry helpers for mosaic construction.
//!
//! - [`union_bounds`]: bounding box of a batch of footprints
//! - [`FootprintIndex`]: bulk-loaded spatial index answering "which
//!   footprints intersect this tile"
//! - [`coverage_ratio`]: fraction of a tile covered by a footprint
//!
//! All computations are planar, in lng/lat degrees.

use geo::{Area, BooleanOps, BoundingRect, Intersects, Polygon, Rect};
use rstar::{RTree, RTreeObject, AABB};

use crate::grid::LngLatBbox;

/// Bounding box `[minx, miny, maxx, maxy]` of all polygons, if any.
pub fn union_bounds<'a, I>(polygons: I) -> Option<LngLatBbox>
where
    I: IntoIterator<Item = &'a Polygon<f64>>,
{
    polygons
        .into_iter()
        .filter_map(|p| p.bounding_rect())
        .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y])
        .reduce(|a, b| [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])])
}

/// Fraction of `tile`'s area covered by `geometry`, in `[0, 1]`.
pub fn coverage_ratio(tile: &Polygon<f64>, geometry: &Polygon<f64>) -> f64 {
    let tile_area = tile.unsigned_area();
    if tile_area <= 0.0 {
        return 0.0;
    }
    let covered = tile.intersection(geometry).unsigned_area();
    (covered / tile_area).clamp(0.0, 1.0)
}

/// Bounding box of one footprint, tagged with its input position.
struct IndexEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn rect_envelope(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// R-tree over the envelopes of a batch of polygons.
///
/// Envelope hits are confirmed with the exact `intersects` predicate, so
/// results never contain envelope-only false positives.
pub struct FootprintIndex<'a> {
    geometries: Vec<&'a Polygon<f64>>,
    tree: RTree<IndexEntry>,
}

impl<'a> FootprintIndex<'a> {
    /// Bulk-load the index. Entry `i` refers to the i-th polygon.
    pub fn new<I>(polygons: I) -> Self
    where
        I: IntoIterator<Item = &'a Polygon<f64>>,
    {
        let geometries: Vec<&'a Polygon<f64>> = polygons.into_iter().collect();

        let entries: Vec<IndexEntry> = geometries
            .iter()
            .enumerate()
            .filter_map(|(index, p)| {
                p.bounding_rect().map(|rect| IndexEntry {
                    index,
                    envelope: rect_envelope(rect),
                })
            })
            .collect();

        Self {
            geometries,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed geometries.
    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    /// True if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Indices of the geometries intersecting `query`, in ascending order.
    pub fn query(&self, query: &Polygon<f64>) -> Vec<usize> {
        let Some(query_rect) = query.bounding_rect() else {
            return Vec::new();
        };

        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&rect_envelope(query_rect))
            .map(|entry| entry.index)
            .filter(|i| self.geometries[*i].intersects(query))
            .collect();

        hits.sort_unstable();
        hits
    }
}
