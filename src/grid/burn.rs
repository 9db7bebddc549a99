//! Coarse rasterization of footprints onto the tile grid.

use std::collections::BTreeSet;

use geo::{BoundingRect, Intersects, Polygon};

use super::Tile;
use crate::error::GridError;

/// Enumerate the tiles at `zoom` touched by at least one polygon.
///
/// Each polygon's bounding box is converted to a tile range, and every tile
/// in that range whose square intersects the polygon is kept (edge contact
/// counts). The result is sorted and free of duplicates.
pub fn burn_tiles<'a, I>(polygons: I, zoom: u8) -> Result<Vec<Tile>, GridError>
where
    I: IntoIterator<Item = &'a Polygon<f64>>,
{
    let mut tiles = BTreeSet::new();

    for polygon in polygons {
        let Some(rect) = polygon.bounding_rect() else {
            continue;
        };
        let (min, max) = (rect.min(), rect.max());

        // North-west corner gives the smallest x/y, south-east the largest
        let top_left = Tile::from_lng_lat(min.x.max(-180.0), max.y.min(90.0), zoom)?;
        let bottom_right = Tile::from_lng_lat(max.x.min(180.0), min.y.max(-90.0), zoom)?;

        for x in top_left.x..=bottom_right.x {
            for y in top_left.y..=bottom_right.y {
                let tile = Tile { x, y, z: zoom };
                if tiles.contains(&tile) {
                    continue;
                }
                if tile.polygon().intersects(polygon) {
                    tiles.insert(tile);
                }
            }
        }
    }

    Ok(tiles.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, Rect};

    fn square(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Polygon<f64> {
        Rect::new(coord! { x: minx, y: miny }, coord! { x: maxx, y: maxy }).to_polygon()
    }

    #[test]
    fn test_burn_single_tile() {
        let polygon = square(1.0, 1.0, 2.0, 2.0);
        let tiles = burn_tiles([&polygon], 3).unwrap();
        assert_eq!(tiles, vec![Tile::from_lng_lat(1.5, 1.5, 3).unwrap()]);
    }

    #[test]
    fn test_burn_spanning_tiles() {
        // Crosses the equator and the prime meridian
        let polygon = square(-1.0, -1.0, 1.0, 1.0);
        let tiles = burn_tiles([&polygon], 4).unwrap();
        assert_eq!(tiles.len(), 4);
        assert!(tiles.iter().all(|t| t.z == 4));
    }

    #[test]
    fn test_burn_deduplicates() {
        let a = square(1.0, 1.0, 2.0, 2.0);
        let b = square(1.5, 1.5, 2.5, 2.5);
        let tiles = burn_tiles([&a, &b], 3).unwrap();
        assert_eq!(tiles.len(), 1);
    }

    #[test]
    fn test_burn_skips_bbox_corners_outside_polygon() {
        // Thin diagonal triangle: its bbox covers 4 tiles at zoom 1 but it
        // only touches the tiles along the diagonal.
        let triangle = Polygon::new(
            vec![(-170.0, -80.0), (170.0, 60.0), (170.0, 59.0), (-170.0, -80.0)].into(),
            vec![],
        );
        let tiles = burn_tiles([&triangle], 1).unwrap();
        assert_eq!(tiles.len(), 3);
        assert!(!tiles.contains(&Tile::new(0, 0, 1).unwrap()));
        assert!(tiles.contains(&Tile::new(1, 0, 1).unwrap()));
        assert!(tiles.contains(&Tile::new(0, 1, 1).unwrap()));
    }

    #[test]
    fn test_burn_empty() {
        let tiles = burn_tiles(std::iter::empty(), 5).unwrap();
        assert!(tiles.is_empty());
    }
}
