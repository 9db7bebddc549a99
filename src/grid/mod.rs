//! Web Mercator tile grid.
//!
//! Conversions between geographic coordinates, XYZ tiles and quadkeys, plus
//! the tree navigation (ancestor / children) used by the mosaic lookup and
//! the coarse rasterization ("tile burning") used by the mosaic builder.
//!
//! # Quadkeys
//!
//! A quadkey is the radix-4 digit path from the root tile down to a tile:
//! one digit per zoom level, where bit 0 of the digit is the x bit and bit 1
//! is the y bit at that level. The root tile (zoom 0) has the empty quadkey.
//!
//! ```text
//!          zoom 1            zoom 2 (inside "1")
//!      ┌─────┬─────┐        ┌──────┬──────┐
//!      │  0  │  1  │        │  10  │  11  │
//!      ├─────┼─────┤        ├──────┼──────┤
//!      │  2  │  3  │        │  12  │  13  │
//!      └─────┴─────┘        └──────┴──────┘
//! ```

mod burn;

pub use burn::burn_tiles;

use std::f64::consts::PI;

use geo::{coord, Polygon, Rect};

use crate::error::GridError;

/// Maximum supported zoom level.
pub const MAX_ZOOM: u8 = 30;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -MAX_LAT;

const EPSILON: f64 = 1e-14;

/// Geographic bounding box `[west, south, east, north]` in degrees.
pub type LngLatBbox = [f64; 4];

/// Global extent used when no better bounds are known.
pub const WORLD_BOUNDS: LngLatBbox = [-180.0, -90.0, 180.0, 90.0];

/// A tile in the XYZ (slippy map) scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl Tile {
    /// Create a tile, checking that `0 <= x, y < 2^z`.
    pub fn new(x: u32, y: u32, z: u8) -> Result<Self, GridError> {
        if z > MAX_ZOOM {
            return Err(GridError::InvalidZoom(z));
        }
        let n = 1u64 << z;
        if u64::from(x) >= n || u64::from(y) >= n {
            return Err(GridError::InvalidTile { x, y, z });
        }
        Ok(Self { x, y, z })
    }

    /// Tile containing a geographic point at the given zoom.
    ///
    /// Latitudes beyond the Web Mercator limits are clamped, and points on
    /// the east/south edge of the world fall into the last tile.
    pub fn from_lng_lat(lng: f64, lat: f64, zoom: u8) -> Result<Self, GridError> {
        if zoom > MAX_ZOOM {
            return Err(GridError::InvalidZoom(zoom));
        }
        if !lng.is_finite() || !lat.is_finite() || lng.abs() > 180.0 || lat.abs() > 90.0 {
            return Err(GridError::InvalidCoordinates { lng, lat });
        }

        let lat = lat.clamp(MIN_LAT, MAX_LAT);
        let x = lng / 360.0 + 0.5;
        let sin_lat = (lat * PI / 180.0).sin();
        let y = 0.5 - 0.25 * ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / PI;

        Ok(Self {
            x: axis_to_index(x, zoom),
            y: axis_to_index(y, zoom),
            z: zoom,
        })
    }

    /// Parse a quadkey into a tile. The empty quadkey is the root tile.
    pub fn from_quadkey(quadkey: &str) -> Result<Self, GridError> {
        if quadkey.len() > MAX_ZOOM as usize {
            return Err(GridError::InvalidQuadkey(quadkey.to_string()));
        }

        let mut x = 0u32;
        let mut y = 0u32;
        for c in quadkey.chars() {
            let digit = match c {
                '0'..='3' => c as u32 - '0' as u32,
                _ => return Err(GridError::InvalidQuadkey(quadkey.to_string())),
            };
            x = (x << 1) | (digit & 1);
            y = (y << 1) | (digit >> 1);
        }

        Ok(Self {
            x,
            y,
            z: quadkey.len() as u8,
        })
    }

    /// Quadkey of this tile.
    pub fn quadkey(&self) -> String {
        let mut quadkey = String::with_capacity(self.z as usize);
        for level in (1..=self.z).rev() {
            let mask = 1u32 << (level - 1);
            let mut digit = b'0';
            if self.x & mask != 0 {
                digit += 1;
            }
            if self.y & mask != 0 {
                digit += 2;
            }
            quadkey.push(digit as char);
        }
        quadkey
    }

    /// Ancestor of this tile at a coarser zoom (the tile itself at equal zoom).
    pub fn ancestor(&self, zoom: u8) -> Option<Self> {
        if zoom > self.z {
            return None;
        }
        let shift = self.z - zoom;
        Some(Self {
            x: self.x >> shift,
            y: self.y >> shift,
            z: zoom,
        })
    }

    /// The four children at the next zoom level.
    ///
    /// Order: top-left, top-right, bottom-right, bottom-left.
    pub fn children(&self) -> [Self; 4] {
        let (x, y, z) = (self.x * 2, self.y * 2, self.z + 1);
        [
            Self { x, y, z },
            Self { x: x + 1, y, z },
            Self { x: x + 1, y: y + 1, z },
            Self { x, y: y + 1, z },
        ]
    }

    /// All descendants at a finer zoom, expanding children level by level.
    ///
    /// The count grows as `4^(zoom - z)`; callers that only need populated
    /// descendants should walk [`Tile::children`] with pruning instead.
    pub fn descendants(&self, zoom: u8) -> Vec<Self> {
        let mut tiles = vec![*self];
        while tiles.first().is_some_and(|t| t.z < zoom) {
            tiles = tiles.iter().flat_map(|t| t.children()).collect();
        }
        tiles
    }

    /// Geographic bounds `[west, south, east, north]`.
    pub fn bounds(&self) -> LngLatBbox {
        let n = (1u64 << self.z) as f64;
        let west = self.x as f64 / n * 360.0 - 180.0;
        let east = (self.x as f64 + 1.0) / n * 360.0 - 180.0;
        let north = index_to_lat(self.y as f64, n);
        let south = index_to_lat(self.y as f64 + 1.0, n);
        [west, south, east, north]
    }

    /// Tile footprint as a lng/lat polygon.
    pub fn polygon(&self) -> Polygon<f64> {
        let [west, south, east, north] = self.bounds();
        Rect::new(coord! { x: west, y: south }, coord! { x: east, y: north }).to_polygon()
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Geographic bounds covering a set of tiles, or `None` for an empty set.
pub fn tiles_bounds(tiles: &[Tile]) -> Option<LngLatBbox> {
    tiles.iter().map(Tile::bounds).reduce(|a, b| {
        [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])]
    })
}

/// Check that a string is a quadkey at exactly `zoom` digits.
pub fn is_quadkey_at_zoom(quadkey: &str, zoom: u8) -> bool {
    quadkey.len() == zoom as usize && quadkey.bytes().all(|b| (b'0'..=b'3').contains(&b))
}

#[inline]
fn axis_to_index(value: f64, zoom: u8) -> u32 {
    let n = 1u64 << zoom;
    if value <= 0.0 {
        0
    } else if value >= 1.0 {
        (n - 1) as u32
    } else {
        (((value + EPSILON) * n as f64).floor() as u64).min(n - 1) as u32
    }
}

#[inline]
fn index_to_lat(y: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * y / n)).sinh().atan() * 180.0 / PI
}
