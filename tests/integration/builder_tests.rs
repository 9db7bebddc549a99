//! Index building integration tests.
//!
//! Tests verify:
//! - Builds are deterministic
//! - Keys sit at the indexing zoom and never hold empty lists
//! - Raising the coverage threshold only removes assets
//! - Coverage sort and truncation bounds
//! - Every footprint is found at its own center

use mosaic_streamer::geometry::coverage_ratio;
use mosaic_streamer::grid::{is_quadkey_at_zoom, Tile};
use mosaic_streamer::{build, items_for_point, BuildOptions, Footprint, MosaicJson};
use proptest::prelude::*;

use super::test_utils::rect_footprint;

fn footprint_strategy() -> impl Strategy<Value = Vec<Footprint>> {
    prop::collection::vec(
        (-30.0..25.0_f64, -30.0..25.0_f64, 0.5..8.0_f64, 0.5..8.0_f64),
        1..8,
    )
    .prop_map(|rects| {
        rects
            .into_iter()
            .enumerate()
            .map(|(i, (x, y, w, h))| rect_footprint(&format!("asset-{i}"), [x, y, x + w, y + h]))
            .collect()
    })
}

fn build_at(footprints: &[Footprint], zoom: u8, options: &BuildOptions) -> MosaicJson {
    build(footprints, zoom, zoom, options).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_build_is_deterministic(footprints in footprint_strategy(), zoom in 2u8..=6) {
        let options = BuildOptions {
            minimum_tile_cover: Some(0.1),
            tile_cover_sort: true,
            ..Default::default()
        };
        let first = build_at(&footprints, zoom, &options);
        let second = build_at(&footprints, zoom, &options);
        prop_assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn test_keys_at_quadkey_zoom_and_non_empty(
        footprints in footprint_strategy(),
        zoom in 2u8..=6,
        cover in 0.0..0.9_f64,
    ) {
        let options = BuildOptions {
            minimum_tile_cover: Some(cover),
            ..Default::default()
        };
        let doc = build_at(&footprints, zoom, &options);
        for (quadkey, assets) in &doc.tiles {
            prop_assert!(is_quadkey_at_zoom(quadkey, zoom));
            prop_assert!(!assets.is_empty());
        }
    }

    #[test]
    fn test_higher_cover_threshold_only_removes(
        footprints in footprint_strategy(),
        zoom in 2u8..=6,
        low in 0.0..0.5_f64,
        delta in 0.0..0.5_f64,
    ) {
        let loose = build_at(&footprints, zoom, &BuildOptions {
            minimum_tile_cover: Some(low),
            ..Default::default()
        });
        let strict = build_at(&footprints, zoom, &BuildOptions {
            minimum_tile_cover: Some(low + delta),
            ..Default::default()
        });

        for (quadkey, assets) in &strict.tiles {
            let loose_assets = loose.tiles.get(quadkey);
            prop_assert!(loose_assets.is_some());
            let loose_assets = loose_assets.unwrap();
            for asset in assets {
                prop_assert!(loose_assets.contains(asset));
            }
        }
    }

    #[test]
    fn test_truncation_bound(
        footprints in footprint_strategy(),
        zoom in 2u8..=6,
        max in 1usize..4,
    ) {
        let full = build_at(&footprints, zoom, &BuildOptions::default());
        let truncated = build_at(&footprints, zoom, &BuildOptions {
            maximum_items_per_tile: Some(max),
            ..Default::default()
        });

        prop_assert_eq!(full.tiles.len(), truncated.tiles.len());
        for (quadkey, assets) in &truncated.tiles {
            let expected: Vec<String> = full.tiles[quadkey].iter().take(max).cloned().collect();
            prop_assert_eq!(assets, &expected);
        }
    }

    #[test]
    fn test_cover_sort_is_descending(footprints in footprint_strategy(), zoom in 2u8..=5) {
        let doc = build_at(&footprints, zoom, &BuildOptions {
            tile_cover_sort: true,
            ..Default::default()
        });

        for (quadkey, assets) in &doc.tiles {
            let tile = Tile::from_quadkey(quadkey).unwrap().polygon();
            let ratios: Vec<f64> = assets
                .iter()
                .map(|id| {
                    let footprint = footprints.iter().find(|f| &f.id == id).unwrap();
                    coverage_ratio(&tile, &footprint.geometry)
                })
                .collect();
            for pair in ratios.windows(2) {
                prop_assert!(pair[0] >= pair[1], "ratios not descending: {:?}", ratios);
            }
        }
    }

    #[test]
    fn test_footprint_found_at_its_center(footprints in footprint_strategy(), zoom in 2u8..=6) {
        let doc = build_at(&footprints, zoom, &BuildOptions::default());
        for footprint in &footprints {
            let [w, s, e, n] = footprint.bounds;
            let assets = items_for_point(&doc, (w + e) / 2.0, (s + n) / 2.0).unwrap();
            prop_assert!(assets.contains(&footprint.id));
        }
    }
}

#[test]
fn test_quadkey_zoom_above_minzoom() {
    let footprints = vec![rect_footprint("a", [0.0, 0.0, 1.0, 1.0])];
    let doc = build(
        &footprints,
        4,
        10,
        &BuildOptions {
            quadkey_zoom: Some(8),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(doc.minzoom, 4);
    assert_eq!(doc.quadkey_zoom(), 8);
    assert!(doc.tiles.keys().all(|k| k.len() == 8));

    // A z4 request aggregates its z8 descendants
    let tile = Tile::from_lng_lat(0.5, 0.5, 4).unwrap();
    let assets = mosaic_streamer::items_for_tile(&doc, tile.x, tile.y, tile.z).unwrap();
    assert_eq!(assets, vec!["a"]);
}
