//! Footprints from GeoJSON features.
//!
//! Accepts a FeatureCollection, a single Feature or a bare array of
//! features. Each feature must carry a Polygon geometry (only the exterior
//! ring is used) and a `path` or `id` property naming the dataset. Optional
//! properties: `minzoom`, `maxzoom`, `datatype`.

use geo::{LineString, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::Footprint;
use crate::error::MosaicError;

#[derive(Deserialize)]
#[serde(untagged)]
enum Input {
    Collection(Collection),
    Features(Vec<Feature>),
    Feature(Feature),
}

#[derive(Deserialize)]
struct Collection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Vec<Vec<f64>>>,
}

/// Parse footprints from GeoJSON bytes.
pub fn footprints_from_geojson(data: &[u8]) -> Result<Vec<Footprint>, MosaicError> {
    let input: Input = serde_json::from_slice(data).map_err(|e| decode_error(e.to_string()))?;

    let features = match input {
        Input::Collection(collection) => {
            if collection.kind != "FeatureCollection" {
                return Err(decode_error(format!(
                    "expected a FeatureCollection, got {}",
                    collection.kind
                )));
            }
            collection.features
        }
        Input::Features(features) => features,
        Input::Feature(feature) => vec![feature],
    };

    features
        .into_iter()
        .enumerate()
        .map(|(i, feature)| feature_to_footprint(i, feature))
        .collect()
}

fn feature_to_footprint(index: usize, feature: Feature) -> Result<Footprint, MosaicError> {
    if feature.geometry.kind != "Polygon" {
        return Err(decode_error(format!(
            "feature {index}: unsupported geometry type {}",
            feature.geometry.kind
        )));
    }

    let exterior = feature
        .geometry
        .coordinates
        .into_iter()
        .next()
        .ok_or_else(|| decode_error(format!("feature {index}: polygon has no rings")))?;

    let ring: Vec<(f64, f64)> = exterior
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok((*x, *y)),
            _ => Err(decode_error(format!("feature {index}: invalid position"))),
        })
        .collect::<Result<_, _>>()?;

    if ring.len() < 4 {
        return Err(decode_error(format!(
            "feature {index}: a polygon ring needs at least 4 positions"
        )));
    }

    let props = &feature.properties;
    let id = props
        .get("path")
        .or_else(|| props.get("id"))
        .and_then(Value::as_str)
        .ok_or_else(|| decode_error(format!("feature {index}: missing 'path' property")))?;

    let mut footprint = Footprint::new(id, Polygon::new(LineString::from(ring), vec![]));
    footprint.native_minzoom = zoom_property(props, "minzoom");
    footprint.native_maxzoom = zoom_property(props, "maxzoom");
    footprint.datatype = props
        .get("datatype")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(footprint)
}

fn zoom_property(props: &Map<String, Value>, key: &str) -> Option<u8> {
    props
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|z| u8::try_from(z).ok())
}

fn decode_error(reason: String) -> MosaicError {
    MosaicError::Decode {
        location: "geojson".to_string(),
        reason,
    }
}
