use geojson::{Feature, FeatureCollection, Geometry, Value};
use log::debug;
use serde_json::{Map, Value as JsonValue};

use crate::error::Error;
use crate::geodesy::GridConverter;
use crate::track::{TrackProcessor, WayPoint};

/// Convert the retained way-points of a processed track to a GeoJSON FeatureCollection.
///
/// A processor without data yields an empty collection.
pub fn to_feature_collection(processor: &TrackProcessor) -> Result<FeatureCollection, Error> {
    let (Some(kind), true) = (processor.kind(), processor.is_valid()) else {
        return Ok(empty_collection(Vec::new()));
    };
    let way_points = processor.way_points()?;
    let stats = processor.statistics()?;

    let geometry = match way_points {
        [single] => Geometry::new(Value::Point(point_coords(single))),
        points => Geometry::new(Value::LineString(points.iter().map(point_coords).collect())),
    };

    let mut props = Map::new();
    props.insert("gpxType".to_string(), JsonValue::String(kind.as_str().to_string()));
    insert_optional(&mut props, "name", processor.name());
    insert_optional(&mut props, "desc", processor.desc());
    props.insert("statistics".to_string(), serde_json::to_value(stats)?);
    insert_coordinate_properties(&mut props, processor, way_points)?;
    debug!("built {} feature from {} way-points", kind.as_str(), way_points.len());

    Ok(empty_collection(vec![Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }]))
}

fn empty_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Build [lon, lat] or [lon, lat, ele] coordinate array.
fn point_coords(pt: &WayPoint) -> Vec<f64> {
    match pt.elevation {
        Some(ele) => vec![pt.longitude, pt.latitude, ele],
        None => vec![pt.longitude, pt.latitude],
    }
}

fn insert_optional(props: &mut Map<String, JsonValue>, key: &str, value: Option<&str>) {
    if let Some(v) = value {
        props.insert(key.to_string(), JsonValue::String(v.to_string()));
    }
}

fn insert_coordinate_properties(
    props: &mut Map<String, JsonValue>,
    processor: &TrackProcessor,
    points: &[WayPoint],
) -> Result<(), Error> {
    let options = processor.options();
    let grid = GridConverter::new(options.failure_mode);
    let mut coord_props = Map::new();

    let times: Vec<JsonValue> = points
        .iter()
        .map(|pt| match &pt.timestamp {
            Some(t) => JsonValue::String(t.clone()),
            None => JsonValue::Null,
        })
        .collect();
    // Only include if at least one time is present
    if times.iter().any(|t| !t.is_null()) {
        coord_props.insert("times".to_string(), JsonValue::Array(times));
    }

    let ngr = points
        .iter()
        .map(|pt| grid.projected_to_ngr(pt.projected, options.precision).map(JsonValue::String))
        .collect::<Result<Vec<_>, _>>()?;
    coord_props.insert("ngr".to_string(), JsonValue::Array(ngr));

    props.insert(
        "coordinateProperties".to_string(),
        JsonValue::Object(coord_props),
    );
    Ok(())
}
