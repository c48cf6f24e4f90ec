//! Read GPX tracks and routes, project their way-points onto the British
//! National Grid, and summarise them as tabular records, a rebuilt GPX
//! document, a statistics report or GeoJSON.

pub mod converter;
pub mod error;
pub mod geodesy;
pub mod gpx_types;
pub mod options;
pub mod parser;
mod report;
pub mod tabular;
pub mod track;
mod writer;

use wasm_bindgen::prelude::*;

pub use crate::converter::to_feature_collection;
pub use crate::error::{Error, GridError};
pub use crate::geodesy::{FailureMode, GeoPoint, GridConverter, ProjectedPoint};
pub use crate::gpx_types::{GpxDocument, RawPoint, TrackKind};
pub use crate::options::{ProcessOptions, XmlNamespace, XmlOptions};
pub use crate::parser::parse_gpx;
pub use crate::track::{DeltaRecord, ProcessorState, TrackProcessor, TrackStatistics, WayPoint};

/// Convert GPX string to pipe-delimited National Grid records.
#[wasm_bindgen(js_name = gpxToTabular)]
pub fn gpx_to_tabular(gpx_string: &str, options: JsValue) -> Result<String, JsValue> {
    let processor = process(gpx_string, options)?;
    Ok(processor.to_tabular(None, None)?)
}

/// Rebuild a compact GPX document from the retained way-points.
#[wasm_bindgen(js_name = gpxToXml)]
pub fn gpx_to_xml(gpx_string: &str, options: JsValue, xml_options: JsValue) -> Result<String, JsValue> {
    let processor = process(gpx_string, options)?;
    let xml_options: XmlOptions = parse_options(xml_options)?;
    Ok(processor.to_xml(&xml_options)?)
}

/// Track statistics, returned as a JS object.
#[wasm_bindgen(js_name = gpxStatistics)]
pub fn gpx_statistics(gpx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
    let processor = process(gpx_string, options)?;
    let stats = processor.statistics()?;
    serde_wasm_bindgen::to_value(stats).map_err(|e| js_error(&e.to_string()))
}

/// Track statistics as fixed-column text.
#[wasm_bindgen(js_name = gpxStatisticsReport)]
pub fn gpx_statistics_report(gpx_string: &str, options: JsValue, verbose: bool) -> Result<String, JsValue> {
    let processor = process(gpx_string, options)?;
    Ok(processor.statistics_report(verbose)?)
}

/// Convert GPX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = gpxToGeoJson)]
pub fn gpx_to_geojson(gpx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
    let processor = process(gpx_string, options)?;
    let fc = converter::to_feature_collection(&processor)?;
    serde_wasm_bindgen::to_value(&fc).map_err(|e| js_error(&e.to_string()))
}

/// National Grid reference of a WGS84 position.
#[wasm_bindgen(js_name = wgs84ToNgr)]
pub fn wgs84_to_ngr(latitude: f64, longitude: f64, digits: u8) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();
    let grid = GridConverter::new(FailureMode::Raise);
    Ok(grid.to_ngr(GeoPoint::new(latitude, longitude), digits)?)
}

/// WGS84 position of a National Grid reference, as `{ latitude, longitude }`.
#[wasm_bindgen(js_name = ngrToWgs84)]
pub fn ngr_to_wgs84(ngr: &str) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let grid = GridConverter::new(FailureMode::Raise);
    let point = grid.to_geographic(ngr)?;
    serde_wasm_bindgen::to_value(&point).map_err(|e| js_error(&e.to_string()))
}

fn process(gpx_string: &str, options: JsValue) -> Result<TrackProcessor, JsValue> {
    console_error_panic_hook::set_once();

    let mut opts: ProcessOptions = parse_options(options)?;
    // never exit the host process
    opts.failure_mode = FailureMode::Raise;
    Ok(TrackProcessor::from_gpx_str(gpx_string, opts)?)
}

fn parse_options<T>(options: JsValue) -> Result<T, JsValue>
where
    T: Default + serde::de::DeserializeOwned,
{
    if options.is_undefined() || options.is_null() {
        Ok(T::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| js_error(&format!("invalid options: {e}")))
    }
}

fn js_error(message: &str) -> JsValue {
    js_sys::Error::new(message).into()
}
