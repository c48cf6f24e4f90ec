//! Pipe-delimited rendering of processed way-points.

use log::{debug, info, warn};

use crate::error::Error;
use crate::geodesy::GridConverter;
use crate::track::{DeltaRecord, TrackProcessor, WayPoint};

pub const DELIMITER: char = '|';
/// Stands in for a delimiter that occurs inside a field.
pub const ESCAPED_DELIMITER: &str = "!!!!";

/// One output row, already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularRecord {
    pub latitude: String,
    pub longitude: String,
    pub elevation: String,
    /// Present when time processing is on, possibly empty.
    pub timestamp: Option<String>,
    pub easting: i64,
    pub northing: i64,
    pub ngr: String,
    /// deltaL, deltaV and deltaS when deltas are emitted.
    pub deltas: Option<[String; 3]>,
}

impl TabularRecord {
    pub fn to_line(&self) -> String {
        let mut fields = vec![
            self.latitude.clone(),
            self.longitude.clone(),
            self.elevation.clone(),
        ];
        if let Some(ts) = &self.timestamp {
            fields.push(ts.clone());
        }
        fields.push(self.easting.to_string());
        fields.push(self.northing.to_string());
        fields.push(self.ngr.clone());
        if let Some(deltas) = &self.deltas {
            fields.extend(deltas.iter().cloned());
        }
        fields
            .iter()
            .map(|f| escape_field(f))
            .collect::<Vec<_>>()
            .join("|")
    }
}

pub fn escape_field(field: &str) -> String {
    field.replace(DELIMITER, ESCAPED_DELIMITER)
}

pub fn header(time: bool, deltas: bool) -> String {
    let mut columns = vec!["latitude", "longitude", "elevation"];
    if time {
        columns.push("timestamp");
    }
    columns.extend(["easting", "northing", "ngr"]);
    if deltas {
        columns.extend(["deltaL", "deltaV", "deltaS"]);
    }
    columns.join("|")
}

/// Way-points that survive duplicate suppression.
#[derive(Debug, Default)]
pub(crate) struct Selection {
    pub indices: Vec<usize>,
    pub duplicates: usize,
}

/// Drop way-points within `tolerance` (Manhattan metres) of the last one kept.
pub(crate) fn select(way_points: &[WayPoint], tolerance: Option<f64>) -> Selection {
    let Some(tolerance) = tolerance else {
        return Selection {
            indices: (0..way_points.len()).collect(),
            duplicates: 0,
        };
    };

    let mut selection = Selection::default();
    let mut last_kept = None;
    for (i, point) in way_points.iter().enumerate() {
        let keep = last_kept.is_none_or(|kept: &WayPoint| {
            kept.projected.manhattan_distance_to(&point.projected) as f64 > tolerance
        });
        if keep {
            selection.indices.push(i);
            last_kept = Some(point);
        } else {
            selection.duplicates += 1;
        }
    }
    selection
}

/// Format the retained way-points at the given grid reference precision.
pub fn records(processor: &TrackProcessor, precision: u8, distance_tolerance: f64) -> Result<Vec<TabularRecord>, Error> {
    let options = processor.options();
    let way_points = processor.way_points()?;
    let deltas = processor.deltas()?;
    let grid = GridConverter::new(options.failure_mode);

    if options.compute_deltas && distance_tolerance > 0.0 {
        warn!("distance tolerance of {distance_tolerance}m disabled while deltas are emitted");
    }
    let tolerance = options.effective_distance_tolerance(distance_tolerance);
    match tolerance {
        Some(t) => debug!("grid reference precision {precision}, distance tolerance {t}m"),
        None => debug!("grid reference precision {precision}, distance tolerance disabled"),
    }

    let selection = select(way_points, tolerance);
    if tolerance.is_some() {
        info!("{} duplicate records discarded", selection.duplicates);
    }

    selection
        .indices
        .iter()
        .map(|&i| -> Result<TabularRecord, Error> {
            let point = &way_points[i];
            Ok(TabularRecord {
                latitude: format!("{:+010.5}", point.latitude),
                longitude: format!("{:+010.5}", point.longitude),
                elevation: point.elevation.map(|e| format!("{e:+07.1}")).unwrap_or_default(),
                timestamp: options
                    .process_time
                    .then(|| point.timestamp.clone().unwrap_or_default()),
                easting: point.projected.easting,
                northing: point.projected.northing,
                ngr: grid.projected_to_ngr(point.projected, precision)?,
                deltas: options.compute_deltas.then(|| format_deltas(&deltas[i])),
            })
        })
        .collect()
}

fn format_deltas(delta: &DeltaRecord) -> [String; 3] {
    [
        delta.distance.map(|d| format!("{:04}", d as i64)).unwrap_or_default(),
        delta.elevation.map(|v| format!("{:+04}", v.round() as i64)).unwrap_or_default(),
        delta.time.map(|s| format!("{s:04}")).unwrap_or_default(),
    ]
}

pub(crate) fn render(processor: &TrackProcessor, precision: u8, distance_tolerance: f64) -> Result<String, Error> {
    let options = processor.options();
    let records = records(processor, precision, distance_tolerance)?;
    debug!("writing {} tabular records", records.len());

    let mut out = header(options.process_time, options.compute_deltas);
    out.push('\n');
    for record in &records {
        out.push_str(&record.to_line());
        out.push('\n');
    }
    Ok(out)
}
