//! Filtering and measurement of a GPX track or route.
//!
//! A [`TrackProcessor`] is built from a parsed document in one go: way-points
//! are extracted and measured, then elevation statistics are computed, and
//! the result is frozen. Every accessor after that is a pure read.

use std::path::Path;

use chrono::NaiveDateTime;
use log::{debug, info, trace, warn};
use serde::Serialize;

use crate::error::Error;
use crate::geodesy::{GeoPoint, ProjectedPoint, to_projected};
use crate::gpx_types::{GpxDocument, RawPoint, TrackKind};
use crate::options::{ProcessOptions, XmlOptions};
use crate::parser::parse_gpx;
use crate::{report, tabular, writer};

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessorState {
    Initializing,
    Importing,
    ExtractingWayPoints,
    ComputingElevationStats,
    Ready,
    /// The document has neither `<trkpt>` nor `<rtept>` elements.
    NoData,
}

/// A retained vertex, projected onto the National Grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WayPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    /// `<time>` text with fractional seconds removed.
    pub timestamp: Option<String>,
    pub projected: ProjectedPoint,
    #[serde(skip)]
    seconds: Option<i64>,
}

/// Change from the previous retained way-point; all `None` for the first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DeltaRecord {
    /// Planar distance in metres, to 0.1m.
    pub distance: Option<f64>,
    /// Signed elevation change in metres, to 0.1m.
    pub elevation: Option<f64>,
    /// Whole seconds.
    pub time: Option<i64>,
}

/// Snapshot of everything measured while processing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStatistics {
    pub points_read: usize,
    pub points_retained: usize,
    /// `None` unless time filtering was active.
    pub discarded_by_time: Option<usize>,
    /// Tabular duplicates for the configured distance tolerance; `None` when suppression is off.
    pub duplicates_discarded: Option<usize>,
    pub records_retained: usize,
    /// Path length in metres.
    pub distance: f64,
    pub distance_km: f64,
    pub max_distance_delta: f64,
    /// Largest elevation change by magnitude, sign kept.
    pub max_elevation_delta: Option<f64>,
    pub max_time_delta: Option<i64>,
    pub increments_ignored: Option<usize>,
    pub adjusted_gain: Option<f64>,
    pub adjusted_loss: Option<f64>,
    pub raw_gain: Option<f64>,
    pub raw_loss: Option<f64>,
    pub start_elevation: Option<f64>,
    pub end_elevation: Option<f64>,
    pub high_elevation: Option<f64>,
    pub low_elevation: Option<f64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub elapsed_seconds: Option<i64>,
    pub start_point: Option<ProjectedPoint>,
    pub end_point: Option<ProjectedPoint>,
    pub time_tags_found: bool,
}

#[derive(Debug, Clone)]
pub struct TrackProcessor {
    state: ProcessorState,
    kind: Option<TrackKind>,
    options: ProcessOptions,
    name: Option<String>,
    desc: Option<String>,
    way_points: Vec<WayPoint>,
    deltas: Vec<DeltaRecord>,
    stats: TrackStatistics,
}

impl TrackProcessor {
    /// Process a parsed document.
    ///
    /// A document without way-points is not an error: the processor ends up
    /// in [`ProcessorState::NoData`] and [`is_valid`](Self::is_valid) is false.
    /// An unreadable `<time>` is handled according to the configured failure mode.
    pub fn new(document: GpxDocument, options: ProcessOptions) -> Result<Self> {
        let mut processor = Self {
            state: ProcessorState::Initializing,
            kind: None,
            options,
            name: None,
            desc: None,
            way_points: Vec::new(),
            deltas: Vec::new(),
            stats: TrackStatistics::default(),
        };

        processor.transition(ProcessorState::Importing);
        processor.name = document.name.clone();
        processor.desc = document.desc.clone();
        let Some((kind, points)) = document.vertices() else {
            warn!("no <trkpt> or <rtept> elements found");
            processor.transition(ProcessorState::NoData);
            return Ok(processor);
        };
        processor.kind = Some(kind);
        debug!("reading {} <{}> elements", points.len(), kind.vertex_tag());

        processor.transition(ProcessorState::ExtractingWayPoints);
        let extracted = processor.extract(points);
        processor
            .options
            .failure_mode
            .settle("extracting way-points", extracted)?;

        processor.transition(ProcessorState::ComputingElevationStats);
        processor.compute_elevation_stats();
        processor.count_duplicates();

        processor.transition(ProcessorState::Ready);
        Ok(processor)
    }

    /// Parse and process GPX text; malformed XML is handled according to the failure mode.
    pub fn from_gpx_str(gpx: &str, options: ProcessOptions) -> Result<Self> {
        let document = options.failure_mode.settle("parsing GPX", parse_gpx(gpx))?;
        Self::new(document, options)
    }

    /// Read, parse and process a GPX file.
    pub fn open(path: impl AsRef<Path>, options: ProcessOptions) -> Result<Self> {
        let path = path.as_ref();
        info!("reading {}", path.display());
        let text = options
            .failure_mode
            .settle("reading GPX file", std::fs::read_to_string(path).map_err(Error::from))?;
        Self::from_gpx_str(&text, options)
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.state == ProcessorState::Ready
    }

    /// Track or route, once way-points were found.
    pub fn kind(&self) -> Option<TrackKind> {
        self.kind
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }

    pub fn statistics(&self) -> Result<&TrackStatistics> {
        self.ensure_ready()?;
        Ok(&self.stats)
    }

    pub fn way_points(&self) -> Result<&[WayPoint]> {
        self.ensure_ready()?;
        Ok(&self.way_points)
    }

    /// One record per way-point, in the same order.
    pub fn deltas(&self) -> Result<&[DeltaRecord]> {
        self.ensure_ready()?;
        Ok(&self.deltas)
    }

    /// Pipe-delimited records; `None` falls back to the configured precision and tolerance.
    pub fn to_tabular(&self, precision: Option<u8>, distance_tolerance: Option<f64>) -> Result<String> {
        self.ensure_ready()?;
        tabular::render(
            self,
            precision.unwrap_or(self.options.precision),
            distance_tolerance.unwrap_or(self.options.distance_tolerance),
        )
    }

    /// Compact GPX document rebuilt from the tabular records.
    pub fn to_xml(&self, xml_options: &XmlOptions) -> Result<String> {
        self.ensure_ready()?;
        writer::render(self, xml_options)
    }

    pub fn statistics_report(&self, verbose: bool) -> Result<String> {
        let stats = self.statistics()?;
        Ok(report::render(self, stats, verbose))
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            ProcessorState::Ready => Ok(()),
            ProcessorState::NoData => Err(Error::InvalidState("document has no <trkpt> or <rtept> elements")),
            _ => Err(Error::InvalidState("processing has not finished")),
        }
    }

    fn transition(&mut self, next: ProcessorState) {
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn extract(&mut self, points: &[RawPoint]) -> Result<()> {
        let process_time = self.options.process_time;
        let filter_by_time = self.options.filters_by_time();
        let tolerance = self.options.time_tolerance;
        let mut last_kept_seconds: Option<i64> = None;
        let mut discarded = 0;
        let mut distance = 0.0;

        if filter_by_time {
            debug!("way-point time tolerance {tolerance}s");
        } else if process_time {
            debug!("way-point time tolerance disabled");
        } else {
            debug!("<time> elements ignored");
        }

        for raw in points {
            let (timestamp, seconds) = match &raw.time {
                Some(text) if process_time => {
                    let timestamp = strip_fraction(text);
                    let seconds = parse_seconds(&timestamp)?;
                    (Some(timestamp), Some(seconds))
                }
                _ => (None, None),
            };

            if let (true, Some(now), Some(previous)) = (filter_by_time, seconds, last_kept_seconds) {
                if now - previous < tolerance {
                    discarded += 1;
                    continue;
                }
            }
            if seconds.is_some() {
                last_kept_seconds = seconds;
            }

            let point = WayPoint {
                latitude: raw.lat,
                longitude: raw.lon,
                elevation: raw.ele,
                timestamp,
                projected: to_projected(GeoPoint::new(raw.lat, raw.lon)),
                seconds,
            };
            let delta = match self.way_points.last() {
                Some(previous) => {
                    let step = previous.projected.distance_to(&point.projected);
                    distance += step;
                    DeltaRecord {
                        distance: Some(round1(step)),
                        elevation: point.elevation.zip(previous.elevation).map(|(e, p)| round1(e - p)),
                        time: point.seconds.zip(previous.seconds).map(|(s, p)| s - p),
                    }
                }
                None => DeltaRecord::default(),
            };

            let number = self.way_points.len() + 1;
            self.track_maxima(number, &point, &delta, distance);
            self.way_points.push(point);
            self.deltas.push(delta);
        }

        let stats = &mut self.stats;
        stats.points_read = points.len();
        stats.points_retained = self.way_points.len();
        stats.discarded_by_time = filter_by_time.then_some(discarded);
        stats.distance = distance;
        stats.distance_km = (distance / 10.0).round() / 100.0;
        stats.time_tags_found = process_time && points.iter().any(|p| p.time.is_some());

        if let (Some(first), Some(last)) = (self.way_points.first(), self.way_points.last()) {
            stats.start_point = Some(first.projected);
            stats.end_point = Some(last.projected);
            stats.start_time = first.timestamp.clone();
            if self.way_points.len() > 1 {
                stats.end_time = last.timestamp.clone();
                stats.elapsed_seconds = last.seconds.zip(first.seconds).map(|(end, start)| end - start);
            }
        }

        if process_time && !stats.time_tags_found {
            warn!("no <time> elements found");
        }
        if discarded > 0 {
            info!("{discarded} way-points discarded within {tolerance}s of the previous one");
        }
        debug!(
            "{} of {} way-points retained, {:.2}km",
            stats.points_retained, stats.points_read, stats.distance_km
        );
        Ok(())
    }

    fn track_maxima(&mut self, number: usize, point: &WayPoint, delta: &DeltaRecord, distance: f64) {
        let options = &self.options;
        let stats = &mut self.stats;

        if let Some(step) = delta.distance {
            stats.max_distance_delta = stats.max_distance_delta.max(step);
            if step > options.max_distance_delta {
                warn!("way-point {number}: large distance delta {step:.1}m ({distance:.0}m travelled)");
            }
        }
        if let Some(rise) = delta.elevation {
            if stats.max_elevation_delta.is_none_or(|max| rise.abs() > max.abs()) {
                stats.max_elevation_delta = Some(rise);
            }
            if rise.abs() > options.max_elevation_delta {
                warn!(
                    "way-point {number}: large elevation delta {rise:+.1}m (at {:.1}m)",
                    point.elevation.unwrap_or_default()
                );
            }
        }
        if let Some(gap) = delta.time {
            stats.max_time_delta = Some(stats.max_time_delta.map_or(gap, |max| max.max(gap)));
            if gap > options.max_time_delta {
                info!(
                    "way-point {number}: large time delta {gap}s ({})",
                    point.timestamp.as_deref().unwrap_or_default()
                );
            }
        }

        if options.compute_deltas {
            trace!(
                "way-point {number:5}: deltaL {:5.1}m, deltaV {}, deltaS {}",
                delta.distance.unwrap_or_default(),
                delta.elevation.map_or("-".to_string(), |v| format!("{v:+.1}m")),
                delta.time.map_or("-".to_string(), |s| format!("{s}s")),
            );
        }
    }

    fn compute_elevation_stats(&mut self) {
        let tolerance = self.options.elevation_tolerance;
        let elevations: Vec<f64> = self.way_points.iter().filter_map(|p| p.elevation).collect();
        let stats = &mut self.stats;

        let (Some(&first), Some(&last)) = (elevations.first(), elevations.last()) else {
            warn!("no <ele> elements present");
            return;
        };

        let mut high = first;
        let mut low = first;
        let (mut raw_gain, mut raw_loss) = (0.0, 0.0);
        let (mut gain, mut loss) = (0.0, 0.0);
        let mut ignored = 0;
        let mut reference = first;

        for pair in elevations.windows(2) {
            let (previous, elevation) = (pair[0], pair[1]);
            high = high.max(elevation);
            low = low.min(elevation);

            let step = elevation - previous;
            if step > 0.0 {
                raw_gain += step;
            } else {
                raw_loss -= step;
            }

            let rise = elevation - reference;
            if rise > tolerance {
                gain += rise;
                reference = elevation;
            } else if rise < -tolerance {
                loss -= rise;
                reference = elevation;
            } else if rise != 0.0 {
                ignored += 1;
            }
        }

        debug!("elevation tolerance {tolerance}m, {ignored} increments ignored");
        stats.start_elevation = Some(first);
        stats.end_elevation = Some(last);
        stats.high_elevation = Some(high);
        stats.low_elevation = Some(low);
        stats.raw_gain = Some(round1(raw_gain));
        stats.raw_loss = Some(round1(raw_loss));
        stats.adjusted_gain = Some(round1(gain));
        stats.adjusted_loss = Some(round1(loss));
        stats.increments_ignored = Some(ignored);
    }

    fn count_duplicates(&mut self) {
        let tolerance = self.options.effective_distance_tolerance(self.options.distance_tolerance);
        let selection = tabular::select(&self.way_points, tolerance);
        self.stats.duplicates_discarded = tolerance.map(|_| selection.duplicates);
        self.stats.records_retained = selection.indices.len();
    }
}

impl WayPoint {
    /// Seconds since the Unix epoch, ignoring any time-zone suffix.
    pub fn seconds(&self) -> Option<i64> {
        self.seconds
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Remove the fractional part of the seconds, keeping any zone suffix.
fn strip_fraction(timestamp: &str) -> String {
    let Some(dot) = timestamp.find('.') else {
        return timestamp.to_string();
    };
    let rest = &timestamp[dot + 1..];
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return timestamp.to_string();
    }
    format!("{}{}", &timestamp[..dot], &rest[digits..])
}

/// Whole seconds of a GPX timestamp; only the `YYYY-MM-DDTHH:MM:SS` part is read.
fn parse_seconds(timestamp: &str) -> Result<i64> {
    let invalid = || Error::InvalidTimestamp(timestamp.to_string());
    let head = timestamp.get(..19).ok_or_else(invalid)?;
    let parsed = NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S").map_err(|_| invalid())?;
    Ok(parsed.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::FailureMode;

    fn raising() -> ProcessOptions {
        ProcessOptions {
            failure_mode: FailureMode::Raise,
            ..Default::default()
        }
    }

    fn track(points: Vec<RawPoint>) -> GpxDocument {
        GpxDocument {
            track_points: points,
            ..Default::default()
        }
    }

    fn timed(lat: f64, seconds: u32) -> RawPoint {
        let time = format!("2015-06-08T10:{:02}:{:02}Z", seconds / 60, seconds % 60);
        RawPoint::new(lat, -1.7).with_time(&time)
    }

    #[test]
    fn test_strip_fraction() {
        assert_eq!(strip_fraction("2015-06-08T09:56:51.9531659+01:00"), "2015-06-08T09:56:51+01:00");
        assert_eq!(strip_fraction("2015-06-08T09:56:51.25Z"), "2015-06-08T09:56:51Z");
        assert_eq!(strip_fraction("2015-06-08T09:56:51Z"), "2015-06-08T09:56:51Z");
    }

    #[test]
    fn test_parse_seconds() {
        let a = parse_seconds("2015-06-08T09:56:51+01:00").unwrap();
        let b = parse_seconds("2015-06-08T10:56:52Z").unwrap();
        assert_eq!(b - a, 3601);
        assert!(matches!(parse_seconds("yesterday"), Err(Error::InvalidTimestamp(_))));
        assert!(matches!(parse_seconds("2015-13-08T09:56:51Z"), Err(Error::InvalidTimestamp(_))));
    }

    #[test]
    fn test_elevation_hysteresis() {
        let doc = track(vec![
            RawPoint::new(53.1, -1.7).with_ele(100.0),
            RawPoint::new(53.101, -1.7).with_ele(103.0),
            RawPoint::new(53.102, -1.7).with_ele(98.0),
        ]);
        let processor = TrackProcessor::new(doc, raising()).unwrap();
        let stats = processor.statistics().unwrap();
        assert_eq!(stats.raw_gain, Some(3.0));
        assert_eq!(stats.raw_loss, Some(5.0));
        assert_eq!(stats.adjusted_gain, Some(0.0));
        assert_eq!(stats.adjusted_loss, Some(0.0));
        assert_eq!(stats.increments_ignored, Some(2));
        assert_eq!(stats.high_elevation, Some(103.0));
        assert_eq!(stats.low_elevation, Some(98.0));
        assert_eq!(stats.start_elevation, Some(100.0));
        assert_eq!(stats.end_elevation, Some(98.0));
        assert_eq!(stats.max_elevation_delta, Some(-5.0));
    }

    #[test]
    fn test_reference_only_moves_past_tolerance() {
        // 100 -> 104 (ignored) -> 108 (+8 from 100) -> 101 (-7 from 108)
        let doc = track(
            [100.0, 104.0, 108.0, 101.0]
                .iter()
                .enumerate()
                .map(|(i, &e)| RawPoint::new(53.1 + i as f64 * 0.001, -1.7).with_ele(e))
                .collect(),
        );
        let stats = TrackProcessor::new(doc, raising()).unwrap().statistics().unwrap().clone();
        assert_eq!(stats.adjusted_gain, Some(8.0));
        assert_eq!(stats.adjusted_loss, Some(7.0));
        assert_eq!(stats.increments_ignored, Some(1));
        assert_eq!(stats.raw_gain, Some(8.0));
        assert_eq!(stats.raw_loss, Some(7.0));
    }

    #[test]
    fn test_missing_elevations() {
        let doc = track(vec![RawPoint::new(53.1, -1.7), RawPoint::new(53.101, -1.7)]);
        let processor = TrackProcessor::new(doc, raising()).unwrap();
        let stats = processor.statistics().unwrap();
        assert_eq!(stats.high_elevation, None);
        assert_eq!(stats.adjusted_gain, None);
        assert_eq!(stats.increments_ignored, None);
        assert_eq!(stats.max_elevation_delta, None);
        assert!(processor.deltas().unwrap().iter().all(|d| d.elevation.is_none()));
    }

    #[test]
    fn test_time_filter_discards_close_points() {
        let doc = track(vec![timed(53.10, 0), timed(53.11, 5), timed(53.12, 12), timed(53.13, 20), timed(53.14, 23)]);
        let processor = TrackProcessor::new(doc, raising()).unwrap();
        let stats = processor.statistics().unwrap();
        assert_eq!(stats.points_read, 5);
        assert_eq!(stats.points_retained, 2);
        assert_eq!(stats.discarded_by_time, Some(3));
        let lats: Vec<f64> = processor.way_points().unwrap().iter().map(|p| p.latitude).collect();
        assert_eq!(lats, vec![53.10, 53.12]);
        assert_eq!(processor.deltas().unwrap()[1].time, Some(12));
        assert_eq!(stats.elapsed_seconds, Some(12));
    }

    #[test]
    fn test_time_filter_keeps_untimed_points() {
        let doc = track(vec![timed(53.10, 0), RawPoint::new(53.11, -1.7), timed(53.12, 3)]);
        let processor = TrackProcessor::new(doc, raising()).unwrap();
        let stats = processor.statistics().unwrap();
        assert_eq!(stats.points_retained, 2);
        assert_eq!(stats.end_time, None);
        assert_eq!(processor.deltas().unwrap()[1].time, None);
    }

    #[test]
    fn test_time_filter_disabled() {
        let doc = track(vec![timed(53.10, 0), timed(53.11, 1), timed(53.12, 2)]);
        let options = ProcessOptions {
            time_tolerance: 0,
            ..raising()
        };
        let stats = TrackProcessor::new(doc.clone(), options).unwrap().statistics().unwrap().clone();
        assert_eq!(stats.points_retained, 3);
        assert_eq!(stats.discarded_by_time, None);
        assert_eq!(stats.max_time_delta, Some(1));

        let options = ProcessOptions {
            process_time: false,
            ..raising()
        };
        let processor = TrackProcessor::new(doc, options).unwrap();
        let stats = processor.statistics().unwrap();
        assert_eq!(stats.points_retained, 3);
        assert_eq!(stats.start_time, None);
        assert!(!stats.time_tags_found);
        assert!(processor.way_points().unwrap().iter().all(|p| p.timestamp.is_none()));
    }

    #[test]
    fn test_distance_accumulates() {
        let doc = track(vec![
            RawPoint::new(53.10, -1.7),
            RawPoint::new(53.11, -1.7),
            RawPoint::new(53.12, -1.7),
        ]);
        let processor = TrackProcessor::new(doc, raising()).unwrap();
        let stats = processor.statistics().unwrap();
        let deltas = processor.deltas().unwrap();
        assert_eq!(deltas[0], DeltaRecord::default());
        let first = deltas[1].distance.unwrap();
        let second = deltas[2].distance.unwrap();
        // a hundredth of a degree of latitude is a little over a kilometre
        assert!(first > 1100.0 && first < 1120.0, "{first}");
        assert!((stats.distance - first - second).abs() < 0.2);
        assert_eq!(stats.max_distance_delta, first.max(second));
        assert_eq!(stats.distance_km, (stats.distance / 10.0).round() / 100.0);
        assert_eq!(stats.start_point, Some(processor.way_points().unwrap()[0].projected));
    }

    #[test]
    fn test_invalid_timestamp_raises() {
        let doc = track(vec![RawPoint::new(53.1, -1.7).with_time("noon")]);
        assert!(matches!(
            TrackProcessor::new(doc, raising()),
            Err(Error::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_invalid_timestamp_ignored_without_time_processing() {
        let doc = track(vec![RawPoint::new(53.1, -1.7).with_time("noon")]);
        let options = ProcessOptions {
            process_time: false,
            ..raising()
        };
        assert!(TrackProcessor::new(doc, options).unwrap().is_valid());
    }

    #[test]
    fn test_no_data_state() {
        let processor = TrackProcessor::new(GpxDocument::default(), raising()).unwrap();
        assert!(!processor.is_valid());
        assert_eq!(processor.state(), ProcessorState::NoData);
        assert_eq!(processor.kind(), None);
        assert!(matches!(processor.statistics(), Err(Error::InvalidState(_))));
        assert!(matches!(processor.to_tabular(None, None), Err(Error::InvalidState(_))));
        assert!(matches!(
            processor.to_xml(&XmlOptions::default()),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(processor.statistics_report(false), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_duplicates_counted_for_configured_tolerance() {
        let doc = track(vec![
            RawPoint::new(53.1, -1.7),
            RawPoint::new(53.10001, -1.70001),
            RawPoint::new(53.11, -1.7),
        ]);
        let stats = TrackProcessor::new(doc.clone(), raising()).unwrap().statistics().unwrap().clone();
        assert_eq!(stats.duplicates_discarded, Some(1));
        assert_eq!(stats.records_retained, 2);

        let options = ProcessOptions {
            compute_deltas: true,
            ..raising()
        };
        let stats = TrackProcessor::new(doc, options).unwrap().statistics().unwrap().clone();
        assert_eq!(stats.duplicates_discarded, None);
        assert_eq!(stats.records_retained, 3);
    }
}
