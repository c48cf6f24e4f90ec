use approx::{assert_abs_diff_eq, assert_relative_eq};
use geojson::Value;
use gpx_osgrid::geodesy::{to_geographic, to_projected};
use gpx_osgrid::{
    Error, FailureMode, GeoPoint, GridConverter, ProcessOptions, ProcessorState, ProjectedPoint, TrackKind,
    TrackProcessor, XmlNamespace, XmlOptions, parse_gpx, to_feature_collection,
};

fn load_fixture(path: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{path}")).unwrap()
}

fn raising() -> ProcessOptions {
    ProcessOptions {
        failure_mode: FailureMode::Raise,
        ..Default::default()
    }
}

fn process(fixture: &str) -> TrackProcessor {
    TrackProcessor::from_gpx_str(&load_fixture(fixture), raising()).unwrap()
}

#[test]
fn test_youlgreave_statistics() {
    let processor = process("youlgreave.gpx");
    assert_eq!(processor.state(), ProcessorState::Ready);
    assert_eq!(processor.kind(), Some(TrackKind::Track));
    assert_eq!(processor.name(), Some("Youlgreave to Bradford Dale"));
    assert_eq!(processor.desc(), Some("Morning walk | river path"));

    let stats = processor.statistics().unwrap();
    assert_eq!(stats.points_read, 7);
    assert_eq!(stats.points_retained, 6);
    assert_eq!(stats.discarded_by_time, Some(1));
    assert_eq!(stats.duplicates_discarded, Some(1));
    assert_eq!(stats.records_retained, 5);
    assert_relative_eq!(stats.distance, 630.905, epsilon = 0.01);
    assert_eq!(stats.distance_km, 0.63);
    assert_eq!(stats.max_distance_delta, 213.5);
    assert_eq!(stats.max_elevation_delta, Some(-6.5));
    assert_eq!(stats.max_time_delta, Some(115));
    assert_eq!(stats.adjusted_gain, Some(9.4));
    assert_eq!(stats.adjusted_loss, Some(0.0));
    assert_eq!(stats.raw_gain, Some(13.7));
    assert_eq!(stats.raw_loss, Some(6.5));
    assert_eq!(stats.increments_ignored, Some(4));
    assert_eq!(stats.elapsed_seconds, Some(309));
    assert_eq!(stats.start_time.as_deref(), Some("2015-06-08T09:56:51+01:00"));
    assert_eq!(stats.start_point, Some(ProjectedPoint::new(419260, 364481)));
    assert_eq!(stats.end_point, Some(ProjectedPoint::new(419678, 364952)));
    assert!(stats.time_tags_found);
}

#[test]
fn test_namespaces_are_recorded() {
    let doc = parse_gpx(&load_fixture("youlgreave.gpx")).unwrap();
    assert_eq!(doc.namespace.as_deref(), Some("http://www.topografix.com/GPX/1/0"));
    assert_eq!(doc.track_points.len(), 7);

    let doc = parse_gpx(&load_fixture("route.gpx")).unwrap();
    assert_eq!(doc.namespace.as_deref(), Some("http://www.topografix.com/GPX/1/1"));
    assert_eq!(doc.route_points.len(), 3);
}

#[test]
fn test_route_without_times() {
    let processor = process("route.gpx");
    assert_eq!(processor.kind(), Some(TrackKind::Route));
    assert_eq!(processor.name(), Some("Over Haddon"));

    let stats = processor.statistics().unwrap();
    assert!(!stats.time_tags_found);
    assert_eq!(stats.start_time, None);
    assert_eq!(stats.max_time_delta, None);
    assert_eq!(stats.end_elevation, Some(110.0));
    assert!(processor.deltas().unwrap().iter().all(|d| d.time.is_none()));
}

#[test]
fn test_xml_round_trip() {
    let original = process("youlgreave.gpx");
    let xml = original.to_xml(&XmlOptions::default()).unwrap();

    let again = TrackProcessor::from_gpx_str(&xml, raising()).unwrap();
    assert_eq!(again.kind(), Some(TrackKind::Track));
    assert_eq!(again.name(), original.name());
    assert_eq!(again.desc(), original.desc());
    assert_eq!(again.statistics().unwrap().points_read, 5);
    assert_eq!(
        again.to_tabular(None, None).unwrap(),
        original.to_tabular(None, None).unwrap()
    );
}

#[test]
fn test_xml_route_output() {
    let original = process("youlgreave.gpx");
    let xml_options = XmlOptions {
        pretty: false,
        track: false,
        namespace: XmlNamespace::Standard,
    };
    let xml = original.to_xml(&xml_options).unwrap();
    let doc = parse_gpx(&xml).unwrap();
    assert_eq!(doc.namespace.as_deref(), Some("http://www.topografix.com/GPX/1/0"));
    assert!(doc.track_points.is_empty());
    assert_eq!(doc.route_points.len(), 5);
    assert!(doc.route_points.iter().all(|p| p.time.is_none() && p.ele.is_some()));
}

#[test]
fn test_empty_document() {
    let processor = process("empty.gpx");
    assert!(!processor.is_valid());
    assert_eq!(processor.state(), ProcessorState::NoData);
    assert_eq!(processor.name(), Some("Nothing recorded"));
    assert!(matches!(processor.statistics(), Err(Error::InvalidState(_))));
    assert!(to_feature_collection(&processor).unwrap().features.is_empty());
}

#[test]
fn test_truncated_document_raises() {
    assert!(TrackProcessor::from_gpx_str(&load_fixture("truncated.gpx"), raising()).is_err());
}

#[test]
fn test_open_reads_file() {
    let processor = TrackProcessor::open("tests/fixtures/route.gpx", raising()).unwrap();
    assert!(processor.is_valid());
    assert!(matches!(
        TrackProcessor::open("tests/fixtures/missing.gpx", raising()),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_options_file() {
    let options: ProcessOptions = serde_json::from_str(&load_fixture("options.json")).unwrap();
    assert_eq!(options.failure_mode, FailureMode::Raise);
    assert_eq!(options.precision, 10);
    assert_eq!(options.elevation_tolerance, 5.0);

    let processor = TrackProcessor::from_gpx_str(&load_fixture("youlgreave.gpx"), options).unwrap();
    let stats = processor.statistics().unwrap();
    assert_eq!(stats.points_retained, 7);
    assert_eq!(stats.discarded_by_time, None);
    assert_eq!(stats.duplicates_discarded, None);
    assert_eq!(stats.records_retained, 7);

    let text = processor.to_tabular(None, None).unwrap();
    assert_eq!(text.lines().count(), 1 + 7);
    assert!(text.lines().nth(1).unwrap().ends_with("|SK1926064481"));
}

#[test]
fn test_geojson_output() {
    let processor = process("youlgreave.gpx");
    let fc = to_feature_collection(&processor).unwrap();
    assert_eq!(fc.features.len(), 1);

    let f = &fc.features[0];
    match &f.geometry.as_ref().unwrap().value {
        Value::LineString(coords) => {
            assert_eq!(coords.len(), 6);
            assert_eq!(coords[5], vec![-1.707, 53.18131, 197.6]);
        }
        _ => panic!("Expected LineString"),
    }
    let props = f.properties.as_ref().unwrap();
    assert_eq!(props["gpxType"], "track");
    assert_eq!(props["statistics"]["recordsRetained"], 5);
    let ngr = props["coordinateProperties"]["ngr"].as_array().unwrap();
    assert_eq!(ngr.len(), 6);
    assert_eq!(ngr[5], "SK19676495");
}

#[test]
fn test_statistics_are_monotonic() {
    let doc = parse_gpx(&load_fixture("youlgreave.gpx")).unwrap();
    let options = ProcessOptions {
        time_tolerance: 0,
        ..raising()
    };
    let mut previous = 0.0;
    for n in 1..=doc.track_points.len() {
        let mut prefix = doc.clone();
        prefix.track_points.truncate(n);
        let processor = TrackProcessor::new(prefix, options.clone()).unwrap();
        let stats = processor.statistics().unwrap();
        assert!(stats.max_distance_delta >= 0.0);
        assert!(stats.distance >= previous, "distance fell at {n} points");
        assert!(stats.high_elevation >= stats.low_elevation);
        previous = stats.distance;
    }
}

#[test]
fn test_time_filter_spacing() {
    let gpx = load_fixture("youlgreave.gpx");
    for tolerance in [0, 5, 12, 20, 60, 100] {
        let options = ProcessOptions {
            time_tolerance: tolerance,
            ..raising()
        };
        let processor = TrackProcessor::from_gpx_str(&gpx, options).unwrap();
        let stats = processor.statistics().unwrap();
        assert_eq!(
            stats.points_retained + stats.discarded_by_time.unwrap_or(0),
            stats.points_read
        );
        let seconds: Vec<i64> = processor
            .way_points()
            .unwrap()
            .iter()
            .filter_map(|p| p.seconds())
            .collect();
        assert!(seconds.windows(2).all(|w| w[1] - w[0] >= tolerance), "tolerance {tolerance}");
    }
}

#[test]
fn test_grid_round_trip() {
    for (lat, lon) in [(53.17709, -1.71329), (51.5, -0.1), (57.0, -4.5), (50.1, -5.5), (60.2, -1.2)] {
        let point = GeoPoint::new(lat, lon);
        let back = to_geographic(to_projected(point)).unwrap();
        assert_abs_diff_eq!(back.latitude, lat, epsilon = 1e-4);
        assert_abs_diff_eq!(back.longitude, lon, epsilon = 1e-4);

        let grid = GridConverter::new(FailureMode::Raise);
        let ngr = grid.to_ngr(point, 10).unwrap();
        let decoded = grid.to_geographic(ngr.as_str()).unwrap();
        assert_abs_diff_eq!(decoded.latitude, lat, epsilon = 1e-4);
        assert_abs_diff_eq!(decoded.longitude, lon, epsilon = 1e-4);
    }
}
