//! Human readable statistics for a processed track.

use std::fmt::Display;

use crate::track::{TrackProcessor, TrackStatistics};

const NOT_AVAILABLE: &str = " n/a";

#[derive(Default)]
struct Report {
    lines: Vec<String>,
}

impl Report {
    fn field(&mut self, label: &str, value: impl Display) {
        self.lines.push(format!("{label:<26}:{value}"));
    }

    fn optional<T>(&mut self, label: &str, value: Option<T>, format: impl Fn(T) -> String) {
        match value {
            Some(v) => self.field(label, format(v)),
            None => self.field(label, NOT_AVAILABLE),
        }
    }

    fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

pub(crate) fn render(processor: &TrackProcessor, stats: &TrackStatistics, verbose: bool) -> String {
    let options = processor.options();
    let mut r = Report::default();

    r.field("GPX way-points processed", format!("{:6}", stats.points_read));
    if !options.process_time {
        r.field("Way-points discarded (t)", NOT_AVAILABLE);
    } else if let (true, Some(discarded)) = (stats.time_tags_found, stats.discarded_by_time) {
        r.field("Way-points discarded (t)", format!("{discarded:6}"));
        r.field("Way-points retained", format!("{:6}", stats.points_retained));
    }
    if let Some(duplicates) = stats.duplicates_discarded {
        r.field("Duplicate records dropped", format!("{duplicates:6}"));
        r.field("Records retained", format!("{:6}", stats.records_retained));
    }

    r.field("Distance", format!("{:9.2}km", stats.distance_km));
    r.field("Max length delta", format!("{:8.1}m", stats.max_distance_delta));
    r.optional("Max vertical delta", stats.max_elevation_delta, |v| format!("{v:+8.1}m"));
    r.optional("Max time delta", stats.max_time_delta, |s| format!("{:8.1}sec", s as f64));
    r.optional("Height increments ignored", stats.increments_ignored, |n| format!("{n:6}"));
    r.optional("Adjusted height gain", stats.adjusted_gain, metres);
    r.optional("Adjusted height loss", stats.adjusted_loss, metres);
    r.optional("Start way-point elevation", stats.start_elevation, metres);
    r.optional("End way-point elevation", stats.end_elevation, metres);
    r.optional("High way-point elevation", stats.high_elevation, metres);
    r.optional("Low way-point elevation", stats.low_elevation, metres);

    if let (Some(start), Some(end)) = (stats.start_elevation, stats.end_elevation) {
        if start < end {
            r.field("Net height gain", metres(end - start));
        } else if end < start {
            r.field("Net height loss", metres(start - end));
        }
    }

    if let (true, Some(start), Some(end)) = (stats.points_retained > 1, stats.start_point, stats.end_point) {
        let separation = start.distance_to(&end) as i64;
        if separation > 999 {
            r.field("Start-end separation (gpx)", format!("{:9.2}km", separation as f64 / 1000.0));
        } else {
            r.field("Start-end separation (gpx)", format!("{separation:6}m"));
        }
    }

    if options.process_time {
        r.optional("Start timestamp", stats.start_time.as_deref(), |ts| format!(" {ts}"));
        r.optional("End timestamp", stats.end_time.as_deref(), |ts| format!(" {ts}"));
        if let Some(elapsed) = stats.elapsed_seconds {
            r.field("Elapsed time (H:M:S)", format!(" {}", hms(elapsed)));
        }
    }

    if verbose {
        r.lines.push(String::new());
        if let Some(name) = processor.name() {
            r.field("GPX xml name tag", format!(" {name}"));
        }
        if let Some(desc) = processor.desc() {
            r.field("GPX xml desc tag", format!(" {desc}"));
        }
        r.field("Max Delta L (record)", format!("{:8.1}m", options.max_distance_delta));
        r.field("Max Delta V (elevation)", format!("{:8.1}m", options.max_elevation_delta));
        r.field("Max Delta S (time)", format!("{:8.1}sec", options.max_time_delta as f64));
        if let Some(gain) = stats.raw_gain {
            r.field("Reported height gain", metres(gain));
        }
        if let Some(loss) = stats.raw_loss {
            r.field("Reported height loss", metres(loss));
        }
        r.field("Precision (NGR)", format!("{:6} digits", options.precision));
        r.field("Tolerance L (record)", format!("{:6}m", options.distance_tolerance));
        r.field("Tolerance V (cumulative)", format!("{:6}m", options.elevation_tolerance));
        r.field("Tolerance T (way-point)", format!("{:6}sec", options.time_tolerance));
    }

    r.finish()
}

fn metres(value: f64) -> String {
    format!("{value:8.1}m")
}

/// `H:MM:SS`, hours unbounded.
fn hms(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let s = seconds.abs();
    format!("{sign}{}:{:02}:{:02}", s / 3600, s % 3600 / 60, s % 60)
}
