use serde::Serialize;

/// Parsed GPX input: the vertices the processor works on plus document metadata.
#[derive(Debug, Default, Clone)]
pub struct GpxDocument {
    /// `<name>` of the first `<trk>`, else of the first `<rte>`.
    pub name: Option<String>,
    /// `<desc>` of the first `<trk>`, else of the first `<rte>`.
    pub desc: Option<String>,
    /// Default namespace declared on the root element.
    pub namespace: Option<String>,
    pub track_points: Vec<RawPoint>,
    pub route_points: Vec<RawPoint>,
}

impl GpxDocument {
    /// Track points if there are any, otherwise route points.
    pub fn vertices(&self) -> Option<(TrackKind, &[RawPoint])> {
        if !self.track_points.is_empty() {
            Some((TrackKind::Track, &self.track_points))
        } else if !self.route_points.is_empty() {
            Some((TrackKind::Route, &self.route_points))
        } else {
            None
        }
    }
}

/// A `<trkpt>` or `<rtept>` as read from the document.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: Option<String>,
}

impl RawPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            time: None,
        }
    }

    pub fn with_ele(mut self, ele: f64) -> Self {
        self.ele = Some(ele);
        self
    }

    pub fn with_time(mut self, time: &str) -> Self {
        self.time = Some(time.to_string());
        self
    }
}

/// Which vertex element the document was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Track,
    Route,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Route => "route",
        }
    }

    pub fn vertex_tag(&self) -> &'static str {
        match self {
            Self::Track => "trkpt",
            Self::Route => "rtept",
        }
    }
}
