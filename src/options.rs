use serde::Deserialize;

use crate::geodesy::FailureMode;

/// Standard namespace written on the `<gpx>` root when requested.
pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/0";

/// Options controlling how a GPX track is filtered and measured.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOptions {
    /// Read `<time>` elements and filter on them (default: true)
    #[serde(default = "default_true")]
    pub process_time: bool,

    /// Keep per-point delta records and append them to tabular output (default: false)
    #[serde(default)]
    pub compute_deltas: bool,

    /// Way-points closer in time than this to the last kept one are dropped, 0 disables (default: 12s)
    #[serde(default = "default_time_tolerance")]
    pub time_tolerance: i64,

    /// Elevation changes at or below this are ignored for adjusted gain/loss (default: 5m)
    #[serde(default = "default_elevation_tolerance")]
    pub elevation_tolerance: f64,

    /// Tabular records within this Manhattan distance of the last emitted one are dropped, 0 disables (default: 5m)
    #[serde(default = "default_distance_tolerance")]
    pub distance_tolerance: f64,

    /// Grid reference digits: 4, 6, 8 or 10 (default: 8)
    #[serde(default = "default_precision")]
    pub precision: u8,

    /// Distance delta above which a warning is logged (default: 400m)
    #[serde(default = "default_max_distance_delta")]
    pub max_distance_delta: f64,

    /// Elevation delta magnitude above which a warning is logged (default: 30m)
    #[serde(default = "default_max_elevation_delta")]
    pub max_elevation_delta: f64,

    /// Time delta above which an informational message is logged (default: 250s)
    #[serde(default = "default_max_time_delta")]
    pub max_time_delta: i64,

    /// Terminate the process or return the error when input is unusable (default: terminate)
    #[serde(default)]
    pub failure_mode: FailureMode,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            process_time: true,
            compute_deltas: false,
            time_tolerance: default_time_tolerance(),
            elevation_tolerance: default_elevation_tolerance(),
            distance_tolerance: default_distance_tolerance(),
            precision: default_precision(),
            max_distance_delta: default_max_distance_delta(),
            max_elevation_delta: default_max_elevation_delta(),
            max_time_delta: default_max_time_delta(),
            failure_mode: FailureMode::default(),
        }
    }
}

impl ProcessOptions {
    pub fn filters_by_time(&self) -> bool {
        self.process_time && self.time_tolerance > 0
    }

    /// Distance tolerance actually applied to tabular output; deltas switch it off.
    pub fn effective_distance_tolerance(&self, requested: f64) -> Option<f64> {
        (requested > 0.0 && !self.compute_deltas).then_some(requested)
    }
}

/// Options for the rebuilt GPX document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XmlOptions {
    /// Indent nested elements by two spaces (default: true)
    #[serde(default = "default_true")]
    pub pretty: bool,

    /// Write a `<trk>` rather than a `<rte>` (default: true)
    #[serde(default = "default_true")]
    pub track: bool,

    /// `xmlns` attribute of the root element: false/absent, true for the standard URI, or a custom URI
    #[serde(default)]
    pub namespace: XmlNamespace,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            track: true,
            namespace: XmlNamespace::None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "NamespaceValue")]
pub enum XmlNamespace {
    #[default]
    None,
    Standard,
    Custom(String),
}

impl XmlNamespace {
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Standard => Some(GPX_NAMESPACE),
            Self::Custom(uri) => Some(uri),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NamespaceValue {
    Flag(bool),
    Uri(String),
}

impl From<NamespaceValue> for XmlNamespace {
    fn from(value: NamespaceValue) -> Self {
        match value {
            NamespaceValue::Flag(false) => Self::None,
            NamespaceValue::Flag(true) => Self::Standard,
            NamespaceValue::Uri(uri) => Self::Custom(uri),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_time_tolerance() -> i64 {
    12
}

fn default_elevation_tolerance() -> f64 {
    5.0
}

fn default_distance_tolerance() -> f64 {
    5.0
}

fn default_precision() -> u8 {
    8
}

fn default_max_distance_delta() -> f64 {
    400.0
}

fn default_max_elevation_delta() -> f64 {
    30.0
}

fn default_max_time_delta() -> i64 {
    250
}
