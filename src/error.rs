use wasm_bindgen::JsValue;

/// Failures raised by the grid conversions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Projected coordinates fall outside the 100 km region table.
    OutOfRegion { easting: i64, northing: i64 },
    /// Two-letter code is not one of the 91 known regions.
    UnknownRegion(String),
    /// Malformed grid reference or unsupported digit count.
    InvalidFormat(String),
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRegion { easting, northing } => write!(
                f,
                "Coordinates ({easting}, {northing}) are outside the national grid regions"
            ),
            Self::UnknownRegion(code) => write!(f, "Unknown 100km grid square code '{code}'"),
            Self::InvalidFormat(msg) => write!(f, "Invalid grid reference format: {msg}"),
        }
    }
}

impl std::error::Error for GridError {}

#[derive(Debug)]
pub enum Error {
    XmlParse(quick_xml::Error),
    /// Well-formed XML that is not a usable GPX document.
    InvalidDocument(String),
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
    InvalidTimestamp(String),
    Grid(GridError),
    Io(std::io::Error),
    Options(String),
    /// An accessor was used before the processor reached its ready state.
    InvalidState(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::XmlParse(e) => write!(f, "XML parse error: {e}"),
            Self::InvalidDocument(msg) => write!(f, "Invalid GPX document: {msg}"),
            Self::MissingAttribute { element, attribute } => {
                write!(f, "Missing attribute '{attribute}' on <{element}>")
            }
            Self::InvalidAttribute {
                element,
                attribute,
                value,
            } => write!(
                f,
                "Invalid value '{value}' for attribute '{attribute}' on <{element}>"
            ),
            Self::InvalidTimestamp(ts) => write!(f, "Invalid <time> value '{ts}'"),
            Self::Grid(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Options(msg) => write!(f, "Invalid options: {msg}"),
            Self::InvalidState(msg) => write!(f, "No processed way-point data: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::XmlParse(e) => Some(e),
            Self::Grid(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Self::XmlParse(e)
    }
}

impl From<GridError> for Error {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Options(e.to_string())
    }
}

impl From<Error> for JsValue {
    fn from(e: Error) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}

impl From<GridError> for JsValue {
    fn from(e: GridError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}
