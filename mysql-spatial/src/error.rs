use thiserror::Error;

/// Failure to decode a geometry from one of the supported input representations.
///
/// Blank input is never an error; every decoder returns `Ok(None)` for it. Callers decide whether
/// a `ParseError` is swallowed (lenient casting) or propagated (explicit parsing).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Malformed Well-Known Text (or the WKT part of an EWKT string)
    #[error("Invalid WKT: {0}")]
    Wkt(String),
    /// Malformed Well-Known Binary, EWKB, or MySQL internal geometry bytes
    #[error("Invalid WKB: {0}")]
    Wkb(String),
    /// A string that was expected to be hexadecimal but was not
    #[error("Invalid hex string: {0}")]
    Hex(String),
    /// A GeoJSON-like mapping with a bad `type` or bad coordinates
    #[error("Invalid GeoJSON: {0}")]
    GeoJson(String),
    /// Text that is neither WKT, EWKT nor hex
    #[error("Unrecognized geometry text: {0}")]
    Unrecognized(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

macro_rules! wkb_err {
    ($($format_args:tt)*) => {
        $crate::error::ParseError::Wkb(format!($($format_args)*))
    };
}

macro_rules! wkt_err {
    ($($format_args:tt)*) => {
        $crate::error::ParseError::Wkt(format!($($format_args)*))
    };
}

macro_rules! geojson_err {
    ($($format_args:tt)*) => {
        $crate::error::ParseError::GeoJson(format!($($format_args)*))
    };
}

pub(crate) use geojson_err;
pub(crate) use wkb_err;
pub(crate) use wkt_err;
