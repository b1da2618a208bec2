//! The MySQL spatial SQL dialect.
//!
//! Everything here produces SQL text; nothing talks to a server. The pieces are:
//!
//! - [`SqlEmitter`]: turns geometries, WKT/EWKT literals and [`SpatialExpr`] trees into
//!   `ST_GeomFromWKB`/`ST_GeomFromText` calls and spatial predicates, adding the
//!   `axis-order=long-lat` hint for geographic SRIDs when the server honours it.
//! - [`SpatialTypeDescriptor`]: what a declared column type (`geometry(Point,4326)`) means, and
//!   how values for such a column are cast and read back.
//! - [`column`] and [`ddl`]: column descriptors built from field metadata, and the DDL used to
//!   create and alter spatial columns and indexes.
//! - [`EngineCapabilities`] and [`SpatialOptions`]: which spatial features the target server
//!   supports, resolved once from its version string and configuration.

use mysql_spatial::ParseError;
use thiserror::Error;

/// Errors produced while resolving spatial SQL configuration or interpreting column types.
///
/// Emitting SQL never fails; these come from explicit parsing calls and from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpatialSqlError {
    /// A declared column type is not one of the geometry types, but spatial handling was
    /// requested for it
    #[error("Unsupported spatial type: {0}")]
    UnsupportedType(String),
    /// A dialect feature was explicitly requested from a server that lacks it
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),
    /// A server version string could not be understood
    #[error("Invalid server version: {0}")]
    InvalidVersion(String),
    /// A geometry value could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type SpatialSqlResult<T> = Result<T, SpatialSqlError>;

macro_rules! unsupported_type {
    ($($format_args:tt)*) => {
        Err($crate::SpatialSqlError::UnsupportedType(format!($($format_args)*)))
    };
}

macro_rules! unsupported_feature {
    ($($format_args:tt)*) => {
        Err($crate::SpatialSqlError::UnsupportedFeature(format!($($format_args)*)))
    };
}

macro_rules! invalid_version {
    ($($format_args:tt)*) => {
        Err($crate::SpatialSqlError::InvalidVersion(format!($($format_args)*)))
    };
}

pub(crate) use {invalid_version, unsupported_feature, unsupported_type};

mod capabilities;
pub mod column;
mod config;
pub mod ddl;
mod display;
mod emitter;
mod expr;
mod fmt;
mod functions;
mod sql_type;
mod table_name;

pub use capabilities::{EngineCapabilities, ServerFlavor, ServerVersion};
pub use column::{ColumnDescriptor, FieldRow, SpatialAware, SpatialColumnInfo};
pub use config::SpatialOptions;
pub use display::{quote_identifier, quote_string, SpatialDisplay};
pub use emitter::{SqlEmitter, AXIS_ORDER_LONG_LAT};
pub use expr::{ColumnRef, ComparisonOp, Literal, SpatialExpr};
pub use functions::{canonical_function_name, SPATIAL_FUNCTIONS};
pub use sql_type::{parse_declared_type, GeometryInput, SpatialTypeDescriptor};
pub use table_name::TableName;
