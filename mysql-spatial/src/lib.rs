//! Geometry values and their MySQL encodings.
//!
//! MySQL stores a spatial value as a 4-byte little-endian SRID followed by standard WKB, and
//! accepts values from clients as WKT or WKB passed through `ST_GeomFromText` and
//! `ST_GeomFromWKB`. This crate holds the in-memory side of that exchange:
//!
//! - [`Geometry`]: an immutable 2D geometry bound to an SRID, with its coordinates in a
//!   [`geo_types::Geometry`].
//! - [`srid`] and [`FactorySelector`]: which SRIDs are geographic (ellipsoidal, where MySQL's
//!   axis order is latitude-longitude), and the [`GeometryFactory`] each SRID gets.
//! - [`GeometryCodec`]: parsing and generating WKT, EWKT, WKB, EWKB, hex and the internal
//!   SRID-prefixed layout, plus GeoJSON geometry objects.
//!
//! Only two-dimensional geometries are modeled. Z and M ordinates in input are accepted and
//! dropped, and `POINT EMPTY` has no representation.
//!
//! <https://github.com/postgis/postgis/blob/master/doc/ZMSgeoms.txt> (for ewkb).
//! <https://dev.mysql.com/doc/refman/8.0/en/gis-data-formats.html> (for the internal format).

pub mod codec;
mod error;
mod factory;
mod geometry;
mod kind;
pub mod srid;

pub use codec::{ByteOrder, GeometryCodec, MAX_NESTING};
pub use error::{ParseError, ParseResult};
pub use factory::{FactorySelector, GeometryFactory};
pub use geometry::Geometry;
pub use kind::{GeometryKind, UnknownGeometryKind};
pub use srid::{CoordinateSystem, DEFAULT_SRID};
