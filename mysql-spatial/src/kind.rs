use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use test_strategy::Arbitrary;
use thiserror::Error;

/// The geometry kinds MySQL knows about, both as column types and as WKB type codes.
///
/// [`GeometryKind::Geometry`] is only meaningful as a column type ("any geometry"); concrete
/// values always have one of the other seven kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Arbitrary,
)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown geometry type `{0}`")]
pub struct UnknownGeometryKind(pub String);

impl GeometryKind {
    /// All geometry kinds, in WKB type-code order.
    pub const ALL: [Self; 8] = [
        Self::Geometry,
        Self::Point,
        Self::LineString,
        Self::Polygon,
        Self::MultiPoint,
        Self::MultiLineString,
        Self::MultiPolygon,
        Self::GeometryCollection,
    ];

    /// The lowercase column type name, e.g. `"multipoint"`.
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Point => "point",
            Self::LineString => "linestring",
            Self::Polygon => "polygon",
            Self::MultiPoint => "multipoint",
            Self::MultiLineString => "multilinestring",
            Self::MultiPolygon => "multipolygon",
            Self::GeometryCollection => "geometrycollection",
        }
    }

    /// The uppercase WKT keyword, e.g. `"MULTIPOINT"`.
    pub fn wkt_keyword(self) -> &'static str {
        match self {
            Self::Geometry => "GEOMETRY",
            Self::Point => "POINT",
            Self::LineString => "LINESTRING",
            Self::Polygon => "POLYGON",
            Self::MultiPoint => "MULTIPOINT",
            Self::MultiLineString => "MULTILINESTRING",
            Self::MultiPolygon => "MULTIPOLYGON",
            Self::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }

    /// The base WKB type code (0 through 7).
    pub fn wkb_code(self) -> u32 {
        match self {
            Self::Geometry => 0,
            Self::Point => 1,
            Self::LineString => 2,
            Self::Polygon => 3,
            Self::MultiPoint => 4,
            Self::MultiLineString => 5,
            Self::MultiPolygon => 6,
            Self::GeometryCollection => 7,
        }
    }

    /// Inverse of [`wkb_code`](Self::wkb_code); `None` for codes outside 1..=7.
    pub fn from_wkb_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Point),
            2 => Some(Self::LineString),
            3 => Some(Self::Polygon),
            4 => Some(Self::MultiPoint),
            5 => Some(Self::MultiLineString),
            6 => Some(Self::MultiPolygon),
            7 => Some(Self::GeometryCollection),
            _ => None,
        }
    }

    /// Does `other` fit in a column declared with this kind?
    pub fn accepts(self, other: GeometryKind) -> bool {
        self == Self::Geometry || self == other
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

impl FromStr for GeometryKind {
    type Err = UnknownGeometryKind;

    /// Accepts the column type names case-insensitively, with or without underscores
    /// (`line_string`, `multi_point`, `geometry_collection`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', "").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.sql_name() == normalized)
            .ok_or_else(|| UnknownGeometryKind(s.to_owned()))
    }
}
