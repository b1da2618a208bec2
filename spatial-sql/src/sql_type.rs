use mysql_spatial::{Geometry, GeometryCodec, GeometryFactory, GeometryKind};
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, multispace0, u32 as srid_number};
use nom::combinator::opt;
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{unsupported_type, SpatialSqlResult};

fn word(i: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(i)
}

fn padded<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

/// `(<subtype>[,<srid>])`
fn type_arguments(i: &str) -> IResult<&str, (&str, Option<u32>)> {
    delimited(
        char('('),
        pair(
            padded(word),
            opt(preceded(char(','), padded(srid_number))),
        ),
        char(')'),
    )(i)
}

fn declared_type(i: &str) -> IResult<&str, (&str, Option<(&str, Option<u32>)>)> {
    pair(padded(word), opt(type_arguments))(i)
}

fn spatial_kind(name: &str) -> Option<GeometryKind> {
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    name.parse().ok()
}

/// Split a declared column type into its geometry type name and SRID.
///
/// `geometry(Point,4326)` is `("point", 4326)`, `point` is `("point", 0)`, and an unrecognized
/// subtype such as `geometry(Blob)` is `("geometry", 0)`. If the base type is not a geometry type
/// at all, `sql_type` is returned unchanged with SRID 0.
pub fn parse_declared_type(sql_type: &str) -> (String, u32) {
    let lower = sql_type.to_lowercase();
    let base = lower.split('(').next().unwrap_or_default().trim();
    let Some(base_kind) = spatial_kind(base) else {
        return (sql_type.to_owned(), 0);
    };

    match declared_type(&lower) {
        Ok((_, (_, Some((subtype, srid))))) => {
            let kind = subtype
                .parse::<GeometryKind>()
                .unwrap_or(GeometryKind::Geometry);
            (kind.sql_name().to_owned(), srid.unwrap_or(0))
        }
        _ => (base_kind.sql_name().to_owned(), 0),
    }
}

/// A value offered for a spatial column, before it is cast.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryInput {
    Null,
    Geometry(Geometry),
    /// WKT, EWKT or hex-encoded WKB
    Text(String),
    /// WKB, EWKB or MySQL's SRID-prefixed layout
    Binary(Vec<u8>),
    GeoJson(serde_json::Value),
}

impl From<Geometry> for GeometryInput {
    fn from(geometry: Geometry) -> Self {
        Self::Geometry(geometry)
    }
}

impl From<&str> for GeometryInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for GeometryInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&[u8]> for GeometryInput {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

impl From<Vec<u8>> for GeometryInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<serde_json::Value> for GeometryInput {
    fn from(value: serde_json::Value) -> Self {
        Self::GeoJson(value)
    }
}

impl<T> From<Option<T>> for GeometryInput
where
    T: Into<GeometryInput>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// What a declared column type means for the values stored in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialTypeDescriptor {
    geo_type: String,
    srid: u32,
}

impl Default for SpatialTypeDescriptor {
    fn default() -> Self {
        Self::new("geometry")
    }
}

impl SpatialTypeDescriptor {
    pub fn new(sql_type: &str) -> Self {
        let (geo_type, srid) = parse_declared_type(sql_type);
        Self { geo_type, srid }
    }

    /// The lowercase geometry type name, or the declared type unchanged for non-spatial types.
    pub fn geo_type(&self) -> &str {
        &self.geo_type
    }

    pub fn srid(&self) -> u32 {
        self.srid
    }

    pub fn kind(&self) -> Option<GeometryKind> {
        spatial_kind(&self.geo_type)
    }

    pub fn try_kind(&self) -> SpatialSqlResult<GeometryKind> {
        match self.kind() {
            Some(kind) => Ok(kind),
            None => unsupported_type!("{}", self.geo_type),
        }
    }

    pub fn is_spatial(&self) -> bool {
        self.kind().is_some()
    }

    /// The factory values without an SRID of their own are bound to.
    pub fn factory(&self, codec: &GeometryCodec) -> GeometryFactory {
        codec.selector().select(self.srid)
    }

    /// Cast `input` to a geometry, failing on malformed input.
    ///
    /// Blank text and [`GeometryInput::Null`] become `None`. Text and binary input without an
    /// SRID of its own is bound to this column's SRID.
    pub fn parse(
        &self,
        codec: &GeometryCodec,
        input: impl Into<GeometryInput>,
    ) -> SpatialSqlResult<Option<Geometry>> {
        let geometry = match input.into() {
            GeometryInput::Null => None,
            GeometryInput::Geometry(geometry) => Some(geometry),
            GeometryInput::Text(text) => codec.parse_text(&text, self.srid)?,
            GeometryInput::Binary(bytes) => codec.parse_binary(&bytes, self.srid)?,
            GeometryInput::GeoJson(value) => codec.parse_geojson(&value, self.srid)?,
        };
        Ok(geometry)
    }

    /// Like [`parse`](Self::parse), but malformed input becomes `None`.
    pub fn cast(&self, codec: &GeometryCodec, input: impl Into<GeometryInput>) -> Option<Geometry> {
        self.parse(codec, input).unwrap_or_else(|error| {
            debug!(%error, geo_type = %self.geo_type, srid = self.srid, "Could not cast value");
            None
        })
    }

    /// Read a value as returned by the server.
    ///
    /// Bytes are first read as binary geometry (normally MySQL's SRID-prefixed layout). If that
    /// fails and the bytes are UTF-8, they are read again as hex or WKT text.
    pub fn deserialize(
        &self,
        codec: &GeometryCodec,
        raw: &[u8],
    ) -> SpatialSqlResult<Option<Geometry>> {
        match codec.parse_binary(raw, self.srid) {
            Ok(geometry) => Ok(geometry),
            Err(error) => match std::str::from_utf8(raw) {
                Ok(text) => {
                    debug!(%error, "Value is not binary geometry; reading as text");
                    Ok(codec.parse_text(text, self.srid)?)
                }
                Err(_) => Err(error.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use mysql_spatial::FactorySelector;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_strategy::proptest;

    use super::*;
    use crate::SpatialSqlError;

    fn parsed(sql_type: &str) -> (String, u32) {
        parse_declared_type(sql_type)
    }

    #[test]
    fn declared_types() {
        assert_eq!(parsed("geometry(Point,4326)"), ("point".into(), 4326));
        assert_eq!(parsed("point"), ("point".into(), 0));
        assert_eq!(parsed("GEOMETRY"), ("geometry".into(), 0));
        assert_eq!(parsed("geometry( Polygon , 3857 )"), ("polygon".into(), 3857));
        assert_eq!(parsed("geometry(MultiPolygon)"), ("multipolygon".into(), 0));
        assert_eq!(parsed("geometry(Blob,4326)"), ("geometry".into(), 4326));
    }

    #[test]
    fn non_spatial_types_are_unchanged() {
        assert_eq!(parsed("foo(A,1234)"), ("foo(A,1234)".into(), 0));
        assert_eq!(parsed("varchar(255)"), ("varchar(255)".into(), 0));
        assert_eq!(parsed("Int"), ("Int".into(), 0));
    }

    #[test]
    fn descriptor_kinds() {
        let descriptor = SpatialTypeDescriptor::new("geometry(LineString,4326)");
        assert_eq!(descriptor.kind(), Some(GeometryKind::LineString));
        assert_eq!(descriptor.srid(), 4326);
        assert!(descriptor.is_spatial());
        assert!(descriptor.factory(&GeometryCodec::default()).is_geographic());

        let descriptor = SpatialTypeDescriptor::new("text");
        assert!(!descriptor.is_spatial());
        assert_eq!(
            descriptor.try_kind(),
            Err(SpatialSqlError::UnsupportedType("text".into()))
        );
    }

    #[test]
    fn cast_text() {
        let codec = GeometryCodec::default();
        let descriptor = SpatialTypeDescriptor::new("geometry(Point,4326)");

        let geometry = descriptor.cast(&codec, "POINT(139.7 35.7)").unwrap();
        assert_eq!(geometry.srid(), 4326);
        assert_eq!(geometry.longitude(), Some(139.7));

        let geometry = descriptor.cast(&codec, "SRID=3857;POINT(1 2)").unwrap();
        assert_eq!(geometry.srid(), 3857);
        assert!(!geometry.is_geographic());
    }

    #[test]
    fn cast_blank_and_null() {
        let codec = GeometryCodec::default();
        let descriptor = SpatialTypeDescriptor::default();
        assert_eq!(descriptor.cast(&codec, GeometryInput::Null), None);
        assert_eq!(descriptor.cast(&codec, None::<String>), None);
        assert_eq!(descriptor.cast(&codec, "   "), None);
    }

    #[test]
    fn cast_is_lenient_and_parse_is_strict() {
        let codec = GeometryCodec::default();
        let descriptor = SpatialTypeDescriptor::default();
        assert_eq!(descriptor.cast(&codec, "POINT(1"), None);
        assert!(matches!(
            descriptor.parse(&codec, "POINT(1"),
            Err(SpatialSqlError::Parse(_))
        ));
        assert!(descriptor.parse(&codec, "not a geometry").is_err());
    }

    #[test]
    fn cast_geojson() {
        let codec = GeometryCodec::default();
        let descriptor = SpatialTypeDescriptor::new("geometry(Point,4326)");
        let geometry = descriptor
            .cast(&codec, json!({"type": "Point", "coordinates": [1.0, 2.0]}))
            .unwrap();
        assert_eq!(geometry.srid(), 4326);
        assert_eq!(geometry.x(), Some(1.0));
        assert_eq!(descriptor.cast(&codec, json!({"name": "x"})), None);
    }

    #[test]
    fn cast_geometry_passes_through() {
        let codec = GeometryCodec::default();
        let geometry = FactorySelector::new().select(3857).point(1.0, 2.0);
        let descriptor = SpatialTypeDescriptor::new("point");
        assert_eq!(descriptor.cast(&codec, geometry.clone()), Some(geometry));
    }

    #[test]
    fn deserialize_internal_layout() {
        let codec = GeometryCodec::default();
        let geometry = FactorySelector::new().select(4326).point(139.7, 35.7);
        let raw = codec.generate_internal(&geometry);

        let descriptor = SpatialTypeDescriptor::default();
        assert_eq!(descriptor.deserialize(&codec, &raw).unwrap(), Some(geometry));
        assert_eq!(descriptor.deserialize(&codec, &[]).unwrap(), None);
    }

    #[test]
    fn deserialize_text_fallback() {
        let codec = GeometryCodec::default();
        let descriptor = SpatialTypeDescriptor::new("geometry(Point,3857)");
        let geometry = descriptor
            .deserialize(&codec, b"POINT(1 2)")
            .unwrap()
            .unwrap();
        assert_eq!(geometry.srid(), 3857);

        let hex = codec.generate_wkb_hex(&geometry, true);
        assert_eq!(
            descriptor.deserialize(&codec, hex.as_bytes()).unwrap(),
            Some(geometry)
        );
        assert!(descriptor.deserialize(&codec, &[0xff, 0xfe, 0x00]).is_err());
    }

    #[proptest]
    fn declared_kinds_round_trip(kind: GeometryKind, srid: u32) {
        let declared = format!("geometry({},{srid})", kind.wkt_keyword());
        assert_eq!(parse_declared_type(&declared), (kind.sql_name().to_owned(), srid));
        assert_eq!(parse_declared_type(kind.sql_name()), (kind.sql_name().to_owned(), 0));
    }
}
