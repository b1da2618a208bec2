//! Well-Known Text parsing and MySQL-style formatting.
//!
//! The writer produces what `ST_AsText` returns on MySQL 8: no space between the keyword and the
//! opening parenthesis, commas without spaces, and parenthesized `MULTIPOINT` members. The parser
//! is more lenient: keywords are case-insensitive, whitespace is allowed anywhere between tokens,
//! `MULTIPOINT` members may omit their parentheses, and Z/M ordinates are accepted and dropped.

use std::fmt::{self, Write};

use geo_types::{
    Coord, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};
use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{char, multispace0, multispace1};
use nom::combinator::{all_consuming, map, opt, value, verify};
use nom::multi::{many_m_n, separated_list1};
use nom::number::complete::double;
use nom::sequence::{delimited, preceded, terminated};
use nom::IResult;

use super::MAX_NESTING;
use crate::error::{wkt_err, ParseError, ParseResult};
use crate::kind::GeometryKind;

type Shape = geo_types::Geometry<f64>;

/// The position and (optionally) the reason a WKT parse failed
#[derive(Debug)]
struct WktError<'a> {
    input: &'a str,
    reason: Option<&'static str>,
}

impl<'a> WktError<'a> {
    fn failure(input: &'a str, reason: &'static str) -> nom::Err<Self> {
        nom::Err::Failure(Self {
            input,
            reason: Some(reason),
        })
    }

    fn into_parse_error(self, text: &str) -> ParseError {
        let offset = text.len() - self.input.len();
        let near: String = self.input.chars().take(24).collect();
        match self.reason {
            Some(reason) => wkt_err!("{reason} at offset {offset} near `{near}`"),
            None if self.input.is_empty() => wkt_err!("unexpected end of input"),
            None => wkt_err!("unexpected input at offset {offset} near `{near}`"),
        }
    }
}

impl<'a> nom::error::ParseError<&'a str> for WktError<'a> {
    fn from_error_kind(input: &'a str, _kind: nom::error::ErrorKind) -> Self {
        Self {
            input,
            reason: None,
        }
    }

    fn append(_input: &'a str, _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

type WktResult<'a, T> = IResult<&'a str, T, WktError<'a>>;

/// The keywords that start a WKT geometry, longest first so that e.g. `MULTIPOINT` is never read
/// as `MULTI` followed by garbage.
const KEYWORDS: [GeometryKind; 7] = [
    GeometryKind::GeometryCollection,
    GeometryKind::MultiLineString,
    GeometryKind::MultiPolygon,
    GeometryKind::MultiPoint,
    GeometryKind::LineString,
    GeometryKind::Polygon,
    GeometryKind::Point,
];

/// If `text` starts (after leading whitespace) with a WKT geometry keyword, in any case, return
/// the kind along with the keyword exactly as written.
pub fn leading_keyword(text: &str) -> Option<(GeometryKind, &str)> {
    let text = text.trim_start();
    KEYWORDS.into_iter().find_map(|kind| {
        let keyword = kind.wkt_keyword();
        text.get(..keyword.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(keyword))
            .map(|prefix| (kind, prefix))
    })
}

fn padded<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> WktResult<'a, O>
where
    F: FnMut(&'a str) -> WktResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn open(i: &str) -> WktResult<'_, char> {
    padded(char('('))(i)
}

fn close(i: &str) -> WktResult<'_, char> {
    padded(char(')'))(i)
}

fn comma(i: &str) -> WktResult<'_, char> {
    padded(char(','))(i)
}

fn empty(i: &str) -> WktResult<'_, ()> {
    value((), padded(tag_no_case("EMPTY")))(i)
}

fn keyword(i: &str) -> WktResult<'_, GeometryKind> {
    alt((
        value(
            GeometryKind::GeometryCollection,
            tag_no_case("GEOMETRYCOLLECTION"),
        ),
        value(GeometryKind::MultiLineString, tag_no_case("MULTILINESTRING")),
        value(GeometryKind::MultiPolygon, tag_no_case("MULTIPOLYGON")),
        value(GeometryKind::MultiPoint, tag_no_case("MULTIPOINT")),
        value(GeometryKind::LineString, tag_no_case("LINESTRING")),
        value(GeometryKind::Polygon, tag_no_case("POLYGON")),
        value(GeometryKind::Point, tag_no_case("POINT")),
    ))(i)
}

/// The optional `Z`, `M` or `ZM` dimension marker after a keyword. It only affects how many
/// ordinates each coordinate may carry, and every coordinate accepts up to four anyway.
fn dimension(i: &str) -> WktResult<'_, &str> {
    terminated(
        alt((tag_no_case("ZM"), tag_no_case("Z"), tag_no_case("M"))),
        multispace0,
    )(i)
}

fn ordinate(i: &str) -> WktResult<'_, f64> {
    verify(double, |v: &f64| v.is_finite())(i)
}

fn coord(i: &str) -> WktResult<'_, Coord<f64>> {
    let (i, x) = ordinate(i)?;
    let (i, y) = preceded(multispace1, ordinate)(i)?;
    // Z and M
    let (i, _) = many_m_n(0, 2, preceded(multispace1, ordinate))(i)?;
    Ok((i, Coord { x, y }))
}

fn coord_list(i: &str) -> WktResult<'_, Vec<Coord<f64>>> {
    delimited(open, separated_list1(comma, padded(coord)), close)(i)
}

fn point_text(i: &str) -> WktResult<'_, Point<f64>> {
    map(delimited(open, padded(coord), close), Point::from)(i)
}

fn linestring_text(i: &str) -> WktResult<'_, LineString<f64>> {
    alt((
        map(empty, |_| LineString(vec![])),
        map(coord_list, LineString),
    ))(i)
}

fn polygon_text(i: &str) -> WktResult<'_, Polygon<f64>> {
    alt((
        map(empty, |_| Polygon::new(LineString(vec![]), vec![])),
        map(
            delimited(open, separated_list1(comma, map(coord_list, LineString)), close),
            |mut rings| {
                let exterior = rings.remove(0);
                Polygon::new(exterior, rings)
            },
        ),
    ))(i)
}

fn multipoint_text(i: &str) -> WktResult<'_, MultiPoint<f64>> {
    alt((
        map(empty, |_| MultiPoint(vec![])),
        map(
            delimited(
                open,
                separated_list1(comma, alt((point_text, map(padded(coord), Point::from)))),
                close,
            ),
            MultiPoint,
        ),
    ))(i)
}

fn multilinestring_text(i: &str) -> WktResult<'_, MultiLineString<f64>> {
    alt((
        map(empty, |_| MultiLineString(vec![])),
        map(
            delimited(open, separated_list1(comma, linestring_text), close),
            MultiLineString,
        ),
    ))(i)
}

fn multipolygon_text(i: &str) -> WktResult<'_, MultiPolygon<f64>> {
    alt((
        map(empty, |_| MultiPolygon(vec![])),
        map(
            delimited(open, separated_list1(comma, polygon_text), close),
            MultiPolygon,
        ),
    ))(i)
}

/// A collection enclosed by `depth` other collections.
fn collection_text(i: &str, depth: usize) -> WktResult<'_, GeometryCollection<f64>> {
    if depth >= MAX_NESTING {
        return Err(WktError::failure(i, "geometry nested too deeply"));
    }
    alt((
        map(empty, |_| GeometryCollection(vec![])),
        map(
            delimited(open, separated_list1(comma, |i| tagged(i, depth + 1)), close),
            GeometryCollection,
        ),
    ))(i)
}

fn tagged(i: &str, depth: usize) -> WktResult<'_, Shape> {
    let (i, kind) = padded(keyword)(i)?;
    let (i, _) = opt(dimension)(i)?;
    match kind {
        GeometryKind::Point => {
            if empty(i).is_ok() {
                return Err(WktError::failure(i, "POINT EMPTY is not supported"));
            }
            map(point_text, Shape::Point)(i)
        }
        GeometryKind::LineString => map(linestring_text, Shape::LineString)(i),
        GeometryKind::Polygon => map(polygon_text, Shape::Polygon)(i),
        GeometryKind::MultiPoint => map(multipoint_text, Shape::MultiPoint)(i),
        GeometryKind::MultiLineString => map(multilinestring_text, Shape::MultiLineString)(i),
        GeometryKind::MultiPolygon => map(multipolygon_text, Shape::MultiPolygon)(i),
        GeometryKind::GeometryCollection => {
            map(|i| collection_text(i, depth), Shape::GeometryCollection)(i)
        }
        GeometryKind::Geometry => Err(WktError::failure(i, "GEOMETRY is not a WKT keyword")),
    }
}

/// Parse a complete WKT string (no `SRID=` prefix). Trailing input is an error.
pub(crate) fn parse(text: &str) -> ParseResult<Shape> {
    match all_consuming(padded(|i| tagged(i, 0)))(text) {
        Ok((_, shape)) => Ok(shape),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(e.into_parse_error(text)),
        Err(nom::Err::Incomplete(_)) => Err(wkt_err!("unexpected end of input")),
    }
}

fn write_coord<W: Write>(coord: &Coord<f64>, out: &mut W) -> fmt::Result {
    write!(out, "{} {}", coord.x, coord.y)
}

fn write_coords<W: Write>(coords: &[Coord<f64>], out: &mut W) -> fmt::Result {
    out.write_char('(')?;
    for (i, coord) in coords.iter().enumerate() {
        if i > 0 {
            out.write_char(',')?;
        }
        write_coord(coord, out)?;
    }
    out.write_char(')')
}

fn write_line_string_text<W: Write>(line: &LineString<f64>, out: &mut W) -> fmt::Result {
    if line.0.is_empty() {
        out.write_str("EMPTY")
    } else {
        write_coords(&line.0, out)
    }
}

fn write_polygon_text<W: Write>(polygon: &Polygon<f64>, out: &mut W) -> fmt::Result {
    if polygon.exterior().0.is_empty() {
        return out.write_str("EMPTY");
    }
    out.write_char('(')?;
    write_coords(&polygon.exterior().0, out)?;
    for ring in polygon.interiors().iter().filter(|ring| !ring.0.is_empty()) {
        out.write_char(',')?;
        write_coords(&ring.0, out)?;
    }
    out.write_char(')')
}

/// Write `items` as `(a,b,c)`, or `EMPTY` when there are none.
fn write_members<W, T, F>(items: &[T], out: &mut W, mut write_item: F) -> fmt::Result
where
    W: Write,
    F: FnMut(&T, &mut W) -> fmt::Result,
{
    if items.is_empty() {
        return out.write_str(" EMPTY");
    }
    out.write_char('(')?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.write_char(',')?;
        }
        write_item(item, out)?;
    }
    out.write_char(')')
}

/// Write `shape` as MySQL-formatted WKT.
pub(crate) fn write<W: Write>(shape: &Shape, out: &mut W) -> fmt::Result {
    match shape {
        Shape::Point(point) => {
            out.write_str("POINT(")?;
            write_coord(&point.0, out)?;
            out.write_char(')')
        }
        Shape::LineString(line) => {
            out.write_str("LINESTRING")?;
            if line.0.is_empty() {
                out.write_char(' ')?;
            }
            write_line_string_text(line, out)
        }
        Shape::Polygon(polygon) => {
            out.write_str("POLYGON")?;
            if polygon.exterior().0.is_empty() {
                out.write_char(' ')?;
            }
            write_polygon_text(polygon, out)
        }
        Shape::MultiPoint(points) => {
            out.write_str("MULTIPOINT")?;
            write_members(&points.0, out, |point, out| {
                write_coords(std::slice::from_ref(&point.0), out)
            })
        }
        Shape::MultiLineString(lines) => {
            out.write_str("MULTILINESTRING")?;
            write_members(&lines.0, out, write_line_string_text)
        }
        Shape::MultiPolygon(polygons) => {
            out.write_str("MULTIPOLYGON")?;
            write_members(&polygons.0, out, write_polygon_text)
        }
        Shape::GeometryCollection(collection) => {
            out.write_str("GEOMETRYCOLLECTION")?;
            write_members(&collection.0, out, |member, out| write(member, out))
        }
        Shape::Line(line) => write(&LineString(vec![line.start, line.end]).into(), out),
        Shape::Rect(rect) => write(&rect.to_polygon().into(), out),
        Shape::Triangle(triangle) => write(&triangle.to_polygon().into(), out),
    }
}

/// Render `shape` as a WKT string.
pub(crate) fn to_string(shape: &Shape) -> String {
    let mut out = String::new();
    // Writing into a String never fails
    let _ = write(shape, &mut out);
    out
}
