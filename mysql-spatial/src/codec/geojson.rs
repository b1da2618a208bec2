//! GeoJSON-like mappings (`{"type": "Point", "coordinates": [1, 2]}`).
//!
//! Only the geometry objects are handled, plus a `Feature` wrapper whose `geometry` member is
//! decoded. Positions with more than two elements have the extra ordinates dropped.

use geo_types::{
    Coord, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};
use serde_json::{json, Map, Value};

use super::MAX_NESTING;
use crate::error::{geojson_err, ParseResult};

type Shape = geo_types::Geometry<f64>;

/// Decode a GeoJSON geometry object. Objects without a `type`, or whose `type` names a geometry
/// but which carry no `coordinates`/`geometries`, are not geometries and yield `None`.
pub(crate) fn decode(value: &Value) -> ParseResult<Option<Shape>> {
    decode_at(value, 0)
}

/// Decode `value`, which is enclosed by `depth` collections or features.
fn decode_at(value: &Value, depth: usize) -> ParseResult<Option<Shape>> {
    let object = value
        .as_object()
        .ok_or_else(|| geojson_err!("expected a JSON object, got {value}"))?;
    let Some(type_name) = object.get("type") else {
        return Ok(None);
    };
    let type_name = type_name
        .as_str()
        .ok_or_else(|| geojson_err!("`type` must be a string, got {type_name}"))?;

    let nests = matches!(type_name, "Feature" | "GeometryCollection");
    if nests && depth >= MAX_NESTING {
        return Err(geojson_err!("geometry nested too deeply"));
    }

    if type_name == "Feature" {
        return match object.get("geometry") {
            None | Some(Value::Null) => Ok(None),
            Some(geometry) => decode_at(geometry, depth + 1),
        };
    }
    if type_name == "GeometryCollection" {
        let Some(members) = object.get("geometries") else {
            return Ok(None);
        };
        let members = array(members, "geometries")?
            .iter()
            .map(|member| {
                decode_at(member, depth + 1)?.ok_or_else(|| geojson_err!("invalid collection member {member}"))
            })
            .collect::<ParseResult<Vec<_>>>()?;
        return Ok(Some(geo_types::Geometry::GeometryCollection(GeometryCollection(members))));
    }

    let Some(coordinates) = object.get("coordinates") else {
        return Ok(None);
    };
    let shape: Shape = match type_name {
        "Point" => Point::from(position(coordinates)?).into(),
        "LineString" => line_string(coordinates)?.into(),
        "Polygon" => polygon(coordinates)?.into(),
        "MultiPoint" => MultiPoint(
            array(coordinates, "coordinates")?
                .iter()
                .map(|p| position(p).map(Point::from))
                .collect::<ParseResult<_>>()?,
        )
        .into(),
        "MultiLineString" => MultiLineString(
            array(coordinates, "coordinates")?
                .iter()
                .map(line_string)
                .collect::<ParseResult<_>>()?,
        )
        .into(),
        "MultiPolygon" => MultiPolygon(
            array(coordinates, "coordinates")?
                .iter()
                .map(polygon)
                .collect::<ParseResult<_>>()?,
        )
        .into(),
        other => return Err(geojson_err!("unsupported geometry type `{other}`")),
    };
    Ok(Some(shape))
}

fn array<'a>(value: &'a Value, what: &str) -> ParseResult<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| geojson_err!("`{what}` must be an array, got {value}"))
}

fn position(value: &Value) -> ParseResult<Coord<f64>> {
    let ordinates = array(value, "position")?;
    let ordinate = |i: usize| {
        ordinates
            .get(i)
            .and_then(Value::as_f64)
            .ok_or_else(|| geojson_err!("position must hold at least two numbers, got {value}"))
    };
    Ok(Coord {
        x: ordinate(0)?,
        y: ordinate(1)?,
    })
}

fn line_string(value: &Value) -> ParseResult<LineString<f64>> {
    array(value, "coordinates")?
        .iter()
        .map(position)
        .collect::<ParseResult<Vec<_>>>()
        .map(LineString)
}

fn polygon(value: &Value) -> ParseResult<Polygon<f64>> {
    let mut rings = array(value, "coordinates")?
        .iter()
        .map(line_string)
        .collect::<ParseResult<Vec<_>>>()?;
    if rings.iter().any(|ring| ring.0.is_empty()) {
        return Err(geojson_err!("empty polygon ring in {value}"));
    }
    if rings.is_empty() {
        return Ok(Polygon::new(LineString(vec![]), vec![]));
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn encode_coord(coord: &Coord<f64>) -> Value {
    json!([coord.x, coord.y])
}

fn encode_line(line: &LineString<f64>) -> Value {
    Value::Array(line.0.iter().map(encode_coord).collect())
}

fn encode_polygon(polygon: &Polygon<f64>) -> Value {
    if polygon.exterior().0.is_empty() {
        return json!([]);
    }
    Value::Array(
        std::iter::once(polygon.exterior())
            .chain(polygon.interiors().iter().filter(|ring| !ring.0.is_empty()))
            .map(encode_line)
            .collect(),
    )
}

fn object(type_name: &str, key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), type_name.into());
    map.insert(key.into(), value);
    Value::Object(map)
}

/// Encode `shape` as a GeoJSON geometry object.
pub(crate) fn encode(shape: &Shape) -> Value {
    match shape {
        Shape::Point(point) => object("Point", "coordinates", encode_coord(&point.0)),
        Shape::LineString(line) => object("LineString", "coordinates", encode_line(line)),
        Shape::Polygon(polygon) => object("Polygon", "coordinates", encode_polygon(polygon)),
        Shape::MultiPoint(points) => object(
            "MultiPoint",
            "coordinates",
            points.0.iter().map(|p| encode_coord(&p.0)).collect(),
        ),
        Shape::MultiLineString(lines) => object(
            "MultiLineString",
            "coordinates",
            lines.0.iter().map(encode_line).collect(),
        ),
        Shape::MultiPolygon(polygons) => object(
            "MultiPolygon",
            "coordinates",
            polygons.0.iter().map(encode_polygon).collect(),
        ),
        Shape::GeometryCollection(collection) => object(
            "GeometryCollection",
            "geometries",
            collection.0.iter().map(encode).collect(),
        ),
        Shape::Line(line) => encode(&LineString(vec![line.start, line.end]).into()),
        Shape::Rect(rect) => encode(&rect.to_polygon().into()),
        Shape::Triangle(triangle) => encode(&triangle.to_polygon().into()),
    }
}
