//! Well-Known Binary and PostGIS-style extended WKB.
//!
//! <https://github.com/postgis/postgis/blob/master/doc/bnf-wkb.txt> (for wkb).
//! <https://github.com/postgis/postgis/blob/master/doc/ZMSgeoms.txt> (for ewkb).
//!
//! Reading accepts big- and little-endian input (nested geometries carry their own byte order
//! marker), ISO dimension offsets (`1000`/`2000`/`3000`) and EWKB type flags. Z and M ordinates
//! are read and discarded. Writing always produces two-dimensional output.

use bitflags::bitflags;
use geo_types::{
    Coord, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};

use super::{ByteOrder, MAX_NESTING};
use crate::error::{wkb_err, ParseResult};
use crate::geometry::kind_of;
use crate::kind::GeometryKind;

type Shape = geo_types::Geometry<f64>;

const NUM_OF_BYTES_U32: usize = std::mem::size_of::<u32>();
const NUM_OF_BYTES_F64: usize = std::mem::size_of::<f64>();
/// Byte order marker plus type code
const HEADER_LEN: usize = 1 + NUM_OF_BYTES_U32;

bitflags! {
    /// Bit flags used in EWKB type codes to indicate geometry properties.
    ///
    /// - Bit 28 (0x10000000): Has bounding box flag
    /// - Bit 29 (0x20000000): Has SRID flag
    /// - Bit 30 (0x40000000): Has M dimension flag
    /// - Bit 31 (0x80000000): Has Z dimension flag
    ///
    /// For more details on the type code flags, see:
    /// https://github.com/postgis/postgis/blob/54c1f5671c6ffc7617621bc09a685872cf7695ac/liblwgeom/liblwgeom.h.in#L121-L127
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct EwkbTypeFlags: u32 {
        const HAS_BBOX = 0x1000_0000;
        const HAS_SRID = 0x2000_0000;
        const HAS_M = 0x4000_0000;
        const HAS_Z = 0x8000_0000;
    }
}

/// The result of reading one top-level (E)WKB geometry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Decoded {
    pub(crate) shape: Shape,
    /// The SRID embedded in an EWKB header, if any
    pub(crate) srid: Option<u32>,
}

/// A split type code: the geometry kind, how many ordinates each coordinate carries, and
/// whether an EWKB SRID follows.
struct TypeCode {
    kind: GeometryKind,
    ordinates: usize,
    has_srid: bool,
}

impl TypeCode {
    fn parse(raw: u32) -> ParseResult<Self> {
        let flags = EwkbTypeFlags::from_bits_truncate(raw);
        if flags.contains(EwkbTypeFlags::HAS_BBOX) {
            return Err(wkb_err!("bounding boxes are not supported (type code {raw:#010x})"));
        }

        let base = raw & !EwkbTypeFlags::all().bits();
        let (iso_z, iso_m) = match base / 1000 {
            0 => (false, false),
            1 => (true, false),
            2 => (false, true),
            3 => (true, true),
            _ => return Err(wkb_err!("unsupported geometry type code {raw:#010x}")),
        };
        let kind = GeometryKind::from_wkb_code(base % 1000)
            .ok_or_else(|| wkb_err!("unsupported geometry type code {raw:#010x}"))?;

        let has_z = iso_z || flags.contains(EwkbTypeFlags::HAS_Z);
        let has_m = iso_m || flags.contains(EwkbTypeFlags::HAS_M);
        Ok(Self {
            kind,
            ordinates: 2 + usize::from(has_z) + usize::from(has_m),
            has_srid: flags.contains(EwkbTypeFlags::HAS_SRID),
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
    /// How many multi-geometries enclose the geometry being read
    depth: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take<const N: usize>(&mut self, what: &str) -> ParseResult<[u8; N]> {
        let arr: [u8; N] = self
            .bytes
            .get(self.offset..self.offset + N)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| {
                wkb_err!("insufficient bytes for {what} at offset {}", self.offset)
            })?;
        self.offset += N;
        Ok(arr)
    }

    fn extract_byte_order(&mut self) -> ParseResult<ByteOrder> {
        let [marker] = self.take::<1>("byte order")?;
        match marker {
            0 => Ok(ByteOrder::BigEndian),
            1 => Ok(ByteOrder::LittleEndian),
            other => Err(wkb_err!(
                "invalid byte order marker {other} at offset {}",
                self.offset - 1
            )),
        }
    }

    fn extract_u32(&mut self, order: ByteOrder, what: &str) -> ParseResult<u32> {
        let arr = self.take::<NUM_OF_BYTES_U32>(what)?;
        Ok(match order {
            ByteOrder::LittleEndian => u32::from_le_bytes(arr),
            ByteOrder::BigEndian => u32::from_be_bytes(arr),
        })
    }

    fn extract_f64(&mut self, order: ByteOrder) -> ParseResult<f64> {
        let arr = self.take::<NUM_OF_BYTES_F64>("coordinate")?;
        Ok(match order {
            ByteOrder::LittleEndian => f64::from_le_bytes(arr),
            ByteOrder::BigEndian => f64::from_be_bytes(arr),
        })
    }

    /// Read an element count and make sure the input could hold that many elements of at least
    /// `min_size` bytes each, before anything is allocated for them.
    fn extract_count(&mut self, order: ByteOrder, what: &str, min_size: usize) -> ParseResult<usize> {
        let count = self.extract_u32(order, what)? as usize;
        if count.saturating_mul(min_size) > self.remaining() {
            return Err(wkb_err!(
                "{what} {count} exceeds the {} remaining bytes",
                self.remaining()
            ));
        }
        Ok(count)
    }

    fn extract_coord(&mut self, order: ByteOrder, ordinates: usize) -> ParseResult<Coord<f64>> {
        let x = self.extract_f64(order)?;
        let y = self.extract_f64(order)?;
        for _ in 2..ordinates {
            self.extract_f64(order)?;
        }
        Ok(Coord { x, y })
    }

    fn extract_coords(
        &mut self,
        order: ByteOrder,
        ordinates: usize,
    ) -> ParseResult<Vec<Coord<f64>>> {
        let count = self.extract_count(order, "point count", ordinates * NUM_OF_BYTES_F64)?;
        (0..count)
            .map(|_| self.extract_coord(order, ordinates))
            .collect()
    }

    fn extract_polygon(&mut self, order: ByteOrder, ordinates: usize) -> ParseResult<Polygon<f64>> {
        let count = self.extract_count(order, "ring count", NUM_OF_BYTES_U32)?;
        let mut rings = (0..count)
            .map(|_| {
                let ring = self.extract_coords(order, ordinates)?;
                if ring.is_empty() {
                    return Err(wkb_err!("empty polygon ring at offset {}", self.offset));
                }
                Ok(LineString(ring))
            })
            .collect::<ParseResult<Vec<_>>>()?;
        if rings.is_empty() {
            return Ok(Polygon::new(LineString(vec![]), vec![]));
        }
        let exterior = rings.remove(0);
        Ok(Polygon::new(exterior, rings))
    }

    /// Read the members of a multi-geometry, each of which must be a `member` geometry.
    fn extract_members(
        &mut self,
        order: ByteOrder,
        member: Option<GeometryKind>,
    ) -> ParseResult<Vec<Shape>> {
        if self.depth >= MAX_NESTING {
            return Err(wkb_err!("geometry nested too deeply at offset {}", self.offset));
        }
        let count = self.extract_count(order, "geometry count", HEADER_LEN)?;
        self.depth += 1;
        let members = (0..count)
            .map(|_| {
                let shape = self.extract_geometry(false)?.shape;
                let found = kind_of(&shape);
                match member {
                    Some(expected) if found != expected => {
                        Err(wkb_err!("expected {expected} member, found {found}"))
                    }
                    _ => Ok(shape),
                }
            })
            .collect::<ParseResult<Vec<_>>>();
        self.depth -= 1;
        members
    }

    fn extract_geometry(&mut self, top_level: bool) -> ParseResult<Decoded> {
        let order = self.extract_byte_order()?;
        let type_code = TypeCode::parse(self.extract_u32(order, "geometry type")?)?;
        let srid = if type_code.has_srid {
            if !top_level {
                return Err(wkb_err!("nested geometries cannot carry an SRID"));
            }
            Some(self.extract_u32(order, "SRID")?)
        } else {
            None
        };

        let ordinates = type_code.ordinates;
        let shape = match type_code.kind {
            GeometryKind::Point => {
                let coord = self.extract_coord(order, ordinates)?;
                if coord.x.is_nan() && coord.y.is_nan() {
                    return Err(wkb_err!("empty points are not supported"));
                }
                Shape::Point(Point::from(coord))
            }
            GeometryKind::LineString => {
                Shape::LineString(LineString(self.extract_coords(order, ordinates)?))
            }
            GeometryKind::Polygon => Shape::Polygon(self.extract_polygon(order, ordinates)?),
            GeometryKind::MultiPoint => Shape::MultiPoint(MultiPoint(
                self.extract_members(order, Some(GeometryKind::Point))?
                    .into_iter()
                    .filter_map(|shape| match shape {
                        Shape::Point(point) => Some(point),
                        _ => None,
                    })
                    .collect(),
            )),
            GeometryKind::MultiLineString => Shape::MultiLineString(MultiLineString(
                self.extract_members(order, Some(GeometryKind::LineString))?
                    .into_iter()
                    .filter_map(|shape| match shape {
                        Shape::LineString(line) => Some(line),
                        _ => None,
                    })
                    .collect(),
            )),
            GeometryKind::MultiPolygon => Shape::MultiPolygon(MultiPolygon(
                self.extract_members(order, Some(GeometryKind::Polygon))?
                    .into_iter()
                    .filter_map(|shape| match shape {
                        Shape::Polygon(polygon) => Some(polygon),
                        _ => None,
                    })
                    .collect(),
            )),
            GeometryKind::GeometryCollection => {
                Shape::GeometryCollection(GeometryCollection(self.extract_members(order, None)?))
            }
            // `from_wkb_code` never yields the abstract kind
            GeometryKind::Geometry => return Err(wkb_err!("unsupported geometry type code 0")),
        };
        Ok(Decoded { shape, srid })
    }
}

/// Read exactly one (E)WKB geometry from `bytes`. Trailing bytes are an error.
pub(crate) fn read(bytes: &[u8]) -> ParseResult<Decoded> {
    let mut reader = Reader {
        bytes,
        offset: 0,
        depth: 0,
    };
    let decoded = reader.extract_geometry(true)?;
    if reader.remaining() > 0 {
        return Err(wkb_err!(
            "{} unexpected trailing bytes at offset {}",
            reader.remaining(),
            reader.offset
        ));
    }
    Ok(decoded)
}

struct Writer<'a> {
    out: &'a mut Vec<u8>,
    order: ByteOrder,
}

impl Writer<'_> {
    fn put_u32(&mut self, value: u32) {
        match self.order {
            ByteOrder::LittleEndian => self.out.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::BigEndian => self.out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    fn put_f64(&mut self, value: f64) {
        match self.order {
            ByteOrder::LittleEndian => self.out.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::BigEndian => self.out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    fn put_len(&mut self, len: usize) {
        // Element counts are u32 on the wire; geometries that large cannot be sent to MySQL
        self.put_u32(u32::try_from(len).unwrap_or(u32::MAX));
    }

    fn put_header(&mut self, kind: GeometryKind, srid: Option<u32>) {
        self.out.push(match self.order {
            ByteOrder::BigEndian => 0,
            ByteOrder::LittleEndian => 1,
        });
        match srid {
            Some(srid) => {
                self.put_u32(kind.wkb_code() | EwkbTypeFlags::HAS_SRID.bits());
                self.put_u32(srid);
            }
            None => self.put_u32(kind.wkb_code()),
        }
    }

    fn put_coords(&mut self, coords: &[Coord<f64>]) {
        self.put_len(coords.len());
        for coord in coords {
            self.put_f64(coord.x);
            self.put_f64(coord.y);
        }
    }

    fn put_polygon(&mut self, polygon: &Polygon<f64>) {
        if polygon.exterior().0.is_empty() {
            self.put_len(0);
            return;
        }
        let holes = polygon.interiors().iter().filter(|ring| !ring.0.is_empty());
        self.put_len(1 + holes.clone().count());
        self.put_coords(&polygon.exterior().0);
        for ring in holes {
            self.put_coords(&ring.0);
        }
    }

    fn put_geometry(&mut self, shape: &Shape, srid: Option<u32>) {
        match shape {
            Shape::Point(point) => {
                self.put_header(GeometryKind::Point, srid);
                self.put_f64(point.x());
                self.put_f64(point.y());
            }
            Shape::LineString(line) => {
                self.put_header(GeometryKind::LineString, srid);
                self.put_coords(&line.0);
            }
            Shape::Polygon(polygon) => {
                self.put_header(GeometryKind::Polygon, srid);
                self.put_polygon(polygon);
            }
            Shape::MultiPoint(points) => {
                self.put_header(GeometryKind::MultiPoint, srid);
                self.put_len(points.0.len());
                for point in &points.0 {
                    self.put_geometry(&Shape::Point(*point), None);
                }
            }
            Shape::MultiLineString(lines) => {
                self.put_header(GeometryKind::MultiLineString, srid);
                self.put_len(lines.0.len());
                for line in &lines.0 {
                    self.put_header(GeometryKind::LineString, None);
                    self.put_coords(&line.0);
                }
            }
            Shape::MultiPolygon(polygons) => {
                self.put_header(GeometryKind::MultiPolygon, srid);
                self.put_len(polygons.0.len());
                for polygon in &polygons.0 {
                    self.put_header(GeometryKind::Polygon, None);
                    self.put_polygon(polygon);
                }
            }
            Shape::GeometryCollection(collection) => {
                self.put_header(GeometryKind::GeometryCollection, srid);
                self.put_len(collection.0.len());
                for member in &collection.0 {
                    self.put_geometry(member, None);
                }
            }
            Shape::Line(line) => {
                self.put_geometry(&LineString(vec![line.start, line.end]).into(), srid)
            }
            Shape::Rect(rect) => self.put_geometry(&rect.to_polygon().into(), srid),
            Shape::Triangle(triangle) => self.put_geometry(&triangle.to_polygon().into(), srid),
        }
    }
}

/// Append `shape` as WKB to `out`; with `srid`, as EWKB carrying that SRID.
pub(crate) fn write(shape: &Shape, order: ByteOrder, srid: Option<u32>, out: &mut Vec<u8>) {
    Writer { out, order }.put_geometry(shape, srid);
}

#[cfg(test)]
mod tests {
    use geo_types::point;
    use pretty_assertions::assert_eq;

    use super::*;

    fn to_wkb(shape: &Shape, order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::new();
        write(shape, order, None, &mut out);
        out
    }

    fn make_point_bytes(x: f64, y: f64, little_endian: bool) -> Vec<u8> {
        let mut bytes = Vec::new();
        if little_endian {
            bytes.push(1);
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.extend_from_slice(&x.to_le_bytes());
            bytes.extend_from_slice(&y.to_le_bytes());
        } else {
            bytes.push(0);
            bytes.extend_from_slice(&1u32.to_be_bytes());
            bytes.extend_from_slice(&x.to_be_bytes());
            bytes.extend_from_slice(&y.to_be_bytes());
        }
        bytes
    }

    #[test]
    fn reads_little_and_big_endian_points() {
        let expected = Shape::Point(point! { x: 1.5, y: -2.25 });
        for little_endian in [true, false] {
            let decoded = read(&make_point_bytes(1.5, -2.25, little_endian)).unwrap();
            assert_eq!(decoded.shape, expected);
            assert_eq!(decoded.srid, None);
        }
    }

    #[test]
    fn writes_standard_point() {
        let shape = Shape::Point(point! { x: 1.5, y: -2.25 });
        assert_eq!(
            to_wkb(&shape, ByteOrder::LittleEndian),
            make_point_bytes(1.5, -2.25, true)
        );
        assert_eq!(
            to_wkb(&shape, ByteOrder::BigEndian),
            make_point_bytes(1.5, -2.25, false)
        );
    }

    #[test]
    fn reads_ewkb_srid() {
        let shape = Shape::Point(point! { x: 139.7, y: 35.7 });
        let mut bytes = Vec::new();
        write(&shape, ByteOrder::BigEndian, Some(4326), &mut bytes);
        assert_eq!(&bytes[1..5], &0x2000_0001u32.to_be_bytes());
        let decoded = read(&bytes).unwrap();
        assert_eq!(decoded.shape, shape);
        assert_eq!(decoded.srid, Some(4326));
    }

    #[test]
    fn drops_ewkb_z() {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&(1u32 | EwkbTypeFlags::HAS_Z.bits()).to_le_bytes());
        for ordinate in [1.0f64, 2.0, 3.0] {
            bytes.extend_from_slice(&ordinate.to_le_bytes());
        }
        assert_eq!(read(&bytes).unwrap().shape, Shape::Point(point! { x: 1.0, y: 2.0 }));
    }

    #[test]
    fn drops_iso_zm() {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&3002u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        for ordinate in [1.0f64, 2.0, 3.0, 4.0] {
            bytes.extend_from_slice(&ordinate.to_le_bytes());
        }
        assert_eq!(
            read(&bytes).unwrap().shape,
            Shape::LineString(LineString(vec![Coord { x: 1.0, y: 2.0 }]))
        );
    }

    #[test]
    fn nested_geometries_use_their_own_byte_order() {
        // A little-endian multipoint containing one big-endian point
        let mut bytes = vec![1];
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&make_point_bytes(3.0, 4.0, false));
        assert_eq!(
            read(&bytes).unwrap().shape,
            Shape::MultiPoint(MultiPoint(vec![point! { x: 3.0, y: 4.0 }]))
        );
    }

    #[test]
    fn rejects_nan_point() {
        let err = read(&make_point_bytes(f64::NAN, f64::NAN, true)).unwrap_err();
        assert!(err.to_string().contains("empty points"), "{err}");
    }

    #[test]
    fn rejects_huge_counts_without_allocating() {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        let err = read(&bytes).unwrap_err();
        assert!(err.to_string().contains("point count"), "{err}");
    }

    #[test]
    fn rejects_truncated_and_trailing_input() {
        let bytes = make_point_bytes(1.0, 2.0, true);
        assert!(read(&bytes[..bytes.len() - 1]).is_err());
        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(read(&trailing).is_err());
        assert!(read(&[]).is_err());
        assert!(read(&[2, 1, 0, 0, 0]).is_err());
    }

    #[test]
    fn rejects_mismatched_multi_members() {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&6u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&make_point_bytes(3.0, 4.0, true));
        assert!(read(&bytes).is_err());
    }

    #[test]
    fn rejects_bounding_boxes() {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&(1u32 | EwkbTypeFlags::HAS_BBOX.bits()).to_le_bytes());
        bytes.extend_from_slice(&[0; 16]);
        assert!(read(&bytes).is_err());
    }

    /// `levels` collections, each holding the next, around an empty collection.
    fn nested_collections(levels: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(levels * 9 + 9);
        for _ in 0..levels {
            bytes.push(1);
            bytes.extend_from_slice(&7u32.to_le_bytes());
            bytes.extend_from_slice(&1u32.to_le_bytes());
        }
        bytes.push(1);
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes
    }

    #[test]
    fn reads_collections_up_to_max_nesting() {
        let mut expected = Shape::GeometryCollection(GeometryCollection(vec![]));
        for _ in 1..MAX_NESTING {
            expected = Shape::GeometryCollection(GeometryCollection(vec![expected]));
        }
        assert_eq!(read(&nested_collections(MAX_NESTING - 1)).unwrap().shape, expected);
    }

    #[test]
    fn rejects_deeply_nested_collections() {
        let err = read(&nested_collections(MAX_NESTING)).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"), "{err}");

        let err = read(&nested_collections(200_000)).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"), "{err}");
    }

    #[test]
    fn rejects_member_count_beyond_input() {
        // A collection claiming five members but holding one point
        let mut bytes = vec![1];
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&5u32.to_le_bytes());
        bytes.extend_from_slice(&make_point_bytes(1.0, 2.0, true));
        let err = read(&bytes).unwrap_err();
        assert!(err.to_string().contains("geometry count"), "{err}");

        // The same inside an outer collection
        let mut outer = vec![1];
        outer.extend_from_slice(&7u32.to_le_bytes());
        outer.extend_from_slice(&1u32.to_le_bytes());
        outer.extend_from_slice(&bytes);
        assert!(read(&outer).is_err());
    }

    #[test]
    fn rejects_empty_polygon_rings() {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());
        for (x, y) in [(0.0f64, 0.0f64), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)] {
            bytes.extend_from_slice(&x.to_le_bytes());
            bytes.extend_from_slice(&y.to_le_bytes());
        }
        bytes.extend_from_slice(&0u32.to_le_bytes());
        let err = read(&bytes).unwrap_err();
        assert!(err.to_string().contains("empty polygon ring"), "{err}");
    }

    #[test]
    fn never_writes_empty_holes() {
        let exterior = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        let with_hole = Shape::Polygon(Polygon::new(exterior.clone(), vec![LineString(vec![])]));
        let decoded = read(&to_wkb(&with_hole, ByteOrder::LittleEndian)).unwrap();
        assert_eq!(decoded.shape, Shape::Polygon(Polygon::new(exterior, vec![])));
    }
}
