use std::fmt;

use geo_types::{GeometryCollection, LineString};

use crate::codec::wkt;
use crate::factory::{FactorySelector, GeometryFactory};
use crate::kind::GeometryKind;
use crate::srid::CoordinateSystem;

/// An immutable two-dimensional geometry bound to an SRID.
///
/// The coordinates are held in a [`geo_types::Geometry`]; the SRID and coordinate system come
/// from the [`GeometryFactory`] that built the value. Use [`Geometry::with_srid`] to rebind a
/// geometry to a different reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    shape: geo_types::Geometry<f64>,
    factory: GeometryFactory,
}

impl Geometry {
    pub(crate) fn from_parts(shape: geo_types::Geometry<f64>, factory: GeometryFactory) -> Self {
        Self { shape, factory }
    }

    /// The concrete kind of this geometry. Never [`GeometryKind::Geometry`].
    pub fn kind(&self) -> GeometryKind {
        kind_of(&self.shape)
    }

    pub fn srid(&self) -> u32 {
        self.factory.srid()
    }

    pub fn factory(&self) -> GeometryFactory {
        self.factory
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.factory.coordinate_system()
    }

    pub fn is_geographic(&self) -> bool {
        self.factory.is_geographic()
    }

    pub fn has_z(&self) -> bool {
        self.factory.has_z()
    }

    pub fn has_m(&self) -> bool {
        self.factory.has_m()
    }

    pub fn shape(&self) -> &geo_types::Geometry<f64> {
        &self.shape
    }

    pub fn into_shape(self) -> geo_types::Geometry<f64> {
        self.shape
    }

    /// Is this a geometry without any coordinates, e.g. `GEOMETRYCOLLECTION EMPTY`?
    pub fn is_empty(&self) -> bool {
        is_empty(&self.shape)
    }

    /// The X ordinate, if this is a point
    pub fn x(&self) -> Option<f64> {
        match &self.shape {
            geo_types::Geometry::Point(p) => Some(p.x()),
            _ => None,
        }
    }

    /// The Y ordinate, if this is a point
    pub fn y(&self) -> Option<f64> {
        match &self.shape {
            geo_types::Geometry::Point(p) => Some(p.y()),
            _ => None,
        }
    }

    /// The longitude of a point in a geographic reference system.
    pub fn longitude(&self) -> Option<f64> {
        self.x().filter(|_| self.is_geographic())
    }

    /// The latitude of a point in a geographic reference system.
    pub fn latitude(&self) -> Option<f64> {
        self.y().filter(|_| self.is_geographic())
    }

    /// The same coordinates bound to `srid`, using `selector` to pick the factory.
    pub fn with_srid(&self, selector: &FactorySelector, srid: u32) -> Self {
        Self {
            shape: self.shape.clone(),
            factory: selector.select(srid),
        }
    }
}

/// Formats as WKT without an SRID prefix.
impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        wkt::write(&self.shape, f)
    }
}

pub(crate) fn kind_of(shape: &geo_types::Geometry<f64>) -> GeometryKind {
    use geo_types::Geometry as G;
    match shape {
        G::Point(_) => GeometryKind::Point,
        G::Line(_) | G::LineString(_) => GeometryKind::LineString,
        G::Polygon(_) | G::Rect(_) | G::Triangle(_) => GeometryKind::Polygon,
        G::MultiPoint(_) => GeometryKind::MultiPoint,
        G::MultiLineString(_) => GeometryKind::MultiLineString,
        G::MultiPolygon(_) => GeometryKind::MultiPolygon,
        G::GeometryCollection(_) => GeometryKind::GeometryCollection,
    }
}

fn is_empty(shape: &geo_types::Geometry<f64>) -> bool {
    use geo_types::Geometry as G;
    match shape {
        G::Point(_) | G::Line(_) | G::Rect(_) | G::Triangle(_) => false,
        G::LineString(ls) => ls.0.is_empty(),
        G::Polygon(p) => p.exterior().0.is_empty(),
        G::MultiPoint(mp) => mp.0.is_empty(),
        G::MultiLineString(mls) => mls.0.is_empty(),
        G::MultiPolygon(mp) => mp.0.is_empty(),
        G::GeometryCollection(gc) => gc.0.iter().all(is_empty),
    }
}

/// Rewrite the shapes MySQL has no type for (`Line`, `Rect`, `Triangle`) into their
/// `LineString`/`Polygon` equivalents, recursing into collections.
pub(crate) fn normalize(shape: geo_types::Geometry<f64>) -> geo_types::Geometry<f64> {
    match shape {
        geo_types::Geometry::Line(line) => LineString(vec![line.start, line.end]).into(),
        geo_types::Geometry::Rect(rect) => rect.to_polygon().into(),
        geo_types::Geometry::Triangle(triangle) => triangle.to_polygon().into(),
        geo_types::Geometry::GeometryCollection(gc) => {
            geo_types::Geometry::GeometryCollection(GeometryCollection(gc.0.into_iter().map(normalize).collect()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use geo_types::{coord, Line, Rect};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn point_accessors() {
        let point = FactorySelector::new().select(4326).point(139.7, 35.7);
        assert_eq!(point.kind(), GeometryKind::Point);
        assert_eq!(point.srid(), 4326);
        assert_eq!(point.longitude(), Some(139.7));
        assert_eq!(point.latitude(), Some(35.7));
        assert!(!point.has_z());
        assert!(!point.has_m());
        assert!(!point.is_empty());
    }

    #[test]
    fn projected_points_have_no_longitude() {
        let point = FactorySelector::new().select(3857).point(1.0, 2.0);
        assert_eq!(point.x(), Some(1.0));
        assert_eq!(point.longitude(), None);
        assert_eq!(point.latitude(), None);
    }

    #[test]
    fn with_srid_rebinds_factory() {
        let selector = FactorySelector::new();
        let point = selector.select(0).point(1.0, 2.0);
        let geographic = point.with_srid(&selector, 4326);
        assert_eq!(point.srid(), 0);
        assert_eq!(geographic.srid(), 4326);
        assert!(geographic.is_geographic());
        assert_eq!(geographic.shape(), point.shape());
    }

    #[test]
    fn normalizes_line_and_rect() {
        let factory = GeometryFactory::projected(0);
        let line = factory.geometry(Line::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }));
        assert_eq!(line.kind(), GeometryKind::LineString);
        assert_eq!(line.to_string(), "LINESTRING(0 0,1 1)");

        let rect = factory.geometry(Rect::new(
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 1.0, y: 1.0 },
        ));
        assert!(matches!(rect.shape(), geo_types::Geometry::Polygon(_)));
    }

    #[test]
    fn empty_collection() {
        let empty = GeometryFactory::projected(0).geometry(geo_types::Geometry::GeometryCollection(GeometryCollection::<f64>(vec![])));
        assert!(empty.is_empty());
        assert_eq!(empty.to_string(), "GEOMETRYCOLLECTION EMPTY");
    }
}
