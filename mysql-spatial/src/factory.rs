//! Geometry factories and the selector that picks one for an SRID.

use std::collections::BTreeSet;
use std::sync::Arc;

use geo_types::{Coord, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::codec::{wkb, wkt};
use crate::error::{wkb_err, ParseResult};
use crate::geometry::{normalize, Geometry};
use crate::srid::{self, CoordinateSystem};

/// Builds [`Geometry`] values bound to one SRID and coordinate system.
///
/// Factories are plain values: two factories for the same SRID and coordinate system behave
/// identically, so there is nothing to memoize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeometryFactory {
    srid: u32,
    system: CoordinateSystem,
}

impl GeometryFactory {
    /// A factory for an ellipsoidal longitude/latitude reference system.
    pub fn geographic(srid: u32) -> Self {
        Self {
            srid,
            system: CoordinateSystem::Geographic,
        }
    }

    /// A factory for a flat Cartesian reference system.
    pub fn projected(srid: u32) -> Self {
        Self {
            srid,
            system: CoordinateSystem::Projected,
        }
    }

    pub fn srid(&self) -> u32 {
        self.srid
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.system
    }

    pub fn is_geographic(&self) -> bool {
        self.system.is_geographic()
    }

    /// Geometries are always two-dimensional; Z ordinates are dropped while parsing.
    pub fn has_z(&self) -> bool {
        false
    }

    /// Geometries never carry measures; M ordinates are dropped while parsing.
    pub fn has_m(&self) -> bool {
        false
    }

    /// Wrap a [`geo_types`] shape. `Line`, `Rect` and `Triangle` are converted into the
    /// equivalent `LineString` or `Polygon`, since MySQL has no such types.
    pub fn geometry(&self, shape: impl Into<geo_types::Geometry<f64>>) -> Geometry {
        Geometry::from_parts(normalize(shape.into()), *self)
    }

    pub fn point(&self, x: f64, y: f64) -> Geometry {
        self.geometry(Point::new(x, y))
    }

    pub fn line_string<I>(&self, coords: I) -> Geometry
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        self.geometry(line_string(coords))
    }

    /// A polygon from its exterior ring and holes. Rings are closed if they aren't already.
    pub fn polygon<I, H>(&self, exterior: I, holes: H) -> Geometry
    where
        I: IntoIterator<Item = (f64, f64)>,
        H: IntoIterator<Item = Vec<(f64, f64)>>,
    {
        self.geometry(Polygon::new(
            line_string(exterior),
            holes.into_iter().map(line_string).collect(),
        ))
    }

    /// Parse plain WKT (no `SRID=` prefix) into a geometry bound to this factory.
    pub fn parse_wkt(&self, text: &str) -> ParseResult<Geometry> {
        wkt::parse(text).map(|shape| self.geometry(shape))
    }

    /// Parse standard WKB into a geometry bound to this factory.
    ///
    /// EWKB input is accepted as long as its embedded SRID (if any) agrees with the factory.
    pub fn parse_wkb(&self, bytes: &[u8]) -> ParseResult<Geometry> {
        let decoded = wkb::read(bytes)?;
        match decoded.srid {
            Some(srid) if srid != self.srid => Err(wkb_err!(
                "embedded SRID {srid} does not match expected SRID {}",
                self.srid
            )),
            _ => Ok(self.geometry(decoded.shape)),
        }
    }
}

fn line_string<I>(coords: I) -> LineString<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    LineString(coords.into_iter().map(|(x, y)| Coord { x, y }).collect())
}

/// Chooses the geometry factory for an SRID.
///
/// The selector always knows the default [`srid::GEOGRAPHIC_SRIDS`]; additional geographic SRIDs
/// can be registered when it is built. It is passed explicitly to the codec and the SQL emitter
/// rather than living in a global, so separate connections (and tests) never observe each other's
/// configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactorySelector {
    extra_geographic: Arc<BTreeSet<u32>>,
}

impl FactorySelector {
    /// A selector using only the default geographic SRIDs.
    pub fn new() -> Self {
        Self::default()
    }

    /// A selector that also classifies `srids` as geographic.
    pub fn with_geographic_srids<I>(srids: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        Self {
            extra_geographic: Arc::new(
                srids
                    .into_iter()
                    .filter(|srid| !srid::is_geographic(*srid))
                    .collect(),
            ),
        }
    }

    pub fn is_geographic(&self, srid: u32) -> bool {
        srid::is_geographic(srid) || self.extra_geographic.contains(&srid)
    }

    pub fn coordinate_system(&self, srid: u32) -> CoordinateSystem {
        if self.is_geographic(srid) {
            CoordinateSystem::Geographic
        } else {
            CoordinateSystem::Projected
        }
    }

    /// The factory for `srid`: geographic when the SRID is classified geographic, projected
    /// otherwise.
    pub fn select(&self, srid: u32) -> GeometryFactory {
        let factory = match self.coordinate_system(srid) {
            CoordinateSystem::Geographic => GeometryFactory::geographic(srid),
            CoordinateSystem::Projected => GeometryFactory::projected(srid),
        };
        trace!(srid, system = ?factory.coordinate_system(), "Selected geometry factory");
        factory
    }
}
