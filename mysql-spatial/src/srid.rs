//! Classification of spatial reference system identifiers.
//!
//! MySQL 8 treats geographic spatial reference systems (ellipsoidal latitude/longitude) very
//! differently from projected ones: their SRS-defined axis order is latitude-longitude, while
//! everything in this crate (and in WKT/WKB as produced by most tooling) is longitude-latitude.
//! Knowing which SRIDs are geographic is what decides whether an `axis-order` hint is needed when
//! a value is sent to the server.

use serde::{Deserialize, Serialize};

/// The "no SRID specified" value. MySQL treats it as an infinite flat Cartesian plane.
pub const DEFAULT_SRID: u32 = 0;

/// SRIDs that are always classified as geographic.
pub const GEOGRAPHIC_SRIDS: [u32; 5] = [
    // WGS 84 (GPS)
    4326,
    // NAD83
    4269,
    // NAD27
    4267,
    // ETRS89
    4258,
    // Unknown datum based upon the GRS 1980 ellipsoid
    4019,
];

/// Is `srid` one of the default [`GEOGRAPHIC_SRIDS`]?
pub fn is_geographic(srid: u32) -> bool {
    GEOGRAPHIC_SRIDS.contains(&srid)
}

/// The kind of coordinate reference system an SRID names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSystem {
    /// Ellipsoidal longitude/latitude, where axis order matters
    Geographic,
    /// Flat Cartesian plane (including SRID 0)
    Projected,
}

impl CoordinateSystem {
    pub fn is_geographic(self) -> bool {
        matches!(self, Self::Geographic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geographic_set() {
        for srid in [4326, 4269, 4267, 4258, 4019] {
            assert!(is_geographic(srid), "{srid} should be geographic");
        }
    }

    #[test]
    fn projected_srids() {
        for srid in [0, 3857, 2000, 27700] {
            assert!(!is_geographic(srid), "{srid} should be projected");
        }
    }

    #[test_strategy::proptest]
    fn classification_is_stable(srid: u32) {
        let first = is_geographic(srid);
        for _ in 0..4 {
            assert_eq!(is_geographic(srid), first);
        }
        assert_eq!(first, GEOGRAPHIC_SRIDS.contains(&srid));
    }
}
