use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{invalid_version, unsupported_feature, SpatialSqlError, SpatialSqlResult};

/// Which server family a version string came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerFlavor {
    MySql,
    MariaDb,
}

/// A server version, as reported by `SELECT VERSION()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerVersion {
    pub flavor: ServerFlavor,
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl ServerVersion {
    pub const fn mysql(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            flavor: ServerFlavor::MySql,
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string such as `8.0.34`, `8.0.23-rds.20240529-log`, `10.6.12-MariaDB-log`
    /// or the replication-compatible `5.5.5-10.6.12-MariaDB-log`.
    pub fn parse(version: &str) -> SpatialSqlResult<Self> {
        let trimmed = version.trim();
        let flavor = if trimmed.to_ascii_lowercase().contains("mariadb") {
            ServerFlavor::MariaDb
        } else {
            ServerFlavor::MySql
        };
        let numbers = match flavor {
            ServerFlavor::MariaDb => trimmed.strip_prefix("5.5.5-").unwrap_or(trimmed),
            ServerFlavor::MySql => trimmed,
        };
        let numbers = numbers.split('-').next().unwrap_or_default();

        let mut parts = numbers.split('.').map(|part| {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u16>().ok()
        });
        let (Some(Some(major)), Some(Some(minor))) = (parts.next(), parts.next()) else {
            return invalid_version!("{trimmed}");
        };
        let patch = parts.next().flatten().unwrap_or(0);

        Ok(Self {
            flavor,
            major,
            minor,
            patch,
        })
    }

    pub fn is_mariadb(&self) -> bool {
        self.flavor == ServerFlavor::MariaDb
    }

    /// Is this a MySQL (not MariaDB) server at or above `major.minor.patch`?
    pub fn mysql_at_least(&self, major: u16, minor: u16, patch: u16) -> bool {
        !self.is_mariadb() && (self.major, self.minor, self.patch) >= (major, minor, patch)
    }
}

impl FromStr for ServerVersion {
    type Err = SpatialSqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.is_mariadb() {
            write!(f, "-MariaDB")?;
        }
        Ok(())
    }
}

/// Spatial features of the target server, resolved once when a connection is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCapabilities {
    /// Spatial types, functions and indexes as used by this crate (MySQL 5.7.6+)
    pub supports_spatial: bool,
    /// `ST_GeomFromText` accepts an `axis-order` option (MySQL 8.0.1+)
    pub supports_axis_order: bool,
    /// `ST_GeomFromWKB` accepts an `axis-order` option (MySQL 8.0.1+)
    pub supports_wkb_axis_order: bool,
    /// Column definitions accept a `SRID n` attribute (MySQL 8.0.3+)
    pub supports_srid_attribute: bool,
}

impl Default for EngineCapabilities {
    /// A MySQL 8 server, with geographic literals sent through the text constructor.
    fn default() -> Self {
        Self {
            supports_spatial: true,
            supports_axis_order: true,
            supports_wkb_axis_order: false,
            supports_srid_attribute: true,
        }
    }
}

impl EngineCapabilities {
    pub fn for_version(version: &ServerVersion) -> Self {
        let capabilities = Self {
            supports_spatial: version.mysql_at_least(5, 7, 6),
            supports_axis_order: version.mysql_at_least(8, 0, 1),
            supports_wkb_axis_order: version.mysql_at_least(8, 0, 1),
            supports_srid_attribute: version.mysql_at_least(8, 0, 3),
        };
        debug!(%version, ?capabilities, "Resolved spatial capabilities");
        capabilities
    }

    /// Override whether the WKB constructor is given the axis-order hint.
    ///
    /// Turning the hint off always succeeds. Turning it on fails for servers without axis-order
    /// support, so the problem is reported once here instead of on every emitted value.
    pub fn with_wkb_axis_order(self, enabled: bool) -> SpatialSqlResult<Self> {
        if enabled && !self.supports_axis_order {
            return unsupported_feature!(
                "the WKB axis-order hint requires MySQL 8.0.1 or later"
            );
        }
        Ok(Self {
            supports_wkb_axis_order: enabled,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_mysql_versions() {
        assert_eq!(
            ServerVersion::parse("8.0.34").unwrap(),
            ServerVersion::mysql(8, 0, 34)
        );
        assert_eq!(
            ServerVersion::parse("8.0.23-0ubuntu0.18.04.1").unwrap(),
            ServerVersion::mysql(8, 0, 23)
        );
        assert_eq!(
            ServerVersion::parse("8.0.23-rds.20240529-log").unwrap(),
            ServerVersion::mysql(8, 0, 23)
        );
        assert_eq!(
            "5.7".parse::<ServerVersion>().unwrap(),
            ServerVersion::mysql(5, 7, 0)
        );
    }

    #[test]
    fn parse_mariadb_versions() {
        for raw in ["10.6.12-MariaDB-log", "5.5.5-10.6.12-MariaDB-log"] {
            let version = ServerVersion::parse(raw).unwrap();
            assert_eq!(version.flavor, ServerFlavor::MariaDb);
            assert_eq!((version.major, version.minor, version.patch), (10, 6, 12));
        }
        assert_eq!(
            ServerVersion::parse("10.1.26-MariaDB-0+deb9u1")
                .unwrap()
                .to_string(),
            "10.1.26-MariaDB"
        );
    }

    #[test]
    fn parse_garbage() {
        assert!(matches!(
            ServerVersion::parse("banana"),
            Err(SpatialSqlError::InvalidVersion(_))
        ));
        assert!(ServerVersion::parse("8").is_err());
        assert!(ServerVersion::parse("").is_err());
    }

    #[test]
    fn version_gates() {
        let old = EngineCapabilities::for_version(&ServerVersion::mysql(5, 7, 5));
        assert!(!old.supports_spatial);

        let five_seven = EngineCapabilities::for_version(&ServerVersion::mysql(5, 7, 6));
        assert!(five_seven.supports_spatial);
        assert!(!five_seven.supports_axis_order);
        assert!(!five_seven.supports_wkb_axis_order);
        assert!(!five_seven.supports_srid_attribute);

        let eight_one = EngineCapabilities::for_version(&ServerVersion::mysql(8, 0, 1));
        assert!(eight_one.supports_axis_order);
        assert!(eight_one.supports_wkb_axis_order);
        assert!(!eight_one.supports_srid_attribute);

        let eight = EngineCapabilities::for_version(&ServerVersion::mysql(8, 0, 34));
        assert!(eight.supports_srid_attribute);
    }

    #[test]
    fn mariadb_has_no_spatial_support() {
        let version = ServerVersion::parse("10.11.2-MariaDB").unwrap();
        let caps = EngineCapabilities::for_version(&version);
        assert_eq!(
            caps,
            EngineCapabilities {
                supports_spatial: false,
                supports_axis_order: false,
                supports_wkb_axis_order: false,
                supports_srid_attribute: false,
            }
        );
    }

    #[test]
    fn wkb_axis_order_override() {
        let caps = EngineCapabilities::default();
        assert!(caps.with_wkb_axis_order(true).unwrap().supports_wkb_axis_order);

        let eight = EngineCapabilities::for_version(&ServerVersion::mysql(8, 0, 34));
        assert!(!eight.with_wkb_axis_order(false).unwrap().supports_wkb_axis_order);

        let old = EngineCapabilities::for_version(&ServerVersion::mysql(5, 7, 30));
        assert!(matches!(
            old.with_wkb_axis_order(true),
            Err(SpatialSqlError::UnsupportedFeature(_))
        ));
        assert_eq!(old.with_wkb_axis_order(false).unwrap(), old);
    }
}
