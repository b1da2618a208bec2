use clap::Parser;
use mysql_spatial::{FactorySelector, GeometryCodec};
use serde::{Deserialize, Serialize};

use crate::{EngineCapabilities, ServerVersion, SpatialSqlResult, SqlEmitter};

/// Configuration for spatial SQL generation, usable both as command line arguments and as a
/// serialized configuration section.
#[derive(Debug, Clone, Default, Parser, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialOptions {
    /// Version string of the target server, as returned by `SELECT VERSION()`. When unset, a
    /// MySQL 8 server is assumed.
    #[clap(long, env = "SERVER_VERSION")]
    #[serde(default)]
    pub server_version: Option<String>,

    /// Force the axis-order hint on or off for geographic values sent as WKB. Enabling it for a
    /// server that does not support axis-order hints is an error.
    #[clap(long, env = "WKB_AXIS_ORDER")]
    #[serde(default)]
    pub wkb_axis_order: Option<bool>,

    /// Additional SRIDs to treat as geographic, on top of 4326, 4269, 4267, 4258 and 4019.
    #[clap(
        long = "geographic-srid",
        env = "GEOGRAPHIC_SRIDS",
        value_delimiter = ','
    )]
    #[serde(default)]
    pub geographic_srids: Vec<u32>,
}

impl SpatialOptions {
    pub fn capabilities(&self) -> SpatialSqlResult<EngineCapabilities> {
        let capabilities = match &self.server_version {
            Some(version) => EngineCapabilities::for_version(&ServerVersion::parse(version)?),
            None => EngineCapabilities::default(),
        };
        match self.wkb_axis_order {
            Some(enabled) => capabilities.with_wkb_axis_order(enabled),
            None => Ok(capabilities),
        }
    }

    pub fn selector(&self) -> FactorySelector {
        FactorySelector::with_geographic_srids(self.geographic_srids.iter().copied())
    }

    pub fn emitter(&self) -> SpatialSqlResult<SqlEmitter> {
        Ok(SqlEmitter::new(
            GeometryCodec::new(self.selector()),
            self.capabilities()?,
        ))
    }
}
