//! Spatial column metadata for MySQL tables.
//!
//! [`SpatialSchema`] wraps a [`SchemaConnection`] and answers "what are the columns of this table,
//! and which of them are geometries of which type and SRID?". Spatial metadata is read from
//! `INFORMATION_SCHEMA.ST_GEOMETRY_COLUMNS` once per table and kept in a [`SpatialColumnCache`]
//! until a schema change made through [`SpatialSchema::apply`] touches that table.

mod adapter;
pub mod cache;
pub mod connection;
mod error;

pub use adapter::SpatialSchema;
pub use cache::{SpatialColumnCache, SpatialColumns};
pub use connection::{MySqlConnection, SchemaConnection};
pub use error::{SchemaError, SchemaResult};
pub use spatial_sql::TableName;
