use async_trait::async_trait;
use mysql_async::prelude::{FromValue, Queryable};
use mysql_async::{Conn, Opts, Row};
use mysql_spatial::GeometryKind;
use spatial_sql::{FieldRow, SpatialColumnInfo};
use tracing::{debug, info_span, Instrument};

use crate::error::invalid_metadata;
use crate::{SchemaResult, TableName};

/// Spatial column metadata for one table, from `ST_GEOMETRY_COLUMNS`.
///
/// The table's schema defaults to the connection's current database.
pub const SPATIAL_COLUMNS_QUERY: &str = "SELECT \
     gc.COLUMN_NAME AS column_name, \
     gc.SRS_ID AS srs_id, \
     gc.GEOMETRY_TYPE_NAME AS geometry_type, \
     c.COLUMN_TYPE AS column_type \
     FROM INFORMATION_SCHEMA.ST_GEOMETRY_COLUMNS gc \
     JOIN INFORMATION_SCHEMA.COLUMNS c \
     ON gc.TABLE_SCHEMA = c.TABLE_SCHEMA \
     AND gc.TABLE_NAME = c.TABLE_NAME \
     AND gc.COLUMN_NAME = c.COLUMN_NAME \
     WHERE gc.TABLE_SCHEMA = COALESCE(?, DATABASE()) \
     AND gc.TABLE_NAME = ?";

/// What the spatial schema layer needs from a database connection.
#[async_trait]
pub trait SchemaConnection: Send {
    /// Run a statement that returns no rows.
    async fn execute(&mut self, sql: &str) -> SchemaResult<()>;

    /// Every spatial column of `table`, with its geometry type and SRID.
    async fn spatial_columns(&mut self, table: &TableName) -> SchemaResult<Vec<SpatialColumnInfo>>;

    /// Field rows for every column of `table`, in table order.
    async fn column_fields(&mut self, table: &TableName) -> SchemaResult<Vec<FieldRow>>;
}

/// Interpret the type of a geometry column as reported by the server.
///
/// `COLUMN_TYPE` is the declared type (`point`); MySQL spells the collection type name
/// `geomcollection` in `GEOMETRY_TYPE_NAME`, so that is only used as a fallback.
pub fn geometry_kind(column_type: &str, geometry_type: Option<&str>) -> GeometryKind {
    column_type
        .parse()
        .ok()
        .or_else(|| {
            geometry_type.and_then(|name| match name.to_ascii_lowercase().as_str() {
                "geomcollection" => Some(GeometryKind::GeometryCollection),
                other => other.parse().ok(),
            })
        })
        .unwrap_or_else(|| {
            debug!(column_type, ?geometry_type, "Unrecognized geometry type; using geometry");
            GeometryKind::Geometry
        })
}

fn column<T: FromValue>(row: &Row, name: &str) -> SchemaResult<T> {
    match row.get_opt::<T, _>(name) {
        Some(Ok(value)) => Ok(value),
        Some(Err(error)) => Err(invalid_metadata!("column `{name}`: {error:?}")),
        None => Err(invalid_metadata!("missing column `{name}`")),
    }
}

/// A [`SchemaConnection`] to a live MySQL server.
pub struct MySqlConnection {
    conn: Conn,
}

impl MySqlConnection {
    pub fn new(conn: Conn) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> SchemaResult<Self> {
        let opts = Opts::from_url(url).map_err(mysql_async::Error::from)?;
        let span = info_span!("Connecting to MySQL", host = %opts.ip_or_hostname());
        let conn = Conn::new(opts).instrument(span).await?;
        Ok(Self { conn })
    }

    /// The server's version string, as `SELECT VERSION()` reports it.
    pub async fn server_version(&mut self) -> SchemaResult<String> {
        self.conn
            .query_first::<String, _>("SELECT VERSION()")
            .await?
            .ok_or_else(|| invalid_metadata!("server did not report a version"))
    }

    pub async fn disconnect(self) -> SchemaResult<()> {
        Ok(self.conn.disconnect().await?)
    }
}

#[async_trait]
impl SchemaConnection for MySqlConnection {
    async fn execute(&mut self, sql: &str) -> SchemaResult<()> {
        debug!(%sql, "Executing schema change");
        Ok(self.conn.query_drop(sql).await?)
    }

    async fn spatial_columns(&mut self, table: &TableName) -> SchemaResult<Vec<SpatialColumnInfo>> {
        let rows: Vec<Row> = self
            .conn
            .exec(SPATIAL_COLUMNS_QUERY, (table.schema(), table.name()))
            .await?;
        rows.iter()
            .map(|row| {
                let column_type: String = column(row, "column_type")?;
                let geometry_type: Option<String> = column(row, "geometry_type")?;
                Ok(SpatialColumnInfo {
                    name: column(row, "column_name")?,
                    geo_type: geometry_kind(&column_type, geometry_type.as_deref()),
                    srid: column::<Option<u32>>(row, "srs_id")?.unwrap_or(0),
                })
            })
            .collect()
    }

    async fn column_fields(&mut self, table: &TableName) -> SchemaResult<Vec<FieldRow>> {
        let rows: Vec<Row> = self
            .conn
            .query(format!("SHOW FULL FIELDS FROM {}", table.quoted()))
            .await?;
        rows.iter()
            .map(|row| {
                let null: String = column(row, "Null")?;
                Ok(FieldRow {
                    name: column(row, "Field")?,
                    sql_type: column(row, "Type")?,
                    null: null.eq_ignore_ascii_case("yes"),
                    default: column(row, "Default")?,
                    collation: column(row, "Collation")?,
                    comment: column::<Option<String>>(row, "Comment")?.filter(|c| !c.is_empty()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn geometry_kinds() {
        assert_eq!(geometry_kind("point", Some("POINT")), GeometryKind::Point);
        assert_eq!(
            geometry_kind("geomcollection", Some("GEOMCOLLECTION")),
            GeometryKind::GeometryCollection
        );
        assert_eq!(
            geometry_kind("geometrycollection", None),
            GeometryKind::GeometryCollection
        );
        assert_eq!(geometry_kind("blob", Some("TIN")), GeometryKind::Geometry);
    }

    #[test]
    fn spatial_query_is_parameterized() {
        assert_eq!(SPATIAL_COLUMNS_QUERY.matches('?').count(), 2);
        assert!(SPATIAL_COLUMNS_QUERY.contains("INFORMATION_SCHEMA.ST_GEOMETRY_COLUMNS gc JOIN"));
    }
}
