use std::sync::Arc;

use spatial_sql::ddl::{is_spatial_type, SchemaChange};
use spatial_sql::{ColumnDescriptor, SpatialColumnInfo, SqlEmitter};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{SpatialColumnCache, SpatialColumns};
use crate::{SchemaConnection, SchemaResult, TableName};

/// Spatial schema operations over one connection.
///
/// Schema changes made through [`apply`](Self::apply) invalidate the cached spatial metadata of
/// every table they touch, so column lookups never return metadata from before a change.
pub struct SpatialSchema<C> {
    connection: Mutex<C>,
    cache: SpatialColumnCache,
    emitter: SqlEmitter,
}

impl<C> SpatialSchema<C>
where
    C: SchemaConnection,
{
    pub fn new(connection: C, emitter: SqlEmitter) -> Self {
        Self {
            connection: Mutex::new(connection),
            cache: SpatialColumnCache::new(),
            emitter,
        }
    }

    pub fn emitter(&self) -> &SqlEmitter {
        &self.emitter
    }

    pub fn cache(&self) -> &SpatialColumnCache {
        &self.cache
    }

    pub fn into_connection(self) -> C {
        self.connection.into_inner()
    }

    /// Run the statements for `change`, then invalidate the tables it affects.
    ///
    /// Tables are invalidated even if a statement fails, since an earlier statement may already
    /// have changed them.
    pub async fn apply(&self, change: &SchemaChange) -> SchemaResult<()> {
        if !self.emitter.capabilities().supports_spatial {
            warn!("The server does not report spatial support; sending DDL anyway");
        }
        let result = {
            let mut connection = self.connection.lock().await;
            let mut result = Ok(());
            for statement in change.statements(&self.emitter) {
                result = connection.execute(&statement).await;
                if result.is_err() {
                    break;
                }
            }
            result
        };

        for table in change.affected_tables() {
            self.cache.invalidate(&table).await;
        }
        result
    }

    /// Spatial columns of `table`, by column name.
    pub async fn spatial_columns(
        &self,
        table: impl Into<TableName>,
    ) -> SchemaResult<Arc<SpatialColumns>> {
        let table = table.into();
        self.cache
            .get_or_load(&table, || async {
                let columns = self.connection.lock().await.spatial_columns(&table).await?;
                Ok(columns
                    .into_iter()
                    .map(|info| (info.name.clone(), info))
                    .collect())
            })
            .await
    }

    /// Spatial metadata for one column, if it is a spatial column.
    pub async fn spatial_column(
        &self,
        table: impl Into<TableName>,
        column: &str,
    ) -> SchemaResult<Option<SpatialColumnInfo>> {
        Ok(self.spatial_columns(table).await?.get(column).cloned())
    }

    /// Describe every column of `table`.
    ///
    /// Spatial metadata is only looked up when the table has at least one geometry column.
    pub async fn columns(&self, table: impl Into<TableName>) -> SchemaResult<Vec<ColumnDescriptor>> {
        let table = table.into();
        let fields = self.connection.lock().await.column_fields(&table).await?;

        let spatial = if fields.iter().any(|f| is_spatial_type(&f.sql_type)) {
            Some(self.spatial_columns(&table).await?)
        } else {
            None
        };

        Ok(fields
            .into_iter()
            .map(|field| {
                let info = spatial.as_ref().and_then(|s| s.get(&field.name));
                if info.is_none() && is_spatial_type(&field.sql_type) {
                    debug!(%table, column = %field.name, "No spatial metadata; using declared type");
                }
                ColumnDescriptor::from_field(field, info)
            })
            .collect())
    }

    pub async fn invalidate(&self, table: impl Into<TableName>) {
        self.cache.invalidate(&table.into()).await;
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}
