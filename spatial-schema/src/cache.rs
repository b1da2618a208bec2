//! Per-connection cache of spatial column metadata, keyed by table.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use spatial_sql::SpatialColumnInfo;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::{SchemaResult, TableName};

/// Spatial columns of one table, by column name.
pub type SpatialColumns = HashMap<String, SpatialColumnInfo>;

/// A map from table to that table's spatial columns.
///
/// Entries are filled lazily. Loading an entry holds the write lock for the duration of the
/// metadata query, so concurrent lookups of a missing table issue one query between them and never
/// observe a partially written entry. Invalidation takes the same lock, so a lookup that starts
/// after an invalidation returns always sees fresh metadata.
#[derive(Debug, Default)]
pub struct SpatialColumnCache {
    tables: RwLock<HashMap<TableName, Arc<SpatialColumns>>>,
}

impl SpatialColumnCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached columns for `table`, without loading anything.
    pub async fn get(&self, table: &TableName) -> Option<Arc<SpatialColumns>> {
        self.tables.read().await.get(table).cloned()
    }

    /// The cached columns for `table`, calling `load` to fill the entry if it is missing.
    ///
    /// If `load` fails nothing is cached and the error is returned.
    pub async fn get_or_load<F, Fut>(
        &self,
        table: &TableName,
        load: F,
    ) -> SchemaResult<Arc<SpatialColumns>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SchemaResult<SpatialColumns>>,
    {
        if let Some(columns) = self.get(table).await {
            trace!(%table, "Spatial column cache hit");
            return Ok(columns);
        }

        let mut tables = self.tables.write().await;
        if let Some(columns) = tables.get(table) {
            return Ok(columns.clone());
        }
        debug!(%table, "Loading spatial column metadata");
        let columns = Arc::new(load().await?);
        tables.insert(table.clone(), columns.clone());
        Ok(columns)
    }

    pub async fn invalidate(&self, table: &TableName) {
        if self.tables.write().await.remove(table).is_some() {
            debug!(%table, "Invalidated spatial column metadata");
        }
    }

    pub async fn clear(&self) {
        self.tables.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::stream::FuturesUnordered;
    use futures::StreamExt;
    use mysql_spatial::GeometryKind;
    use pretty_assertions::assert_eq;
    use test_strategy::proptest;

    use super::*;
    use crate::SchemaError;

    fn columns(geo_type: GeometryKind, srid: u32) -> SpatialColumns {
        HashMap::from([(
            "location".to_owned(),
            SpatialColumnInfo {
                name: "location".into(),
                geo_type,
                srid,
            },
        )])
    }

    #[tokio::test]
    async fn loads_once_then_hits() {
        let cache = SpatialColumnCache::new();
        let loads = AtomicUsize::new(0);
        let table = TableName::new("places");
        for _ in 0..3 {
            let loaded = cache
                .get_or_load(&table, || async {
                    loads.fetch_add(1, Ordering::Relaxed);
                    Ok(columns(GeometryKind::Point, 4326))
                })
                .await
                .unwrap();
            assert_eq!(loaded["location"].srid, 4326);
        }
        assert_eq!(loads.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let cache = SpatialColumnCache::new();
        let table = TableName::new("places");
        cache
            .get_or_load(&table, || async { Ok(columns(GeometryKind::Point, 4326)) })
            .await
            .unwrap();

        cache.invalidate(&TableName::new("`places`")).await;
        assert!(cache.is_empty().await);

        let reloaded = cache
            .get_or_load(&table, || async {
                Ok(columns(GeometryKind::Polygon, 3857))
            })
            .await
            .unwrap();
        assert_eq!(reloaded["location"].geo_type, GeometryKind::Polygon);
    }

    #[tokio::test]
    async fn failed_loads_are_not_cached() {
        let cache = SpatialColumnCache::new();
        let table = TableName::new("places");
        let result = cache
            .get_or_load(&table, || async {
                Err(SchemaError::InvalidMetadata("boom".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.get(&table).await, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_loads_issue_one_query() {
        let cache = Arc::new(SpatialColumnCache::new());
        let loads = Arc::new(AtomicUsize::new(0));
        let mut tasks = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let loads = loads.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_load(&TableName::new("places"), || async move {
                            loads.fetch_add(1, Ordering::Relaxed);
                            tokio::task::yield_now().await;
                            Ok(columns(GeometryKind::Point, 4326))
                        })
                        .await
                        .unwrap();
                })
            })
            .collect::<FuturesUnordered<_>>();

        while let Some(res) = tasks.next().await {
            res.unwrap();
        }

        assert_eq!(loads.load(Ordering::Relaxed), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[proptest(async = "tokio")]
    async fn hits_regardless_of_key_representation(
        #[strategy("[a-z_][a-z0-9_]{0,20}")] name: String,
    ) {
        let cache = SpatialColumnCache::new();
        cache
            .get_or_load(&TableName::new(&name), || async {
                Ok(columns(GeometryKind::Point, 4326))
            })
            .await
            .unwrap();

        for raw in [format!("`{name}`"), format!(" {name} "), format!("\"{name}\"")] {
            let hit = cache
                .get_or_load(&TableName::new(&raw), || async {
                    Err(SchemaError::InvalidMetadata("unexpected load".into()))
                })
                .await;
            assert!(hit.is_ok(), "{raw:?} missed the cache");
        }
    }
}
