use spatial_sql::SpatialSqlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    /// The database driver reported an error
    #[error("Database error: {0}")]
    Database(#[from] mysql_async::Error),

    /// The server returned column metadata in a shape we could not read
    #[error("Invalid column metadata: {0}")]
    InvalidMetadata(String),

    #[error(transparent)]
    Sql(#[from] SpatialSqlError),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

macro_rules! invalid_metadata {
    ($($format_args:tt)*) => {
        $crate::error::SchemaError::InvalidMetadata(format!($($format_args)*))
    };
}

pub(crate) use invalid_metadata;
