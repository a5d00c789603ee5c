//! Storage errors and their mapping onto the core error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Database connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Database writer is not running")]
    WriterClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be decoded into its domain type.
    #[error("Corrupt row in {table}: {message}")]
    Corrupt { table: &'static str, message: String },
}

impl StorageError {
    pub fn corrupt(table: &'static str, message: impl Into<String>) -> Self {
        Self::Corrupt {
            table,
            message: message.into(),
        }
    }
}

impl From<StorageError> for sfsync_core::Error {
    fn from(err: StorageError) -> Self {
        sfsync_core::Error::Storage(err.to_string())
    }
}
