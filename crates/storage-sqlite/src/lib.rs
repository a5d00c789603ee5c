//! SQLite persistence for the Salesforce sync engine.
//!
//! Reads go through an r2d2 pool. Writes are serialized through
//! [`db::WriteHandle`], one immediate transaction per call.

pub mod db;
pub mod errors;
pub mod mapped_objects;
pub mod mappings;
pub mod push_queue;
pub mod schema;

pub use db::{create_pool, get_connection, init, run_migrations, DbPool, WriteHandle};
pub use errors::StorageError;
pub use mapped_objects::MappedObjectRepository;
pub use mappings::MappingRepository;
pub use push_queue::PushQueueRepository;
