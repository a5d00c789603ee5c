mod model;
mod repository;

pub use model::{MappingDB, PullStateDB};
pub use repository::MappingRepository;
