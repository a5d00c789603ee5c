mod model;
mod repository;

pub use model::MappedObjectDB;
pub use repository::MappedObjectRepository;
