mod model;
mod repository;

pub use model::PushQueueItemDB;
pub use repository::PushQueueRepository;
