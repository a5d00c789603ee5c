//! Durable push queue with lease-based claims.

mod push_queue_service;
mod queue_model;
mod queue_traits;

pub use push_queue_service::*;
pub use queue_model::*;
pub use queue_traits::*;
