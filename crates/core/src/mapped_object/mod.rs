//! Local/remote correlation records.

mod mapped_object_model;
mod mapped_object_traits;

pub use mapped_object_model::*;
pub use mapped_object_traits::*;
