//! Local entity store contract.

mod local_model;
mod local_traits;

pub use local_model::*;
pub use local_traits::*;
