//! Mapping configuration and its repository contract.

mod mapping_model;
mod mapping_traits;

pub use mapping_model::*;
pub use mapping_traits::*;
