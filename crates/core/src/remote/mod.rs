//! Remote (Salesforce) data model and API contract.

mod remote_model;
mod remote_traits;

pub use remote_model::*;
pub use remote_traits::*;
