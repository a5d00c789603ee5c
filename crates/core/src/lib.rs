//! Salesforce synchronization core.
//!
//! Field mapping, SOQL building, the push/pull engine and the push queue.
//! Remote access, the host entity store and persistence are injected
//! through the traits in [`remote`], [`local`], [`mapping`],
//! [`mapped_object`] and [`queue`].

pub mod errors;
pub mod events;
pub mod fields;
pub mod local;
pub mod mapped_object;
pub mod mapping;
pub mod queue;
pub mod remote;
pub mod secrets;
pub mod settings;
pub mod sfid;
pub mod soql;
pub mod sync;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{Error, Result};
pub use sfid::Sfid;
