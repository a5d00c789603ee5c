//! Push/pull synchronization between the local store and Salesforce.

mod pull_batch;
mod retry;
mod sync_engine;

pub use pull_batch::PullBatchSummary;
pub use retry::*;
pub use sync_engine::*;

#[cfg(test)]
mod tests;
