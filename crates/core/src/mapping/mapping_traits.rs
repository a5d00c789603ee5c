use async_trait::async_trait;

use super::mapping_model::{Mapping, PullState};
use crate::errors::Result;

/// Persistence for mapping configuration and per-mapping pull watermarks.
#[async_trait]
pub trait MappingRepositoryTrait: Send + Sync {
    /// All mappings ordered by weight, then id.
    fn list_mappings(&self) -> Result<Vec<Mapping>>;

    fn get_mapping(&self, mapping_id: &str) -> Result<Option<Mapping>>;

    /// Mappings whose local side is `(entity_type, bundle)`.
    fn mappings_for(&self, entity_type: &str, bundle: &str) -> Result<Vec<Mapping>> {
        Ok(self
            .list_mappings()?
            .into_iter()
            .filter(|m| m.matches(entity_type, bundle))
            .collect())
    }

    async fn save_mapping(&self, mapping: Mapping) -> Result<Mapping>;

    async fn delete_mapping(&self, mapping_id: &str) -> Result<usize>;

    fn get_pull_state(&self, mapping_id: &str) -> Result<Option<PullState>>;

    async fn save_pull_state(&self, state: PullState) -> Result<()>;
}
