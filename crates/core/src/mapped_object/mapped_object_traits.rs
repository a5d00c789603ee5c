use async_trait::async_trait;

use super::mapped_object_model::MappedObject;
use crate::errors::Result;
use crate::sfid::Sfid;

/// Persistence for mapped objects. `(entity_type, local_id, mapping_id)` is unique.
#[async_trait]
pub trait MappedObjectRepositoryTrait: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<MappedObject>>;

    fn find_by_local(
        &self,
        entity_type: &str,
        local_id: &str,
        mapping_id: &str,
    ) -> Result<Option<MappedObject>>;

    /// Every mapped object pointing at `sfid`, across mappings.
    fn find_by_sfid(&self, sfid: &Sfid) -> Result<Vec<MappedObject>>;

    fn find_all_for_local(&self, entity_type: &str, local_id: &str) -> Result<Vec<MappedObject>>;

    /// Insert or update, keyed on the unique local triple.
    async fn save(&self, mapped: MappedObject) -> Result<MappedObject>;

    async fn delete(&self, id: &str) -> Result<usize>;

    async fn delete_for_local(&self, entity_type: &str, local_id: &str) -> Result<usize>;
}
