use async_trait::async_trait;

use super::local_model::{LocalFieldDefinition, LocalRecord};
use crate::errors::Result;

/// The host entity store the engine reads from and writes to.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn load(&self, entity_type: &str, id: &str) -> Result<Option<LocalRecord>>;

    /// Blank, unsaved record used when a pull creates a local entity.
    fn new_record(&self, entity_type: &str, bundle: &str) -> LocalRecord {
        LocalRecord::new(entity_type, bundle)
    }

    /// Persist the record, assigning an id to new ones. Returns the id.
    async fn save(&self, record: &mut LocalRecord) -> Result<String>;

    async fn delete(&self, record: &LocalRecord) -> Result<()>;

    /// Field definition for a selector, when the store knows it.
    fn field_definition(
        &self,
        entity_type: &str,
        bundle: &str,
        selector: &str,
    ) -> Option<LocalFieldDefinition>;

    /// Display name of a taxonomy term.
    async fn term_name(&self, vocabulary: &str, term_id: &str) -> Result<Option<String>>;

    /// Id of the term named `name`, created if it does not exist yet.
    async fn find_or_create_term(&self, vocabulary: &str, name: &str) -> Result<String>;
}
