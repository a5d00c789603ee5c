//! Join record between one local entity and one Salesforce record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Error;
use crate::sfid::Sfid;

/// Last operation applied through a mapped object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    PushCreate,
    PushUpdate,
    PushDelete,
    Pull,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::PushCreate => "push_create",
            SyncAction::PushUpdate => "push_update",
            SyncAction::PushDelete => "push_delete",
            SyncAction::Pull => "pull",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push_create" => Ok(SyncAction::PushCreate),
            "push_update" => Ok(SyncAction::PushUpdate),
            "push_delete" => Ok(SyncAction::PushDelete),
            "pull" => Ok(SyncAction::Pull),
            other => Err(Error::InvalidRequest(format!("Unknown sync action '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedObject {
    pub id: String,
    pub entity_type: String,
    pub local_id: String,
    pub mapping_id: String,
    pub sfid: Option<Sfid>,
    pub last_sync_action: Option<SyncAction>,
    pub last_sync_status: bool,
    pub last_sync_message: Option<String>,
    /// The local record's own modification time at the last sync.
    pub entity_updated_at: Option<DateTime<Utc>>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MappedObject {
    pub fn new(entity_type: &str, local_id: &str, mapping_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            entity_type: entity_type.to_string(),
            local_id: local_id.to_string(),
            mapping_id: mapping_id.to_string(),
            sfid: None,
            last_sync_action: None,
            last_sync_status: false,
            last_sync_message: None,
            entity_updated_at: None,
            last_sync_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_sfid(mut self, sfid: Sfid) -> Self {
        self.sfid = Some(sfid);
        self
    }

    /// Record a successful sync.
    pub fn mark_success(&mut self, action: SyncAction) {
        let now = Utc::now();
        self.last_sync_action = Some(action);
        self.last_sync_status = true;
        self.last_sync_message = None;
        self.last_sync_at = Some(now);
        self.updated_at = now;
    }

    /// Record a failed sync with the remote error message.
    pub fn mark_failure(&mut self, action: SyncAction, message: &str) {
        let now = Utc::now();
        self.last_sync_action = Some(action);
        self.last_sync_status = false;
        self.last_sync_message = Some(message.to_string());
        self.last_sync_at = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_keeps_sfid_and_records_message() {
        let sfid = Sfid::new("001A0000006Vm9r").unwrap();
        let mut mapped = MappedObject::new("node", "7", "account").with_sfid(sfid.clone());
        mapped.mark_success(SyncAction::PushCreate);
        assert!(mapped.last_sync_status);

        mapped.mark_failure(SyncAction::PushUpdate, "ENTITY_IS_DELETED");
        assert!(!mapped.last_sync_status);
        assert_eq!(mapped.sfid, Some(sfid));
        assert_eq!(mapped.last_sync_message.as_deref(), Some("ENTITY_IS_DELETED"));
    }

    #[test]
    fn sync_action_parses_its_own_names() {
        for action in [
            SyncAction::PushCreate,
            SyncAction::PushUpdate,
            SyncAction::PushDelete,
            SyncAction::Pull,
        ] {
            assert_eq!(action.as_str().parse::<SyncAction>().unwrap(), action);
        }
        assert!("push".parse::<SyncAction>().is_err());
    }
}
