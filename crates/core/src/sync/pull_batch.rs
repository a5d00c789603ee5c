//! Scheduled pull: incremental record pulls and remote deletions per mapping.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use super::sync_engine::{PullOutcome, SyncEngine};
use crate::errors::Result;
use crate::events::SyncEvent;
use crate::mapping::{Mapping, PullState};
use crate::remote::RemoteRecord;
use crate::soql::SoqlStatement;

/// Deletion windows shorter than this are not worth a request.
const MIN_DELETE_WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullBatchSummary {
    pub mappings: usize,
    pub pulled: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub failed: usize,
}

enum RecordOutcome {
    Created,
    Updated,
    Skipped,
}

/// How far the pull watermark may move.
///
/// A trigger date is committed only once a later date has been seen and every
/// record carrying it was applied. After the first failure nothing more is
/// committed, so the next run resumes at the failed record.
struct Watermark {
    start: Option<DateTime<Utc>>,
    committed: Option<DateTime<Utc>>,
    open: Option<DateTime<Utc>>,
    stopped: bool,
}

impl Watermark {
    fn new(start: Option<DateTime<Utc>>) -> Self {
        Self {
            start,
            committed: start,
            open: None,
            stopped: false,
        }
    }

    /// Called before a record is processed.
    fn observe(&mut self, date: Option<DateTime<Utc>>) {
        if self.stopped {
            return;
        }
        if let (Some(open), Some(date)) = (self.open, date) {
            if date > open {
                self.committed = Some(open);
                self.open = None;
            }
        }
    }

    fn applied(&mut self, date: Option<DateTime<Utc>>) {
        if !self.stopped && date.is_some() {
            self.open = date;
        }
    }

    fn failed(&mut self) {
        self.stopped = true;
        self.open = None;
    }

    /// Records were applied but no date could be committed.
    fn stalled(&self) -> bool {
        !self.stopped && self.open.is_some() && self.committed == self.start
    }

    /// Final watermark. The last open date is kept only when the run read
    /// everything the query matched.
    fn finish(self, truncated: bool) -> Option<DateTime<Utc>> {
        match self.open {
            Some(open) if !self.stopped && !truncated => Some(open),
            _ => self.committed,
        }
    }
}

impl SyncEngine {
    /// Pull every mapping that has a pull trigger.
    ///
    /// The watermark only moves past trigger dates whose records were all
    /// applied, and never past the first failure. Auth failures abort the
    /// whole batch.
    pub async fn run_pull_batch(&self) -> Result<PullBatchSummary> {
        let mut summary = PullBatchSummary::default();

        for mapping in self.mappings.list_mappings()? {
            if !mapping.sync_triggers.has_pull() {
                continue;
            }
            summary.mappings += 1;
            let mut state = self
                .mappings
                .get_pull_state(&mapping.id)?
                .unwrap_or_else(|| PullState::new(&mapping.id));

            if mapping.sync_triggers.pull_create || mapping.sync_triggers.pull_update {
                match self.pull_records(&mapping, &mut state, &mut summary).await {
                    Ok(()) => {}
                    Err(err) if err.is_auth_failure() => {
                        self.mappings.save_pull_state(state).await?;
                        return Err(err);
                    }
                    Err(err) => {
                        warn!("[SfPull] Pull of mapping {} stopped: {}", mapping.id, err);
                        self.report(
                            SyncEvent::error("Pull of mapping {mapping} stopped: {message}")
                                .with("mapping", &mapping.id)
                                .with("message", &err),
                        );
                        summary.failed += 1;
                    }
                }
            }

            if mapping.sync_triggers.pull_delete {
                match self.pull_deletions(&mapping, &mut state, &mut summary).await {
                    Ok(()) => {}
                    Err(err) if err.is_auth_failure() => {
                        self.mappings.save_pull_state(state).await?;
                        return Err(err);
                    }
                    Err(err) => {
                        warn!(
                            "[SfPull] Deletion check of mapping {} failed: {}",
                            mapping.id, err
                        );
                        summary.failed += 1;
                    }
                }
            }

            state.updated_at = Utc::now();
            self.mappings.save_pull_state(state).await?;
        }

        info!(
            "[SfPull] Batch done: {} mappings, {} pulled ({} created, {} updated, {} skipped), {} deleted, {} failed",
            summary.mappings,
            summary.pulled,
            summary.created,
            summary.updated,
            summary.skipped,
            summary.deleted,
            summary.failed
        );
        Ok(summary)
    }

    async fn pull_records(
        &self,
        mapping: &Mapping,
        state: &mut PullState,
        summary: &mut PullBatchSummary,
    ) -> Result<()> {
        let query = self.build_pull_query(mapping, state.last_pull_at)?;
        debug!("[SfPull] {}", query.soql());
        let mut page = self.remote.query(&query).await?;
        let mut watermark = Watermark::new(state.last_pull_at);
        let mut fetched = 0usize;

        let result = 'pages: loop {
            for remote in std::mem::take(&mut page.records) {
                fetched += 1;
                let trigger_date = remote.get_datetime(&mapping.pull_trigger_date);
                watermark.observe(trigger_date);
                match self.process_pulled_record(mapping, remote, trigger_date).await {
                    Ok(outcome) => {
                        summary.pulled += 1;
                        match outcome {
                            RecordOutcome::Created => summary.created += 1,
                            RecordOutcome::Updated => summary.updated += 1,
                            RecordOutcome::Skipped => summary.skipped += 1,
                        }
                        watermark.applied(trigger_date);
                    }
                    Err(err) if err.is_auth_failure() => break 'pages Err(err),
                    Err(err) => {
                        summary.failed += 1;
                        watermark.failed();
                        self.report(
                            SyncEvent::error("Pull into mapping {mapping} failed: {message}")
                                .with("mapping", &mapping.id)
                                .with("message", &err),
                        );
                    }
                }
            }
            let truncated = fetched >= self.settings.pull_max_records;
            if truncated || !page.has_more() {
                break Ok(truncated);
            }
            let Some(next_url) = page.next_records_url.take() else {
                break Ok(true);
            };
            match self.remote.query_more(&next_url).await {
                Ok(next) => page = next,
                Err(err) => break Err(err),
            }
        };

        let truncated = !matches!(result, Ok(false));
        if truncated && watermark.stalled() {
            warn!(
                "[SfPull] Mapping {} has more than {} records at one {}; raise the pull limit",
                mapping.id, self.settings.pull_max_records, mapping.pull_trigger_date
            );
        }
        state.last_pull_at = watermark.finish(truncated);
        result.map(|_| ())
    }

    async fn process_pulled_record(
        &self,
        mapping: &Mapping,
        remote: RemoteRecord,
        trigger_date: Option<DateTime<Utc>>,
    ) -> Result<RecordOutcome> {
        let Some(sfid) = remote.id() else {
            warn!("[SfPull] {} record without Id skipped", mapping.salesforce_object);
            return Ok(RecordOutcome::Skipped);
        };
        let mapped = self
            .mapped_objects
            .find_by_sfid(&sfid)?
            .into_iter()
            .find(|m| m.mapping_id == mapping.id);

        let (record, created) = match mapped {
            Some(mapped) => {
                if !mapping.sync_triggers.pull_update {
                    return Ok(RecordOutcome::Skipped);
                }
                if let (true, Some(last_sync), Some(changed)) =
                    (mapped.last_sync_status, mapped.last_sync_at, trigger_date)
                {
                    if last_sync >= changed {
                        debug!("[SfPull] {} is already current", sfid);
                        return Ok(RecordOutcome::Skipped);
                    }
                }
                match self
                    .local_store
                    .load(&mapped.entity_type, &mapped.local_id)
                    .await?
                {
                    Some(record) => (record, false),
                    None => {
                        self.report(
                            SyncEvent::warning(
                                "{sfid} is mapped to {entity_type} {local_id}, which no longer exists",
                            )
                            .with("sfid", &sfid)
                            .with("entity_type", &mapped.entity_type)
                            .with("local_id", &mapped.local_id),
                        );
                        return Ok(RecordOutcome::Skipped);
                    }
                }
            }
            None => {
                if !mapping.sync_triggers.pull_create {
                    return Ok(RecordOutcome::Skipped);
                }
                let record = self
                    .local_store
                    .new_record(&mapping.local_entity_type, &mapping.local_bundle);
                (record, true)
            }
        };

        match self.pull(record, mapping, Some(remote)).await? {
            PullOutcome::Applied { .. } if created => Ok(RecordOutcome::Created),
            PullOutcome::Applied { .. } => Ok(RecordOutcome::Updated),
            PullOutcome::NoRemoteRecord => Ok(RecordOutcome::Skipped),
        }
    }

    async fn pull_deletions(
        &self,
        mapping: &Mapping,
        state: &mut PullState,
        summary: &mut PullBatchSummary,
    ) -> Result<()> {
        let now = Utc::now();
        let oldest = now - Duration::days(self.settings.pull_delete_window_days);
        let start = match state.last_delete_check_at {
            Some(last) if last > oldest => last,
            _ => oldest,
        };
        if (now - start).num_seconds() < MIN_DELETE_WINDOW_SECS {
            return Ok(());
        }

        let deleted = self
            .remote
            .get_deleted(&mapping.salesforce_object, start, now)
            .await?;

        for record in deleted.deleted_records {
            for mapped in self.mapped_objects.find_by_sfid(&record.id)? {
                if mapped.mapping_id != mapping.id {
                    continue;
                }
                self.mapped_objects.delete(&mapped.id).await?;
                if let Some(local) = self
                    .local_store
                    .load(&mapped.entity_type, &mapped.local_id)
                    .await?
                {
                    self.local_store.delete(&local).await?;
                }
                info!(
                    "[SfPull] {} {} deleted after remote delete of {}",
                    mapped.entity_type, mapped.local_id, record.id
                );
                summary.deleted += 1;
            }
        }

        state.last_delete_check_at = Some(now);
        Ok(())
    }
}
