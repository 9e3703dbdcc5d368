//! In-memory store backends.
//!
//! Used for single-instance deployments and throughout the test suites.
//! Atomicity comes from `DashMap` shard locks: `consume` is a single
//! `remove`, and `update_status` checks and writes under one `get_mut` guard.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::CoreError;
use crate::evaluation::{
    apply_update, EvaluationRecord, EvaluationStatus, NewEvaluation, StatusUpdate,
};
use crate::job_status::JobStatusEntry;
use crate::store::{EvaluationStore, StatusStore};
use crate::types::JobId;

// ---------------------------------------------------------------------------
// MemoryStatusStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredStatus {
    tenant: String,
    entry: JobStatusEntry,
    expires_at: Instant,
}

impl StoredStatus {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Expiring status store held in process memory.
#[derive(Debug)]
pub struct MemoryStatusStore {
    entries: DashMap<JobId, StoredStatus>,
    ttl: Duration,
}

impl MemoryStatusStore {
    /// Create a store whose entries live for `ttl` after each `set`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn set(
        &self,
        job_id: JobId,
        tenant: &str,
        entry: &JobStatusEntry,
    ) -> Result<(), CoreError> {
        self.entries.insert(
            job_id,
            StoredStatus {
                tenant: tenant.to_string(),
                entry: entry.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn peek(
        &self,
        tenant: &str,
        job_id: JobId,
    ) -> Result<Option<JobStatusEntry>, CoreError> {
        let now = Instant::now();
        let live = self
            .entries
            .get(&job_id)
            .filter(|stored| stored.tenant == tenant)
            .map(|stored| (!stored.is_expired(now)).then(|| stored.entry.clone()));

        match live {
            Some(Some(entry)) => Ok(Some(entry)),
            Some(None) => {
                self.entries.remove_if(&job_id, |_, stored| stored.is_expired(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn consume(
        &self,
        tenant: &str,
        job_id: JobId,
    ) -> Result<Option<JobStatusEntry>, CoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove_if(&job_id, |_, stored| stored.tenant == tenant)
            .and_then(|(_, stored)| (!stored.is_expired(now)).then_some(stored.entry)))
    }

    async fn purge_expired(&self) -> Result<u64, CoreError> {
        let now = Instant::now();
        let mut removed = 0u64;
        self.entries.retain(|_, stored| {
            let keep = !stored.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// MemoryEvaluationStore
// ---------------------------------------------------------------------------

/// Evaluation records keyed by `(tenant, eval_id)`.
#[derive(Debug, Default)]
pub struct MemoryEvaluationStore {
    records: DashMap<(String, String), EvaluationRecord>,
}

impl MemoryEvaluationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(tenant: &str, eval_id: &str) -> (String, String) {
    (tenant.to_string(), eval_id.to_string())
}

#[async_trait]
impl EvaluationStore for MemoryEvaluationStore {
    async fn create(&self, new: NewEvaluation) -> Result<EvaluationRecord, CoreError> {
        match self.records.entry(key(&new.tenant, &new.eval_id)) {
            Entry::Occupied(_) => Err(CoreError::Conflict(format!(
                "Evaluation {} already exists",
                new.eval_id
            ))),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let record = EvaluationRecord {
                    eval_id: new.eval_id,
                    tenant: new.tenant,
                    model_name: new.model_name,
                    dataset_name: new.dataset_name,
                    model_task: new.model_task,
                    label_behavior: new.label_behavior,
                    config: new.config,
                    status: EvaluationStatus::Pending,
                    results: None,
                    failure_reason: None,
                    error_detail: None,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn get(
        &self,
        tenant: &str,
        eval_id: &str,
    ) -> Result<Option<EvaluationRecord>, CoreError> {
        Ok(self
            .records
            .get(&key(tenant, eval_id))
            .map(|r| r.value().clone()))
    }

    async fn list(&self, tenant: &str) -> Result<Vec<EvaluationRecord>, CoreError> {
        let mut records: Vec<EvaluationRecord> = self
            .records
            .iter()
            .filter(|r| r.key().0 == tenant)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.eval_id.cmp(&a.eval_id))
        });
        Ok(records)
    }

    async fn update_status(
        &self,
        tenant: &str,
        eval_id: &str,
        update: StatusUpdate,
    ) -> Result<EvaluationRecord, CoreError> {
        let mut record = self
            .records
            .get_mut(&key(tenant, eval_id))
            .ok_or_else(|| CoreError::evaluation_not_found(eval_id))?;
        apply_update(record.value_mut(), &update, Utc::now())?;
        Ok(record.value().clone())
    }

    async fn delete(&self, tenant: &str, eval_id: &str) -> Result<bool, CoreError> {
        Ok(self.records.remove(&key(tenant, eval_id)).is_some())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;
    use crate::evaluation::FailureReason;

    fn new_eval(tenant: &str, eval_id: &str) -> NewEvaluation {
        NewEvaluation {
            eval_id: eval_id.into(),
            tenant: tenant.into(),
            model_name: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".into(),
            dataset_name: "adult-census-income".into(),
            model_task: "binary_classification".into(),
            label_behavior: "binary".into(),
            config: serde_json::json!({"dataset": {"name": "adult-census-income"}}),
        }
    }

    fn entry(eval_id: &str) -> JobStatusEntry {
        JobStatusEntry::completed(eval_id, serde_json::json!({"ok": true}))
    }

    // -- status store --

    #[tokio::test]
    async fn consume_returns_entry_exactly_once() {
        let store = MemoryStatusStore::new(Duration::from_secs(60));
        store.set(7, "acme", &entry("eval_7")).await.unwrap();

        assert_eq!(store.consume("acme", 7).await.unwrap(), Some(entry("eval_7")));
        assert_eq!(store.consume("acme", 7).await.unwrap(), None);
        assert_eq!(store.peek("acme", 7).await.unwrap(), None);
    }

    #[tokio::test]
    async fn peek_does_not_remove() {
        let store = MemoryStatusStore::new(Duration::from_secs(60));
        store.set(1, "acme", &entry("eval_1")).await.unwrap();

        assert!(store.peek("acme", 1).await.unwrap().is_some());
        assert!(store.peek("acme", 1).await.unwrap().is_some());
        assert!(store.consume("acme", 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn other_tenant_neither_sees_nor_consumes_entry() {
        let store = MemoryStatusStore::new(Duration::from_secs(60));
        store.set(5, "acme", &entry("eval_5")).await.unwrap();

        assert_eq!(store.peek("globex", 5).await.unwrap(), None);
        assert_eq!(store.consume("globex", 5).await.unwrap(), None);
        assert_eq!(store.consume("acme", 5).await.unwrap(), Some(entry("eval_5")));
    }

    #[tokio::test]
    async fn set_overwrites_previous_entry() {
        let store = MemoryStatusStore::new(Duration::from_secs(60));
        store.set(3, "acme", &entry("first")).await.unwrap();
        store.set(3, "acme", &entry("second")).await.unwrap();

        let got = store.consume("acme", 3).await.unwrap().unwrap();
        assert_eq!(got.eval_id, "second");
    }

    #[tokio::test]
    async fn expired_entries_are_invisible_and_purged() {
        let store = MemoryStatusStore::new(Duration::ZERO);
        store.set(1, "acme", &entry("a")).await.unwrap();
        store.set(2, "acme", &entry("b")).await.unwrap();

        assert_eq!(store.peek("acme", 1).await.unwrap(), None);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.consume("acme", 2).await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_consumers_see_at_most_one_hit() {
        let store = Arc::new(MemoryStatusStore::new(Duration::from_secs(60)));
        store.set(99, "acme", &entry("eval_99")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.consume("acme", 99).await.unwrap() }));
        }
        let mut hits = 0;
        for h in handles {
            if h.await.unwrap().is_some() {
                hits += 1;
            }
        }
        assert_eq!(hits, 1);
    }

    // -- evaluation store --

    #[tokio::test]
    async fn create_starts_pending_and_rejects_duplicates() {
        let store = MemoryEvaluationStore::new();
        let rec = store.create(new_eval("acme", "eval_1")).await.unwrap();
        assert_eq!(rec.status, EvaluationStatus::Pending);
        assert!(rec.results.is_none());

        let dup = store.create(new_eval("acme", "eval_1")).await;
        assert_matches!(dup, Err(CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn records_are_invisible_to_other_tenants() {
        let store = MemoryEvaluationStore::new();
        store.create(new_eval("acme", "eval_1")).await.unwrap();

        assert!(store.get("acme", "eval_1").await.unwrap().is_some());
        assert!(store.get("globex", "eval_1").await.unwrap().is_none());
        assert!(store.list("globex").await.unwrap().is_empty());
        assert!(!store.delete("globex", "eval_1").await.unwrap());
        assert_matches!(
            store
                .update_status("globex", "eval_1", StatusUpdate::running())
                .await,
            Err(CoreError::NotFound { .. })
        );
        assert!(store.get("acme", "eval_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryEvaluationStore::new();
        store.create(new_eval("acme", "eval_1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.create(new_eval("acme", "eval_2")).await.unwrap();
        store.create(new_eval("other", "eval_3")).await.unwrap();

        let ids: Vec<String> = store
            .list("acme")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.eval_id)
            .collect();
        assert_eq!(ids, vec!["eval_2".to_string(), "eval_1".to_string()]);
    }

    #[tokio::test]
    async fn update_status_follows_lifecycle() {
        let store = MemoryEvaluationStore::new();
        store.create(new_eval("acme", "eval_1")).await.unwrap();

        let running = store
            .update_status("acme", "eval_1", StatusUpdate::running())
            .await
            .unwrap();
        assert_eq!(running.status, EvaluationStatus::Running);

        let failed = store
            .update_status(
                "acme",
                "eval_1",
                StatusUpdate::failed(FailureReason::MissingResults, "no artifact"),
            )
            .await
            .unwrap();
        assert_eq!(failed.status, EvaluationStatus::Failed);
        assert_eq!(failed.failure_reason, Some(FailureReason::MissingResults));

        // Retried terminal write is accepted and changes nothing.
        let again = store
            .update_status(
                "acme",
                "eval_1",
                StatusUpdate::failed(FailureReason::MissingResults, "no artifact"),
            )
            .await
            .unwrap();
        assert_eq!(again, failed);

        assert_matches!(
            store
                .update_status("acme", "eval_1", StatusUpdate::running())
                .await,
            Err(CoreError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn delete_reports_whether_a_record_existed() {
        let store = MemoryEvaluationStore::new();
        store.create(new_eval("acme", "eval_1")).await.unwrap();

        assert!(store.delete("acme", "eval_1").await.unwrap());
        assert!(!store.delete("acme", "eval_1").await.unwrap());
        assert!(!store.delete("acme", "never_existed").await.unwrap());
        assert!(store.get("acme", "eval_1").await.unwrap().is_none());
    }
}
