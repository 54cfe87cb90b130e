//! Persistence façade: local cache as source of truth, remote sheet as a
//! best-effort mirror.
//!
//! Every mutation loads the cached collection, applies the change, writes the
//! whole collection back to the cache, and only then tries the remote. A
//! remote failure is logged and reported as a local-only save; it is never an
//! error for the caller.

pub mod kv;
pub mod remote;

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::GrievanceError;
use crate::model::{Complaint, ComplaintPatch, decode_rows};
pub use kv::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use remote::{HttpSheet, RemoteError, RemoteSheet};

/// Names of the three logical keys in the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct StorageKeys {
    #[serde(rename = "complaints_key", default = "default_complaints_key")]
    pub complaints: String,
    #[serde(rename = "session_key", default = "default_session_key")]
    pub session: String,
    #[serde(rename = "last_sync_key", default = "default_last_sync_key")]
    pub last_sync: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            complaints: default_complaints_key(),
            session: default_session_key(),
            last_sync: default_last_sync_key(),
        }
    }
}

fn default_complaints_key() -> String {
    "complaints".to_string()
}

fn default_session_key() -> String {
    "user_session".to_string()
}

fn default_last_sync_key() -> String {
    "last_sync".to_string()
}

/// Where a fetched collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
    Remote,
    Cache,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub records: Vec<Complaint>,
    pub source: FetchSource,
}

/// Result of a write. Always a success from the caller's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    /// True when the remote request was sent without a transport error.
    pub mirrored: bool,
    pub message: String,
}

impl SaveOutcome {
    fn local_only() -> Self {
        Self {
            mirrored: false,
            message: "saved locally".to_string(),
        }
    }

    fn mirrored() -> Self {
        Self {
            mirrored: true,
            message: "saved and sent to remote".to_string(),
        }
    }
}

pub struct Storage {
    cache: Rc<dyn KeyValueStore>,
    remote: Option<Box<dyn RemoteSheet>>,
    keys: StorageKeys,
    bearer: Option<String>,
}

impl Storage {
    pub fn new(
        cache: Rc<dyn KeyValueStore>,
        remote: Option<Box<dyn RemoteSheet>>,
        keys: StorageKeys,
    ) -> Self {
        Self {
            cache,
            remote,
            keys,
            bearer: None,
        }
    }

    /// Access token attached to remote writes so the endpoint can verify
    /// who is writing.
    pub fn set_bearer(&mut self, token: Option<String>) {
        self.bearer = token;
    }

    #[must_use]
    pub const fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// The cached collection for display, or empty when unreadable.
    #[must_use]
    pub fn load_cached(&self) -> Vec<Complaint> {
        self.read_cache().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "complaint cache unreadable; showing nothing");
            Vec::new()
        })
    }

    /// The cached collection, decoded row by row.
    ///
    /// Rows with bad labels, dates or costs are repaired and kept. A cache
    /// that is not a JSON array, or that holds a row without an id, is an
    /// error so that no mutation can overwrite it.
    pub fn read_cache(&self) -> Result<Vec<Complaint>, GrievanceError> {
        let Some(raw) = self.cache.get(&self.keys.complaints)? else {
            return Ok(Vec::new());
        };
        let rows: Vec<serde_json::Value> = serde_json::from_str(&raw)
            .map_err(|err| GrievanceError::CorruptCache(err.to_string()))?;
        let decoded = decode_rows(rows);
        if decoded.dropped > 0 {
            return Err(GrievanceError::CorruptCache(format!(
                "{} row(s) without an id",
                decoded.dropped
            )));
        }
        if !decoded.repaired.is_empty() {
            tracing::warn!(ids = ?decoded.repaired, "kept cached rows with unreadable fields");
        }
        Ok(decoded.records)
    }

    /// When the last successful remote read happened.
    #[must_use]
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.cache
            .get(&self.keys.last_sync)
            .ok()
            .flatten()
            .and_then(|raw| crate::model::parse_timestamp(&raw))
    }

    /// Remote read with fallback to the cache on any failure.
    pub fn fetch(&self) -> FetchOutcome {
        let Some(remote) = self.remote.as_deref() else {
            tracing::debug!("remote endpoint not configured; using local cache");
            return self.cached_outcome();
        };

        match remote.read() {
            Ok(records) => {
                if let Err(err) = self.write_cache(&records) {
                    tracing::warn!(error = %err, "fetched remote data but could not cache it");
                }
                if let Err(err) = self
                    .cache
                    .set(&self.keys.last_sync, &Utc::now().to_rfc3339())
                {
                    tracing::debug!(error = %err, "failed to stamp last sync");
                }
                tracing::info!(count = records.len(), "loaded complaints from remote");
                FetchOutcome {
                    records,
                    source: FetchSource::Remote,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "remote fetch failed; using offline data");
                self.cached_outcome()
            }
        }
    }

    fn cached_outcome(&self) -> FetchOutcome {
        FetchOutcome {
            records: self.load_cached(),
            source: FetchSource::Cache,
        }
    }

    fn write_cache(&self, records: &[Complaint]) -> Result<(), GrievanceError> {
        let json = serde_json::to_string(records)
            .map_err(|err| GrievanceError::Cache(err.to_string()))?;
        self.cache.set(&self.keys.complaints, &json)?;
        Ok(())
    }

    /// Persist the full collection: cache first, then best-effort remote.
    pub fn save(&self, records: &[Complaint]) -> Result<SaveOutcome, GrievanceError> {
        self.write_cache(records)?;

        let Some(remote) = self.remote.as_deref() else {
            return Ok(SaveOutcome::local_only());
        };
        match remote.write(records, self.bearer.as_deref()) {
            Ok(()) => Ok(SaveOutcome::mirrored()),
            Err(err) => {
                tracing::warn!(error = %err, "remote write failed; data kept locally");
                Ok(SaveOutcome::local_only())
            }
        }
    }

    pub fn add(&self, record: Complaint) -> Result<SaveOutcome, GrievanceError> {
        let mut records = self.read_cache()?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(GrievanceError::DuplicateId(record.id));
        }
        records.push(record);
        self.save(&records)
    }

    /// Merge `patch` into the cached record and return the merged record.
    pub fn update(
        &self,
        id: &str,
        patch: &ComplaintPatch,
    ) -> Result<(Complaint, SaveOutcome), GrievanceError> {
        let mut records = self.read_cache()?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| GrievanceError::NotFound(id.to_string()))?;
        record.apply(patch);
        let updated = record.clone();
        let outcome = self.save(&records)?;
        Ok((updated, outcome))
    }

    /// Remove `id` if present; an absent id is not an error.
    pub fn delete(&self, id: &str) -> Result<SaveOutcome, GrievanceError> {
        let mut records = self.read_cache()?;
        records.retain(|r| r.id != id);
        self.save(&records)
    }

    pub fn bulk_delete(&self, ids: &[String]) -> Result<SaveOutcome, GrievanceError> {
        let mut records = self.read_cache()?;
        records.retain(|r| !ids.contains(&r.id));
        self.save(&records)
    }
}

impl From<StoreError> for GrievanceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Lock(lock) => Self::Lock(lock),
            other @ StoreError::Io { .. } => Self::Cache(other.to_string()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeSheet;
    use super::*;
    use crate::model::{Category, Priority, Status};
    use chrono::TimeZone;
    use std::cell::RefCell;

    fn complaint(id: &str) -> Complaint {
        Complaint {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 2, 1, 7, 0, 0).unwrap(),
            reporter: "Jamaah".to_string(),
            category: Category::Cleanliness,
            priority: Priority::Medium,
            description: "Toilet kotor".to_string(),
            resolution: String::new(),
            assignee: "Muhammad Ridho".to_string(),
            cost: 50_000,
            status: Status::Pending,
            completed_at: None,
            created_by: Some("ust.ridho@alfajar.com".to_string()),
        }
    }

    fn local_storage() -> (Rc<MemoryStore>, Storage) {
        let cache = Rc::new(MemoryStore::new());
        let storage = Storage::new(cache.clone(), None, StorageKeys::default());
        (cache, storage)
    }

    #[test]
    fn fetch_without_remote_reads_cache() {
        let (_cache, storage) = local_storage();
        storage.save(&[complaint("a")]).unwrap();

        let outcome = storage.fetch();
        assert_eq!(outcome.source, FetchSource::Cache);
        assert_eq!(outcome.records, vec![complaint("a")]);
    }

    #[test]
    fn fetch_success_overwrites_cache_and_stamps_sync() {
        let cache = Rc::new(MemoryStore::new());
        let remote = FakeSheet {
            rows: Some(vec![complaint("remote")]),
            ..FakeSheet::default()
        };
        let storage = Storage::new(cache.clone(), Some(Box::new(remote)), StorageKeys::default());
        storage.write_cache(&[complaint("stale")]).unwrap();

        let outcome = storage.fetch();
        assert_eq!(outcome.source, FetchSource::Remote);
        assert_eq!(storage.load_cached(), vec![complaint("remote")]);
        assert!(storage.last_sync().is_some());
    }

    #[test]
    fn fetch_failure_falls_back_to_cache() {
        let cache = Rc::new(MemoryStore::new());
        let storage = Storage::new(
            cache,
            Some(Box::new(FakeSheet::default())),
            StorageKeys::default(),
        );
        storage.write_cache(&[complaint("cached")]).unwrap();

        let outcome = storage.fetch();
        assert_eq!(outcome.source, FetchSource::Cache);
        assert_eq!(outcome.records[0].id, "cached");
        assert!(storage.last_sync().is_none());
    }

    #[test]
    fn unreadable_cache_shows_empty_but_blocks_writes() {
        let (cache, storage) = local_storage();
        cache.set("complaints", "{not json").unwrap();
        assert!(storage.fetch().records.is_empty());

        assert!(matches!(
            storage.add(complaint("new")),
            Err(GrievanceError::CorruptCache(_))
        ));
        assert!(matches!(
            storage.delete("a"),
            Err(GrievanceError::CorruptCache(_))
        ));
        assert_eq!(cache.get("complaints").unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn row_without_id_blocks_writes() {
        let (cache, storage) = local_storage();
        let good = serde_json::to_string(&complaint("a")).unwrap();
        let raw = format!(r#"[{good},{{"nama":"orphan"}}]"#);
        cache.set("complaints", &raw).unwrap();

        assert!(matches!(
            storage.bulk_delete(&["a".to_string()]),
            Err(GrievanceError::CorruptCache(_))
        ));
        assert_eq!(cache.get("complaints").unwrap(), Some(raw));
    }

    #[test]
    fn one_malformed_row_survives_an_add() {
        let (cache, storage) = local_storage();
        let good = serde_json::to_string(&complaint("BKM-1")).unwrap();
        let raw = format!(
            r#"[{good},{{"id":"BKM-2","tanggal":"2025-02-02","nama":"A","kategori":"Sarana",
                "prioritas":"Low","uraian":"Keran bocor","status":""}}]"#
        );
        cache.set("complaints", &raw).unwrap();

        storage.add(complaint("BKM-NEW")).unwrap();
        let kept = storage.load_cached();
        let ids: Vec<&str> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["BKM-1", "BKM-2", "BKM-NEW"]);
        assert_eq!(kept[1].status, Status::Pending);
        assert_eq!(kept[1].description, "Keran bocor");
    }

    #[test]
    fn remote_write_failure_still_succeeds_locally() {
        let cache = Rc::new(MemoryStore::new());
        let remote = FakeSheet {
            fail_writes: true,
            ..FakeSheet::default()
        };
        let storage = Storage::new(cache, Some(Box::new(remote)), StorageKeys::default());

        let outcome = storage.add(complaint("a")).unwrap();
        assert!(!outcome.mirrored);
        assert_eq!(storage.load_cached().len(), 1);
    }

    #[test]
    fn remote_write_carries_full_collection_and_bearer() {
        let writes = Rc::new(RefCell::new(Vec::new()));
        let remote = FakeSheet {
            writes: writes.clone(),
            ..FakeSheet::default()
        };
        let mut storage = Storage::new(
            Rc::new(MemoryStore::new()),
            Some(Box::new(remote)),
            StorageKeys::default(),
        );
        storage.set_bearer(Some("token-123".to_string()));

        storage.add(complaint("a")).unwrap();
        let outcome = storage.add(complaint("b")).unwrap();
        assert!(outcome.mirrored);

        let writes = writes.borrow();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1].0.len(), 2);
        assert_eq!(writes[1].1.as_deref(), Some("token-123"));
    }

    #[test]
    fn add_rejects_duplicate_ids() {
        let (_cache, storage) = local_storage();
        storage.add(complaint("a")).unwrap();
        assert!(matches!(
            storage.add(complaint("a")),
            Err(GrievanceError::DuplicateId(_))
        ));
    }

    #[test]
    fn update_merges_only_patched_fields() {
        let (_cache, storage) = local_storage();
        storage.add(complaint("a")).unwrap();

        let (updated, _) = storage
            .update("a", &ComplaintPatch::status(Status::InProgress))
            .unwrap();
        assert_eq!(updated.status, Status::InProgress);

        let mut expected = complaint("a");
        expected.status = Status::InProgress;
        assert_eq!(storage.load_cached(), vec![expected]);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let (_cache, storage) = local_storage();
        assert!(matches!(
            storage.update("missing", &ComplaintPatch::default()),
            Err(GrievanceError::NotFound(_))
        ));
    }

    #[test]
    fn bulk_delete_keeps_survivor_order() {
        let (_cache, storage) = local_storage();
        let records: Vec<Complaint> = ["a", "b", "c", "d", "e"].map(complaint).to_vec();
        storage.save(&records).unwrap();

        storage
            .bulk_delete(&["b".to_string(), "d".to_string()])
            .unwrap();
        let ids: Vec<String> = storage.load_cached().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["a", "c", "e"]);
    }

    #[test]
    fn delete_of_absent_id_is_a_no_op() {
        let (_cache, storage) = local_storage();
        storage.add(complaint("a")).unwrap();
        storage.delete("zzz").unwrap();
        assert_eq!(storage.load_cached().len(), 1);
    }
}
