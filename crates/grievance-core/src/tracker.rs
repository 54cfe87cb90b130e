//! The application core: the full collection, the filtered view derived from
//! it, the bulk-selection set, and the CRUD workflow tying permission checks
//! to persistence.

use chrono::{DateTime, Local, TimeZone, Utc, Weekday};
use serde::Serialize;

use crate::auth::Auth;
use crate::error::GrievanceError;
use crate::filter::{self, FilterCriteria, Period};
use crate::model::{Complaint, ComplaintPatch, NewComplaint, Priority, Status};
use crate::report::Stats;
use crate::store::{FetchSource, SaveOutcome, Storage};
use crate::util::{generate_id, validate_patch, validate_submission};

/// Summary of a bulk action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub processed: usize,
    /// True only if every write reached the remote.
    pub mirrored: bool,
}

pub struct Tracker {
    storage: Storage,
    auth: Auth,
    records: Vec<Complaint>,
    view: Vec<Complaint>,
    criteria: FilterCriteria,
    selected: Vec<String>,
    first_weekday: Weekday,
    source: Option<FetchSource>,
}

impl Tracker {
    pub fn new(storage: Storage, auth: Auth, first_weekday: Weekday) -> Self {
        Self {
            storage,
            auth,
            records: Vec::new(),
            view: Vec::new(),
            criteria: FilterCriteria::default(),
            selected: Vec::new(),
            first_weekday,
            source: None,
        }
    }

    #[must_use]
    pub const fn auth(&self) -> &Auth {
        &self.auth
    }

    pub const fn auth_mut(&mut self) -> &mut Auth {
        &mut self.auth
    }

    #[must_use]
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Every loaded record, newest first.
    #[must_use]
    pub fn records(&self) -> &[Complaint] {
        &self.records
    }

    /// The records passing the active criteria.
    #[must_use]
    pub fn view(&self) -> &[Complaint] {
        &self.view
    }

    #[must_use]
    pub const fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Where the last load came from; `None` before the first load.
    #[must_use]
    pub const fn source(&self) -> Option<FetchSource> {
        self.source
    }

    /// Fetch the collection (remote, else cache) and rebuild the view.
    pub fn load(&mut self) -> FetchSource {
        let outcome = self.storage.fetch();
        self.records = outcome.records;
        filter::sort_newest_first(&mut self.records);
        self.source = Some(outcome.source);
        self.selected.retain(|id| self.records.iter().any(|r| &r.id == id));
        self.apply_filters();
        outcome.source
    }

    /// Re-fetch while keeping the active criteria.
    pub fn refresh(&mut self) -> FetchSource {
        self.load()
    }

    pub fn apply_filters(&mut self) {
        self.apply_filters_at(&Local::now());
    }

    /// Rebuild the view against an explicit clock.
    pub fn apply_filters_at<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) {
        self.view = filter::apply(&self.records, &self.criteria, now, self.first_weekday);
        tracing::debug!(
            total = self.records.len(),
            shown = self.view.len(),
            "applied filters"
        );
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.apply_filters();
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.criteria.search = term.into();
        self.apply_filters();
    }

    pub fn set_status_filter(&mut self, status: Option<Status>) {
        self.criteria.status = status;
        self.apply_filters();
    }

    pub fn set_priority_filter(&mut self, priority: Option<Priority>) {
        self.criteria.priority = priority;
        self.apply_filters();
    }

    pub fn set_period(&mut self, period: Period) {
        self.criteria.period = period;
        self.apply_filters();
    }

    /// Drop every criterion; the view becomes the full collection again.
    pub fn clear_filters(&mut self) {
        self.criteria = FilterCriteria::default();
        self.view.clone_from(&self.records);
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Complaint> {
        self.records.iter().find(|r| r.id == id)
    }

    fn require(&self, id: &str) -> Result<&Complaint, GrievanceError> {
        self.find(id)
            .ok_or_else(|| GrievanceError::NotFound(id.to_string()))
    }

    /// Hand the session token to storage so remote writes are attributable.
    fn prepare_write(&mut self) {
        let token = self.auth.access_token().map(str::to_string);
        self.storage.set_bearer(token);
    }

    fn replace_record(&mut self, updated: Complaint) {
        if let Some(slot) = self.records.iter_mut().find(|r| r.id == updated.id) {
            *slot = updated;
        }
    }

    pub fn add_complaint(
        &mut self,
        form: &NewComplaint,
    ) -> Result<(Complaint, SaveOutcome), GrievanceError> {
        self.add_complaint_at(form, Utc::now())
    }

    /// Submit a new complaint stamped with `now`, owned by the signed-in user.
    pub fn add_complaint_at(
        &mut self,
        form: &NewComplaint,
        now: DateTime<Utc>,
    ) -> Result<(Complaint, SaveOutcome), GrievanceError> {
        let creator = self.auth.require_login()?.email().to_string();
        validate_submission(form)?;

        let record = Complaint::from_submission(generate_id(now), now, form, Some(creator))
            .ok_or_else(|| {
                GrievanceError::Validation(vec!["category and priority must be selected".into()])
            })?;

        self.prepare_write();
        let outcome = self.storage.add(record.clone())?;
        tracing::info!(id = %record.id, mirrored = outcome.mirrored, "complaint added");

        self.records.insert(0, record.clone());
        self.apply_filters();
        Ok((record, outcome))
    }

    /// The record to pre-fill an edit, if the current user may edit it.
    pub fn edit_check(&self, id: &str) -> Result<&Complaint, GrievanceError> {
        let record = self.require(id)?;
        self.auth.authorize("edit", record)?;
        Ok(record)
    }

    pub fn update_complaint(
        &mut self,
        id: &str,
        patch: &ComplaintPatch,
    ) -> Result<(Complaint, SaveOutcome), GrievanceError> {
        validate_patch(patch)?;
        self.edit_check(id)?;

        self.prepare_write();
        let (updated, outcome) = self.storage.update(id, patch)?;
        tracing::info!(id, mirrored = outcome.mirrored, "complaint updated");

        self.replace_record(updated.clone());
        self.apply_filters();
        Ok((updated, outcome))
    }

    pub fn delete_complaint(&mut self, id: &str) -> Result<SaveOutcome, GrievanceError> {
        let record = self.require(id)?;
        self.auth.authorize("delete", record)?;

        self.prepare_write();
        let outcome = self.storage.delete(id)?;
        tracing::info!(id, mirrored = outcome.mirrored, "complaint deleted");

        self.records.retain(|r| r.id != id);
        self.selected.retain(|s| s != id);
        self.apply_filters();
        Ok(outcome)
    }

    /// Ids currently marked for a bulk action, in selection order.
    #[must_use]
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Mark or unmark one record. Unknown ids are ignored.
    pub fn select(&mut self, id: &str, on: bool) {
        let present = self.selected.iter().any(|s| s == id);
        if on && !present && self.find(id).is_some() {
            self.selected.push(id.to_string());
        } else if !on && present {
            self.selected.retain(|s| s != id);
        }
    }

    /// Select or deselect every record in the current view.
    pub fn toggle_select_all(&mut self, on: bool) {
        let ids: Vec<String> = self.view.iter().map(|r| r.id.clone()).collect();
        for id in ids {
            self.select(&id, on);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Set `status` on each id in turn, one write per record.
    ///
    /// Stops at the first failure; records already processed stay updated.
    pub fn bulk_update_status(
        &mut self,
        ids: &[String],
        status: Status,
        completed_at: Option<Option<DateTime<Utc>>>,
    ) -> Result<BulkOutcome, GrievanceError> {
        self.auth.require_login()?;
        let patch = ComplaintPatch {
            status: Some(status),
            completed_at,
            ..ComplaintPatch::default()
        };

        let mut mirrored = true;
        for (done, id) in ids.iter().enumerate() {
            match self.update_complaint(id, &patch) {
                Ok((_, outcome)) => mirrored &= outcome.mirrored,
                Err(err) => {
                    tracing::warn!(id = %id, done, error = %err, "bulk status update stopped");
                    return Err(GrievanceError::PartialBatch {
                        done,
                        total: ids.len(),
                        source: Box::new(err),
                    });
                }
            }
        }
        self.clear_selection();
        Ok(BulkOutcome {
            processed: ids.len(),
            mirrored,
        })
    }

    /// Delete every id in one write. Nothing is deleted unless the user may
    /// delete all of them.
    pub fn bulk_delete(&mut self, ids: &[String]) -> Result<BulkOutcome, GrievanceError> {
        self.auth.require_login()?;
        for id in ids {
            let record = self.require(id)?;
            self.auth.authorize("delete", record)?;
        }

        self.prepare_write();
        let outcome = self.storage.bulk_delete(ids)?;
        tracing::info!(count = ids.len(), mirrored = outcome.mirrored, "bulk delete");

        self.records.retain(|r| !ids.contains(&r.id));
        self.clear_selection();
        self.apply_filters();
        Ok(BulkOutcome {
            processed: ids.len(),
            mirrored: outcome.mirrored,
        })
    }

    /// Figures over the full collection.
    #[must_use]
    pub fn stats(&self) -> Stats {
        Stats::compute(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{ADMIN, FakeIdentity, PIC, roles};
    use crate::model::Category;
    use crate::store::{KeyValueStore, MemoryStore, StorageKeys};
    use std::rc::Rc;

    fn tracker_with(cache: &Rc<MemoryStore>) -> Tracker {
        let storage = Storage::new(cache.clone(), None, StorageKeys::default());
        let auth = Auth::new(
            cache.clone(),
            Box::new(FakeIdentity::default()),
            roles(),
            "user_session",
        );
        Tracker::new(storage, auth, Weekday::Sun)
    }

    fn signed_in(email: &str) -> (Rc<MemoryStore>, Tracker) {
        let cache = Rc::new(MemoryStore::new());
        let mut tracker = tracker_with(&cache);
        tracker.auth_mut().sign_in(email, "secret").unwrap();
        tracker.load();
        (cache, tracker)
    }

    fn form(description: &str) -> NewComplaint {
        NewComplaint {
            reporter: "Jamaah".to_string(),
            category: Some(Category::Electronics),
            priority: Some(Priority::High),
            description: description.to_string(),
            resolution: "Ganti kabel".to_string(),
            assignee: "Muhammad Ridho".to_string(),
            cost: 75_000,
        }
    }

    fn cached(cache: &MemoryStore) -> Vec<Complaint> {
        serde_json::from_str(&cache.get("complaints").unwrap().unwrap()).unwrap()
    }

    #[test]
    fn add_persists_submitted_fields_as_pending() {
        let (cache, mut tracker) = signed_in(PIC);
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        let (record, outcome) = tracker.add_complaint_at(&form("Mic mati"), now).unwrap();
        assert!(!outcome.mirrored);

        let stored = cached(&cache);
        assert_eq!(stored.len(), 1);
        let stored = &stored[0];
        assert_eq!(stored, &record);
        assert_eq!(stored.status, Status::Pending);
        assert_eq!(stored.reporter, "Jamaah");
        assert_eq!(stored.category, Category::Electronics);
        assert_eq!(stored.priority, Priority::High);
        assert_eq!(stored.description, "Mic mati");
        assert_eq!(stored.resolution, "Ganti kabel");
        assert_eq!(stored.assignee, "Muhammad Ridho");
        assert_eq!(stored.cost, 75_000);
        assert_eq!(stored.created_at, now);
        assert_eq!(stored.created_by.as_deref(), Some(PIC));
        assert_eq!(tracker.view().len(), 1);
    }

    #[test]
    fn add_requires_login_and_valid_form() {
        let cache = Rc::new(MemoryStore::new());
        let mut tracker = tracker_with(&cache);
        assert!(matches!(
            tracker.add_complaint(&form("x")),
            Err(GrievanceError::NotLoggedIn)
        ));

        tracker.auth_mut().sign_in(PIC, "secret").unwrap();
        assert!(matches!(
            tracker.add_complaint(&NewComplaint::default()),
            Err(GrievanceError::Validation(_))
        ));
        assert!(cache.get("complaints").unwrap().is_none());
    }

    #[test]
    fn update_changes_only_patched_fields() {
        let (cache, mut tracker) = signed_in(PIC);
        let (record, _) = tracker.add_complaint(&form("Mic mati")).unwrap();

        let patch = ComplaintPatch {
            resolution: Some("Mic diganti".to_string()),
            ..ComplaintPatch::default()
        };
        let (updated, _) = tracker.update_complaint(&record.id, &patch).unwrap();

        let mut expected = record;
        expected.resolution = "Mic diganti".to_string();
        assert_eq!(updated, expected);
        assert_eq!(cached(&cache), vec![expected]);
    }

    #[test]
    fn assignee_cannot_touch_others_records() {
        let cache = Rc::new(MemoryStore::new());
        let mut admin = tracker_with(&cache);
        admin.auth_mut().sign_in(ADMIN, "secret").unwrap();
        let (record, _) = admin.add_complaint(&form("AC bocor")).unwrap();
        admin.auth_mut().sign_out();

        let mut pic = tracker_with(&cache);
        pic.auth_mut().sign_in(PIC, "secret").unwrap();
        pic.load();
        assert!(matches!(
            pic.edit_check(&record.id),
            Err(GrievanceError::PermissionDenied { action: "edit", .. })
        ));
        assert!(matches!(
            pic.delete_complaint(&record.id),
            Err(GrievanceError::PermissionDenied { action: "delete", .. })
        ));
        assert_eq!(cached(&cache).len(), 1);
    }

    #[test]
    fn bulk_delete_removes_exactly_the_selection() {
        let (cache, mut tracker) = signed_in(ADMIN);
        let mut ids = Vec::new();
        for (i, text) in ["a", "b", "c", "d"].iter().enumerate() {
            let at = Utc.with_ymd_and_hms(2025, 1, 1 + u32::try_from(i).unwrap(), 0, 0, 0).unwrap();
            ids.push(tracker.add_complaint_at(&form(text), at).unwrap().0.id);
        }

        tracker.select(&ids[1], true);
        tracker.select(&ids[3], true);
        let selected = tracker.selected().to_vec();
        let outcome = tracker.bulk_delete(&selected).unwrap();
        assert_eq!(outcome.processed, 2);
        assert!(tracker.selected().is_empty());

        let survivors: Vec<String> = cached(&cache).into_iter().map(|r| r.id).collect();
        assert_eq!(survivors, vec![ids[0].clone(), ids[2].clone()]);
    }

    #[test]
    fn bulk_status_stops_at_first_failure() {
        let (cache, mut tracker) = signed_in(ADMIN);
        let a = tracker.add_complaint(&form("a")).unwrap().0.id;
        let b = tracker.add_complaint(&form("b")).unwrap().0.id;
        let ids = vec![a.clone(), "missing".to_string(), b.clone()];

        let err = tracker
            .bulk_update_status(&ids, Status::Done, None)
            .unwrap_err();
        assert!(matches!(
            err,
            GrievanceError::PartialBatch { done: 1, total: 3, .. }
        ));

        let stored = cached(&cache);
        let status_of = |id: &str| stored.iter().find(|r| r.id == id).unwrap().status;
        assert_eq!(status_of(&a), Status::Done);
        assert_eq!(status_of(&b), Status::Pending);
    }

    #[test]
    fn bulk_status_can_stamp_completion() {
        let (_cache, mut tracker) = signed_in(ADMIN);
        let id = tracker.add_complaint(&form("a")).unwrap().0.id;
        let done_at = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let outcome = tracker
            .bulk_update_status(std::slice::from_ref(&id), Status::Done, Some(Some(done_at)))
            .unwrap();
        assert_eq!(outcome.processed, 1);
        assert_eq!(tracker.find(&id).unwrap().completed_at, Some(done_at));
    }

    #[test]
    fn filters_derive_view_and_clear_restores_everything() {
        let (_cache, mut tracker) = signed_in(ADMIN);
        let a = tracker.add_complaint(&form("Lampu MASJID mati")).unwrap().0.id;
        tracker.add_complaint(&form("Karpet kotor")).unwrap();
        tracker
            .update_complaint(&a, &ComplaintPatch::status(Status::InProgress))
            .unwrap();

        tracker.set_search("masjid");
        assert_eq!(tracker.view().len(), 1);

        tracker.set_search("");
        tracker.set_status_filter(Some(Status::Pending));
        assert_eq!(tracker.view().len(), 1);
        assert_eq!(tracker.view()[0].description, "Karpet kotor");

        tracker.clear_filters();
        assert_eq!(tracker.view().len(), 2);
        assert!(tracker.criteria().is_unrestricted());
    }

    #[test]
    fn toggle_select_all_follows_the_view() {
        let (_cache, mut tracker) = signed_in(ADMIN);
        tracker.add_complaint(&form("Lampu mati")).unwrap();
        tracker.add_complaint(&form("Karpet kotor")).unwrap();

        tracker.set_search("lampu");
        tracker.toggle_select_all(true);
        assert_eq!(tracker.selected().len(), 1);

        tracker.toggle_select_all(false);
        assert!(tracker.selected().is_empty());

        tracker.select("unknown", true);
        assert!(tracker.selected().is_empty());
    }

    #[test]
    fn load_sorts_newest_first() {
        let (_cache, mut tracker) = signed_in(ADMIN);
        let old = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        tracker.add_complaint_at(&form("old"), old).unwrap();
        tracker.add_complaint_at(&form("new"), new).unwrap();

        assert_eq!(tracker.load(), FetchSource::Cache);
        assert_eq!(tracker.records()[0].description, "new");
        assert_eq!(tracker.stats().total, 2);
    }
}
