//! Tracker behavior across process restarts and an unreliable sheet.
//!
//! Uses a real `FileStore` in a temp directory so that each `Tracker` built
//! here sees exactly what a fresh `grv` process would.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use chrono::Weekday;
use grievance_core::Tracker;
use grievance_core::auth::{
    Auth, AuthUser, IdentityError, IdentityProvider, Profile, Role, RoleTable,
};
use grievance_core::model::{Category, Complaint, NewComplaint, Priority, Status};
use grievance_core::store::{
    FetchSource, FileStore, KeyValueStore, RemoteError, RemoteSheet, Storage, StorageKeys,
};

const EMAIL: &str = "pic@example.org";

#[derive(Default)]
struct SheetState {
    online: bool,
    rows: Vec<Complaint>,
    bearers: Vec<Option<String>>,
}

/// In-memory sheet shared with the test so it can be flipped offline.
#[derive(Clone, Default)]
struct SharedSheet(Rc<RefCell<SheetState>>);

impl RemoteSheet for SharedSheet {
    fn read(&self) -> Result<Vec<Complaint>, RemoteError> {
        let state = self.0.borrow();
        if state.online {
            Ok(state.rows.clone())
        } else {
            Err(RemoteError::Transport("connection refused".into()))
        }
    }

    fn write(&self, records: &[Complaint], bearer: Option<&str>) -> Result<(), RemoteError> {
        let mut state = self.0.borrow_mut();
        if !state.online {
            return Err(RemoteError::Transport("connection refused".into()));
        }
        state.rows = records.to_vec();
        state.bearers.push(bearer.map(str::to_string));
        Ok(())
    }
}

struct PasswordIdentity;

impl IdentityProvider for PasswordIdentity {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        if password == "secret" {
            Ok(AuthUser {
                id: "uid-1".into(),
                email: email.into(),
                access_token: "tok-1".into(),
            })
        } else {
            Err(IdentityError::Rejected("Invalid login credentials".into()))
        }
    }

    fn sign_out(&self, _token: &str) -> Result<(), IdentityError> {
        Ok(())
    }
}

fn roles() -> RoleTable {
    let mut users = BTreeMap::new();
    users.insert(
        EMAIL.to_string(),
        Profile {
            role: Role::Assignee,
            name: "Ust. Ridho".into(),
            department: "Sarana".into(),
        },
    );
    RoleTable::new(&users)
}

fn tracker(dir: &Path, sheet: &SharedSheet) -> Tracker {
    let keys = StorageKeys::default();
    let cache: Rc<dyn KeyValueStore> = Rc::new(FileStore::new(dir));
    let storage = Storage::new(cache.clone(), Some(Box::new(sheet.clone())), keys.clone());
    let mut auth = Auth::new(cache, Box::new(PasswordIdentity), roles(), keys.session);
    auth.restore();
    Tracker::new(storage, auth, Weekday::Sun)
}

fn form(description: &str) -> NewComplaint {
    NewComplaint {
        reporter: "Pak Ahmad".into(),
        category: Some(Category::Facility),
        priority: Some(Priority::Medium),
        description: description.into(),
        ..NewComplaint::default()
    }
}

#[test]
fn writes_survive_an_offline_sheet_and_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sheet = SharedSheet::default();

    let mut first = tracker(dir.path(), &sheet);
    assert_eq!(first.load(), FetchSource::Cache);
    first
        .auth_mut()
        .sign_in(EMAIL, "secret")
        .expect("sign in");
    let (record, outcome) = first.add_complaint(&form("Keran bocor")).expect("add");
    assert!(!outcome.mirrored);

    let mut second = tracker(dir.path(), &sheet);
    assert!(second.auth().is_logged_in(), "session should be restored");
    assert_eq!(second.load(), FetchSource::Cache);
    assert_eq!(second.records().len(), 1);
    assert_eq!(second.records()[0].id, record.id);
    assert_eq!(second.records()[0].status, Status::Pending);
    assert_eq!(second.records()[0].created_by.as_deref(), Some(EMAIL));
}

#[test]
fn online_writes_carry_the_access_token_and_refresh_the_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sheet = SharedSheet::default();
    sheet.0.borrow_mut().online = true;

    let mut tracker = tracker(dir.path(), &sheet);
    tracker.auth_mut().sign_in(EMAIL, "secret").expect("sign in");
    let (_, outcome) = tracker.add_complaint(&form("Lampu mati")).expect("add");
    assert!(outcome.mirrored);
    assert_eq!(
        sheet.0.borrow().bearers,
        vec![Some("tok-1".to_string())]
    );

    assert_eq!(tracker.refresh(), FetchSource::Remote);
    assert!(tracker.storage().last_sync().is_some());

    sheet.0.borrow_mut().online = false;
    assert_eq!(tracker.refresh(), FetchSource::Cache);
    assert_eq!(tracker.records().len(), 1);
}

#[test]
fn wrong_password_surfaces_the_provider_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut tracker = tracker(dir.path(), &SharedSheet::default());
    let err = tracker
        .auth_mut()
        .sign_in(EMAIL, "nope")
        .expect_err("must fail");
    assert!(err.to_string().contains("Invalid login credentials"));
    assert!(!tracker.auth().is_logged_in());
}
