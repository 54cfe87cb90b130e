//! Login session lifecycle and the edit-permission rule.

pub mod identity;
pub mod session;

use std::rc::Rc;

use crate::error::GrievanceError;
use crate::model::Complaint;
use crate::store::KeyValueStore;
pub use identity::{GoTrueClient, IdentityError, IdentityProvider};
pub use session::{AuthUser, Profile, Role, RoleTable, Session};

/// Fallback display name when neither profile name nor email is known.
pub const ANONYMOUS_NAME: &str = "User";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    /// A sign-in request is in flight.
    Authenticating,
    Authenticated(Session),
}

/// Whether `session` may edit or delete `record`.
///
/// Admins may touch anything; everyone else only records they created.
/// Records without a creator are admin-only.
#[must_use]
pub fn can_modify(session: Option<&Session>, record: &Complaint) -> bool {
    let Some(session) = session else {
        return false;
    };
    if session.is_admin() {
        return true;
    }
    record
        .created_by
        .as_deref()
        .is_some_and(|creator| creator == session.email())
}

pub struct Auth {
    store: Rc<dyn KeyValueStore>,
    provider: Box<dyn IdentityProvider>,
    roles: RoleTable,
    session_key: String,
    state: SessionState,
}

impl Auth {
    pub fn new(
        store: Rc<dyn KeyValueStore>,
        provider: Box<dyn IdentityProvider>,
        roles: RoleTable,
        session_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            roles,
            session_key: session_key.into(),
            state: SessionState::Anonymous,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// Authenticate against the identity service and map the email to a
    /// profile. Unregistered emails are signed straight back out.
    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<&Session, GrievanceError> {
        self.state = SessionState::Authenticating;

        let user = match self.provider.sign_in(email.trim(), password) {
            Ok(user) => user,
            Err(err) => {
                self.state = SessionState::Anonymous;
                tracing::warn!(error = %err, "sign-in rejected");
                return Err(GrievanceError::Identity(err.to_string()));
            }
        };

        let Some(profile) = self.roles.lookup(&user.email).cloned() else {
            if let Err(err) = self.provider.sign_out(&user.access_token) {
                tracing::debug!(error = %err, "sign-out of unregistered user failed");
            }
            self.state = SessionState::Anonymous;
            return Err(GrievanceError::NotRegistered(user.email));
        };

        let session = Session { user, profile };
        let json = serde_json::to_string(&session)
            .map_err(|err| GrievanceError::Cache(err.to_string()))?;
        if let Err(err) = self.store.set(&self.session_key, &json) {
            self.state = SessionState::Anonymous;
            return Err(err.into());
        }
        tracing::info!(email = %session.email(), role = %session.profile.role, "signed in");
        self.state = SessionState::Authenticated(session);
        self.session().ok_or(GrievanceError::NotLoggedIn)
    }

    /// Rehydrate the persisted session, if any.
    ///
    /// A corrupt session, or one whose email has since left the role table,
    /// is removed and leaves the holder anonymous. The profile is refreshed
    /// from the current role table.
    pub fn restore(&mut self) -> Option<&Session> {
        self.state = SessionState::Anonymous;
        let raw = match self.store.get(&self.session_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::debug!(error = %err, "could not read saved session");
                return None;
            }
        };

        let mut session: Session = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(err) => {
                tracing::debug!(error = %err, "discarding corrupt session");
                self.discard_saved();
                return None;
            }
        };

        let Some(profile) = self.roles.lookup(session.email()) else {
            tracing::debug!(email = %session.email(), "saved session no longer registered");
            self.discard_saved();
            return None;
        };
        session.profile = profile.clone();
        self.state = SessionState::Authenticated(session);
        self.session()
    }

    /// End the session. Remote sign-out is best effort; the local session is
    /// always cleared.
    pub fn sign_out(&mut self) {
        if let Some(session) = self.session() {
            if let Err(err) = self.provider.sign_out(&session.user.access_token) {
                tracing::warn!(error = %err, "remote sign-out failed; clearing local session");
            }
        }
        self.discard_saved();
        self.state = SessionState::Anonymous;
    }

    fn discard_saved(&self) {
        if let Err(err) = self.store.remove(&self.session_key) {
            tracing::warn!(error = %err, "failed to remove saved session");
        }
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.session().is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.session().is_some_and(Session::is_admin)
    }

    #[must_use]
    pub fn user_name(&self) -> String {
        match self.session() {
            Some(s) if !s.profile.name.trim().is_empty() => s.profile.name.clone(),
            Some(s) if !s.email().is_empty() => s.email().to_string(),
            _ => ANONYMOUS_NAME.to_string(),
        }
    }

    #[must_use]
    pub fn user_role(&self) -> Option<Role> {
        self.session().map(|s| s.profile.role)
    }

    #[must_use]
    pub fn user_email(&self) -> Option<&str> {
        self.session().map(Session::email)
    }

    #[must_use]
    pub fn department(&self) -> Option<&str> {
        self.session()
            .map(|s| s.profile.department.as_str())
            .filter(|d| !d.is_empty())
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.session().map(|s| s.user.access_token.as_str())
    }

    #[must_use]
    pub fn can_modify(&self, record: &Complaint) -> bool {
        can_modify(self.session(), record)
    }

    pub fn require_login(&self) -> Result<&Session, GrievanceError> {
        self.session().ok_or(GrievanceError::NotLoggedIn)
    }

    /// Fail unless the current session may perform `action` on `record`.
    pub fn authorize(&self, action: &'static str, record: &Complaint) -> Result<(), GrievanceError> {
        let session = self.require_login()?;
        if can_modify(Some(session), record) {
            Ok(())
        } else {
            Err(GrievanceError::PermissionDenied {
                action,
                id: record.id.clone(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::identity::{IdentityError, IdentityProvider};
    use super::session::{AuthUser, Profile, Role, RoleTable};
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    /// Accepts any email with password `secret`.
    #[derive(Default)]
    pub struct FakeIdentity {
        pub sign_outs: Rc<Cell<usize>>,
        pub fail_sign_out: bool,
    }

    impl IdentityProvider for FakeIdentity {
        fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
            if password != "secret" {
                return Err(IdentityError::Rejected("Invalid login credentials".to_string()));
            }
            Ok(AuthUser {
                id: format!("uid-{email}"),
                email: email.to_string(),
                access_token: format!("token-{email}"),
            })
        }

        fn sign_out(&self, _access_token: &str) -> Result<(), IdentityError> {
            self.sign_outs.set(self.sign_outs.get() + 1);
            if self.fail_sign_out {
                return Err(IdentityError::Transport("offline".to_string()));
            }
            Ok(())
        }
    }

    pub const ADMIN: &str = "admin@alfajar.com";
    pub const PIC: &str = "ust.ridho@alfajar.com";

    pub fn roles() -> RoleTable {
        let mut raw = BTreeMap::new();
        raw.insert(
            ADMIN.to_string(),
            Profile {
                role: Role::Admin,
                name: "Administrator".to_string(),
                department: "Takmir".to_string(),
            },
        );
        raw.insert(
            PIC.to_string(),
            Profile {
                role: Role::Assignee,
                name: "Muhammad Ridho".to_string(),
                department: "Sarana & Prasarana".to_string(),
            },
        );
        RoleTable::new(&raw)
    }
}
