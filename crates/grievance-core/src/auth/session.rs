//! Session and profile types plus the static email-to-role table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    /// Person in charge: may only touch complaints they created.
    #[serde(rename = "pic")]
    Assignee,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Assignee => "pic",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub role: Role,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub department: String,
}

/// Identity returned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub access_token: String,
}

/// What gets persisted under the session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: AuthUser,
    pub profile: Profile,
}

impl Session {
    #[must_use]
    pub fn email(&self) -> &str {
        &self.user.email
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.profile.role == Role::Admin
    }
}

/// Email-keyed profiles. Lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleTable {
    entries: BTreeMap<String, Profile>,
}

impl RoleTable {
    #[must_use]
    pub fn new(entries: &BTreeMap<String, Profile>) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(email, profile)| (email.trim().to_lowercase(), profile.clone()))
                .collect(),
        }
    }

    #[must_use]
    pub fn lookup(&self, email: &str) -> Option<&Profile> {
        self.entries.get(&email.trim().to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
