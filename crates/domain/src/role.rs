use std::collections::HashSet;
use std::path::Path;

use bastion_core::{AppResult, NonEmptyString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{RoleId, Sudo, SudoId};

/// Location of the key directory issued to a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPath(NonEmptyString);

impl KeyPath {
    /// Creates a key reference from a directory path.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?))
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the path as a filesystem path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        Path::new(self.0.as_str())
    }
}

impl std::fmt::Display for KeyPath {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Service account usable for SSH access to managed assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: NonEmptyString,
    password: Option<String>,
    key_path: KeyPath,
    date_added: DateTime<Utc>,
    comment: String,
    sudo: Vec<Sudo>,
}

impl Role {
    /// Creates a role bound to an already issued key directory.
    ///
    /// An empty password is stored as no password.
    #[must_use]
    pub fn new(
        id: RoleId,
        name: NonEmptyString,
        password: Option<String>,
        key_path: KeyPath,
        date_added: DateTime<Utc>,
        comment: impl Into<String>,
        sudo: Vec<Sudo>,
    ) -> Self {
        Self {
            id,
            name,
            password: normalize_password(password),
            key_path,
            date_added,
            comment: comment.into(),
            sudo: dedup_sudo(sudo),
        }
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the unique role name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the optional login password pushed alongside the key.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns the key directory reference.
    #[must_use]
    pub fn key_path(&self) -> &KeyPath {
        &self.key_path
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn date_added(&self) -> DateTime<Utc> {
        self.date_added
    }

    /// Returns the free-text comment.
    #[must_use]
    pub fn comment(&self) -> &str {
        self.comment.as_str()
    }

    /// Returns the permitted sudo command groups.
    #[must_use]
    pub fn sudo(&self) -> &[Sudo] {
        self.sudo.as_slice()
    }

    /// Returns the identifiers of the permitted sudo command groups.
    #[must_use]
    pub fn sudo_ids(&self) -> Vec<SudoId> {
        self.sudo.iter().map(Sudo::id).collect()
    }

    /// Returns every permitted command once, in group then command order.
    #[must_use]
    pub fn commands(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.sudo
            .iter()
            .flat_map(|sudo| sudo.commands().iter().map(String::as_str))
            .filter(|command| seen.insert(*command))
            .collect()
    }

    /// Replaces the mutable settings of the role.
    pub fn update(
        &mut self,
        password: Option<String>,
        comment: impl Into<String>,
        sudo: Vec<Sudo>,
    ) {
        self.password = normalize_password(password);
        self.comment = comment.into();
        self.sudo = dedup_sudo(sudo);
    }

    /// Drops a sudo group from the role, if present.
    pub fn remove_sudo(&mut self, sudo_id: SudoId) {
        self.sudo.retain(|sudo| sudo.id() != sudo_id);
    }
}

fn normalize_password(password: Option<String>) -> Option<String> {
    password.filter(|value| !value.is_empty())
}

fn dedup_sudo(sudo: Vec<Sudo>) -> Vec<Sudo> {
    let mut seen = HashSet::new();
    sudo.into_iter()
        .filter(|group| seen.insert(group.id()))
        .collect()
}
