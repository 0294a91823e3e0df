use std::collections::HashSet;
use std::hash::Hash;

use bastion_core::{AppResult, NonEmptyString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AssetGroupId, AssetId, RoleId, RuleId, UserGroupId, UserId};

/// Associations carried by a permission rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMembers {
    /// Assets the rule grants access to.
    pub assets: Vec<AssetId>,
    /// Asset groups the rule grants access to.
    pub asset_groups: Vec<AssetGroupId>,
    /// Users allowed to use the rule.
    pub users: Vec<UserId>,
    /// User groups allowed to use the rule.
    pub user_groups: Vec<UserGroupId>,
    /// Roles the users may act as.
    pub roles: Vec<RoleId>,
}

impl RuleMembers {
    /// Collapses duplicates in every set while keeping first-seen order.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            assets: dedup_preserving_order(self.assets),
            asset_groups: dedup_preserving_order(self.asset_groups),
            users: dedup_preserving_order(self.users),
            user_groups: dedup_preserving_order(self.user_groups),
            roles: dedup_preserving_order(self.roles),
        }
    }
}

/// Permission grant binding roles to assets for a set of users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    id: RuleId,
    name: NonEmptyString,
    date_added: DateTime<Utc>,
    comment: String,
    members: RuleMembers,
}

impl Rule {
    /// Creates a permission rule.
    pub fn new(
        id: RuleId,
        name: impl Into<String>,
        date_added: DateTime<Utc>,
        comment: impl Into<String>,
        members: RuleMembers,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            date_added,
            comment: comment.into(),
            members: members.normalized(),
        })
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
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

    /// Returns the rule associations.
    #[must_use]
    pub fn members(&self) -> &RuleMembers {
        &self.members
    }

    /// Returns the role identifiers bound by the rule.
    #[must_use]
    pub fn role_ids(&self) -> &[RoleId] {
        self.members.roles.as_slice()
    }

    /// A rule without roles or without any asset target grants nothing.
    #[must_use]
    pub fn is_effective(&self) -> bool {
        !self.members.roles.is_empty()
            && !(self.members.assets.is_empty() && self.members.asset_groups.is_empty())
    }

    /// Returns whether the user is named directly or through one of its groups.
    #[must_use]
    pub fn covers_user(&self, user: &UserId, user_groups: &[UserGroupId]) -> bool {
        self.members.users.contains(user)
            || user_groups
                .iter()
                .any(|group| self.members.user_groups.contains(group))
    }

    /// Returns whether the asset is named directly or through one of its groups.
    #[must_use]
    pub fn covers_asset(&self, asset: &AssetId, asset_groups: &[AssetGroupId]) -> bool {
        self.members.assets.contains(asset)
            || asset_groups
                .iter()
                .any(|group| self.members.asset_groups.contains(group))
    }

    /// Returns whether the rule lets the user act against the asset.
    #[must_use]
    pub fn grants(
        &self,
        user: &UserId,
        user_groups: &[UserGroupId],
        asset: &AssetId,
        asset_groups: &[AssetGroupId],
    ) -> bool {
        self.is_effective()
            && self.covers_user(user, user_groups)
            && self.covers_asset(asset, asset_groups)
    }

    /// Drops a role from the rule, keeping the rule itself.
    pub fn remove_role(&mut self, role_id: RoleId) {
        self.members.roles.retain(|stored| *stored != role_id);
    }

    /// Keeps only the roles accepted by the predicate.
    pub fn retain_roles(&mut self, mut keep: impl FnMut(RoleId) -> bool) {
        self.members.roles.retain(|role_id| keep(*role_id));
    }
}

pub(crate) fn dedup_preserving_order<T: Eq + Hash + Clone>(values: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(values.len());
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
