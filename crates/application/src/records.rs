//! Transport-neutral records for the collection and API boundary.
//!
//! Every projection is total over its entity and performs no I/O.

use bastion_domain::{
    AssetGroupId, AssetId, PushId, Role, RoleId, RuleId, Sudo, SudoId, UserGroupId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access_ports::{ResolvedPush, ResolvedRule};

/// Serialized sudo command group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SudoRecord {
    /// Stable identifier.
    pub id: SudoId,
    /// Group name.
    pub name: String,
    /// Creation timestamp.
    pub date_added: DateTime<Utc>,
    /// Ordered commands.
    pub commands: Vec<String>,
    /// Free-text comment.
    pub comment: String,
}

impl From<&Sudo> for SudoRecord {
    fn from(sudo: &Sudo) -> Self {
        Self {
            id: sudo.id(),
            name: sudo.name().as_str().to_owned(),
            date_added: sudo.date_added(),
            commands: sudo.commands().to_vec(),
            comment: sudo.comment().to_owned(),
        }
    }
}

/// Serialized role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    /// Stable identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: String,
    /// Optional login password.
    pub password: Option<String>,
    /// Key directory.
    pub key_path: String,
    /// Creation timestamp.
    pub date_added: DateTime<Utc>,
    /// Free-text comment.
    pub comment: String,
    /// Permitted sudo command groups.
    pub sudo: Vec<SudoRecord>,
}

impl From<&Role> for RoleRecord {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id(),
            name: role.name().as_str().to_owned(),
            password: role.password().map(str::to_owned),
            key_path: role.key_path().as_str().to_owned(),
            date_added: role.date_added(),
            comment: role.comment().to_owned(),
            sudo: role.sudo().iter().map(SudoRecord::from).collect(),
        }
    }
}

/// Serialized permission rule with nested roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    /// Stable identifier.
    pub id: RuleId,
    /// Creation timestamp.
    pub date_added: DateTime<Utc>,
    /// Rule name.
    pub name: String,
    /// Free-text comment.
    pub comment: String,
    /// Directly targeted assets.
    pub asset: Vec<AssetId>,
    /// Targeted asset groups.
    pub asset_group: Vec<AssetGroupId>,
    /// Allowed users.
    pub user: Vec<UserId>,
    /// Allowed user groups.
    pub user_group: Vec<UserGroupId>,
    /// Granted roles.
    pub role: Vec<RoleRecord>,
}

impl From<&ResolvedRule> for RuleRecord {
    fn from(resolved: &ResolvedRule) -> Self {
        let rule = &resolved.rule;
        let members = rule.members();
        Self {
            id: rule.id(),
            date_added: rule.date_added(),
            name: rule.name().as_str().to_owned(),
            comment: rule.comment().to_owned(),
            asset: members.assets.clone(),
            asset_group: members.asset_groups.clone(),
            user: members.users.clone(),
            user_group: members.user_groups.clone(),
            role: resolved.roles.iter().map(RoleRecord::from).collect(),
        }
    }
}

/// Serialized push ledger entry with nested roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRecordView {
    /// Stable identifier.
    pub id: PushId,
    /// Targeted assets.
    pub asset: Vec<AssetId>,
    /// Roles whose credentials were pushed.
    pub role: Vec<RoleRecord>,
    /// Whether the push succeeded.
    pub success: bool,
    /// Collected stdout or diagnostic text.
    pub result: String,
    /// Whether the public key was pushed.
    pub is_public_key: bool,
    /// Whether the password was pushed.
    pub is_password: bool,
    /// Timestamp of the attempt.
    pub date_added: DateTime<Utc>,
}

impl From<&ResolvedPush> for PushRecordView {
    fn from(resolved: &ResolvedPush) -> Self {
        let record = &resolved.record;
        let outcome = record.outcome();
        Self {
            id: record.id(),
            asset: record.assets().to_vec(),
            role: resolved.roles.iter().map(RoleRecord::from).collect(),
            success: outcome.success,
            result: outcome.result.clone(),
            is_public_key: outcome.is_public_key,
            is_password: outcome.is_password,
            date_added: record.date_added(),
        }
    }
}
