use bastion_domain::{AssetGroupId, AssetId, RoleId, SudoId, UserGroupId, UserId};

/// Input payload for creating a sudo command group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSudoInput {
    /// Group name.
    pub name: String,
    /// Ordered commands the group permits.
    pub commands: Vec<String>,
    /// Free-text comment.
    pub comment: String,
}

/// Input payload for issuing a new role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name.
    pub name: String,
    /// Optional login password for the service account.
    pub password: Option<String>,
    /// Free-text comment.
    pub comment: String,
    /// Sudo groups the role may use; every id must exist.
    pub sudo_ids: Vec<SudoId>,
    /// PEM-encoded private key to import instead of generating one.
    pub key_material: Option<String>,
}

/// Input payload replacing the mutable settings of a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// Optional login password for the service account.
    pub password: Option<String>,
    /// Free-text comment.
    pub comment: String,
    /// Sudo groups the role may use; every id must exist.
    pub sudo_ids: Vec<SudoId>,
}

/// Input payload for creating or replacing a permission rule.
///
/// Identifiers that do not resolve to existing entities are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleInput {
    /// Rule name.
    pub name: String,
    /// Free-text comment.
    pub comment: String,
    /// Directly targeted assets.
    pub asset_ids: Vec<AssetId>,
    /// Targeted asset groups.
    pub asset_group_ids: Vec<AssetGroupId>,
    /// Users allowed to use the rule.
    pub user_ids: Vec<UserId>,
    /// User groups allowed to use the rule.
    pub user_group_ids: Vec<UserGroupId>,
    /// Roles granted by the rule.
    pub role_ids: Vec<RoleId>,
}

/// Input payload for recording a credential push attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPushInput {
    /// Assets the credentials were pushed to.
    pub asset_ids: Vec<AssetId>,
    /// Roles whose credentials were pushed.
    pub role_ids: Vec<RoleId>,
    /// Whether the push succeeded.
    pub success: bool,
    /// Collected stdout or diagnostic text.
    pub result: String,
    /// Whether the public key was pushed.
    pub is_public_key: bool,
    /// Whether the password was pushed.
    pub is_password: bool,
}
