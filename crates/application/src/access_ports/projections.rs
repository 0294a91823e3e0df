use bastion_domain::{AssetGroupId, AssetId, PushRecord, Role, Rule};

/// Role with the assets it is bound to through rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDetail {
    /// The role with resolved sudo groups.
    pub role: Role,
    /// Assets named by rules binding the role.
    pub assets: Vec<AssetId>,
    /// Asset groups named by rules binding the role.
    pub asset_groups: Vec<AssetGroupId>,
}

/// Rule with its role references expanded to full roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRule {
    /// The stored rule.
    pub rule: Rule,
    /// Existing roles bound by the rule, in rule order.
    pub roles: Vec<Role>,
}

/// Push ledger entry with its role references expanded to full roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPush {
    /// The stored ledger entry.
    pub record: PushRecord,
    /// Roles that still exist, in ledger order.
    pub roles: Vec<Role>,
}

/// Everything a role may reach and run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePermissions {
    /// The role with resolved sudo groups.
    pub role: Role,
    /// Assets reachable directly or through a bound asset group.
    pub assets: Vec<AssetId>,
    /// Asset groups bound to the role.
    pub asset_groups: Vec<AssetGroupId>,
    /// Deduplicated commands the role may run with elevated privilege.
    pub commands: Vec<String>,
}
