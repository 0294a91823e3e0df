use async_trait::async_trait;

use bastion_core::AppResult;
use bastion_domain::{PushRecord, Role, RoleId, Rule, RuleId, Sudo, SudoId};

/// Repository port for sudo command groups.
#[async_trait]
pub trait SudoRepository: Send + Sync {
    /// Persists a new sudo group.
    async fn insert_sudo(&self, sudo: &Sudo) -> AppResult<()>;

    /// Returns the groups matching the identifiers; unknown ids are skipped.
    async fn find_sudos(&self, sudo_ids: &[SudoId]) -> AppResult<Vec<Sudo>>;

    /// Lists all groups ordered by creation time.
    async fn list_sudos(&self) -> AppResult<Vec<Sudo>>;

    /// Deletes a group and its role associations. Returns whether it existed.
    async fn delete_sudo(&self, sudo_id: SudoId) -> AppResult<bool>;
}

/// Repository port for roles and their sudo associations.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Persists a role and its sudo associations in one transaction.
    ///
    /// Fails with `AppError::Conflict` when the name is already taken.
    async fn insert_role(&self, role: &Role) -> AppResult<()>;

    /// Replaces password, comment and sudo associations in one transaction.
    async fn update_role(&self, role: &Role) -> AppResult<()>;

    /// Finds a role by identifier.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a role by its unique name.
    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Lists all roles ordered by creation time.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Deletes a role with its sudo and rule memberships, returning the removed role.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;
}

/// Repository port for permission rules.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Persists a rule and its associations in one transaction.
    async fn insert_rule(&self, rule: &Rule) -> AppResult<()>;

    /// Replaces a rule and its associations in one transaction.
    async fn update_rule(&self, rule: &Rule) -> AppResult<()>;

    /// Finds a rule by identifier.
    async fn find_rule(&self, rule_id: RuleId) -> AppResult<Option<Rule>>;

    /// Lists all rules ordered by creation time.
    async fn list_rules(&self) -> AppResult<Vec<Rule>>;

    /// Lists rules binding the given role, ordered by creation time.
    async fn list_rules_for_role(&self, role_id: RoleId) -> AppResult<Vec<Rule>>;

    /// Deletes a rule. Returns whether it existed.
    async fn delete_rule(&self, rule_id: RuleId) -> AppResult<bool>;
}

/// Append-only repository port for the credential push ledger.
#[async_trait]
pub trait PushRepository: Send + Sync {
    /// Appends a ledger entry.
    async fn append_push(&self, record: &PushRecord) -> AppResult<()>;

    /// Lists all ledger entries ordered by time.
    async fn list_pushes(&self) -> AppResult<Vec<PushRecord>>;
}
