use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use bastion_application::{
    InventoryDirectory, InventoryReferences, PushRepository, RoleRepository, RuleRepository,
    SudoRepository,
};
use bastion_core::{AppError, AppResult};
use bastion_domain::{
    AssetGroupId, AssetId, PushRecord, Role, RoleId, Rule, RuleId, Sudo, SudoId, UserGroupId,
    UserId,
};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;


#[derive(Debug, Default)]
struct Inventory {
    assets: HashSet<AssetId>,
    users: HashSet<UserId>,
    asset_groups: BTreeMap<AssetGroupId, BTreeSet<AssetId>>,
    user_groups: BTreeMap<UserGroupId, BTreeSet<UserId>>,
}

/// In-memory implementation of the access repositories and inventory.
#[derive(Debug, Default)]
pub struct InMemoryAccessRepository {
    sudos: RwLock<HashMap<SudoId, Sudo>>,
    roles: RwLock<HashMap<RoleId, Role>>,
    rules: RwLock<HashMap<RuleId, Rule>>,
    pushes: RwLock<Vec<PushRecord>>,
    inventory: RwLock<Inventory>,
}

impl InMemoryAccessRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an asset and its group memberships.
    pub async fn register_asset(&self, asset: &AssetId, groups: &[AssetGroupId]) -> AppResult<()> {
        let mut inventory = self.inventory.write().await;
        inventory.assets.insert(asset.clone());
        for group in groups {
            inventory
                .asset_groups
                .entry(group.clone())
                .or_default()
                .insert(asset.clone());
        }
        Ok(())
    }

    /// Registers a user and its group memberships.
    pub async fn register_user(&self, user: &UserId, groups: &[UserGroupId]) -> AppResult<()> {
        let mut inventory = self.inventory.write().await;
        inventory.users.insert(user.clone());
        for group in groups {
            inventory
                .user_groups
                .entry(group.clone())
                .or_default()
                .insert(user.clone());
        }
        Ok(())
    }

    async fn ensure_sudos_exist(&self, role: &Role) -> AppResult<()> {
        let sudos = self.sudos.read().await;
        if let Some(missing) = role
            .sudo_ids()
            .into_iter()
            .find(|sudo_id| !sudos.contains_key(sudo_id))
        {
            return Err(AppError::Persistence(format!(
                "role '{}' references missing sudo group '{missing}'",
                role.name()
            )));
        }
        Ok(())
    }

    async fn ensure_roles_exist(&self, rule: &Rule) -> AppResult<()> {
        let roles = self.roles.read().await;
        if let Some(missing) = rule
            .role_ids()
            .iter()
            .find(|role_id| !roles.contains_key(role_id))
        {
            return Err(AppError::Persistence(format!(
                "rule '{}' references missing role '{missing}'",
                rule.name()
            )));
        }
        Ok(())
    }
}

/// Collects values ordered by creation time, then identifier.
fn sorted_by_creation<T>(
    values: impl Iterator<Item = T>,
    key: impl Fn(&T) -> (DateTime<Utc>, uuid::Uuid),
) -> Vec<T> {
    let mut values = values.collect::<Vec<_>>();
    values.sort_by_key(key);
    values
}

#[async_trait]
impl SudoRepository for InMemoryAccessRepository {
    async fn insert_sudo(&self, sudo: &Sudo) -> AppResult<()> {
        let mut sudos = self.sudos.write().await;
        if sudos.contains_key(&sudo.id()) {
            return Err(AppError::Conflict(format!(
                "sudo group '{}' already exists",
                sudo.id()
            )));
        }
        sudos.insert(sudo.id(), sudo.clone());
        Ok(())
    }

    async fn find_sudos(&self, sudo_ids: &[SudoId]) -> AppResult<Vec<Sudo>> {
        let sudos = self.sudos.read().await;
        Ok(sorted_by_creation(
            sudo_ids
                .iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .filter_map(|sudo_id| sudos.get(sudo_id).cloned()),
            |sudo| (sudo.date_added(), sudo.id().as_uuid()),
        ))
    }

    async fn list_sudos(&self) -> AppResult<Vec<Sudo>> {
        Ok(sorted_by_creation(
            self.sudos.read().await.values().cloned(),
            |sudo| (sudo.date_added(), sudo.id().as_uuid()),
        ))
    }

    async fn delete_sudo(&self, sudo_id: SudoId) -> AppResult<bool> {
        let mut sudos = self.sudos.write().await;
        if sudos.remove(&sudo_id).is_none() {
            return Ok(false);
        }

        for role in self.roles.write().await.values_mut() {
            role.remove_sudo(sudo_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl RoleRepository for InMemoryAccessRepository {
    async fn insert_role(&self, role: &Role) -> AppResult<()> {
        self.ensure_sudos_exist(role).await?;

        let mut roles = self.roles.write().await;
        if roles
            .values()
            .any(|stored| stored.name() == role.name() || stored.id() == role.id())
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name()
            )));
        }
        roles.insert(role.id(), role.clone());
        Ok(())
    }

    async fn update_role(&self, role: &Role) -> AppResult<()> {
        self.ensure_sudos_exist(role).await?;

        let mut roles = self.roles.write().await;
        let Some(stored) = roles.get_mut(&role.id()) else {
            return Err(AppError::NotFound(format!(
                "role '{}' was not found",
                role.id()
            )));
        };
        stored.update(
            role.password().map(str::to_owned),
            role.comment(),
            role.sudo().to_vec(),
        );
        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.roles.read().await.get(&role_id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .find(|role| role.name().as_str() == name)
            .cloned())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(sorted_by_creation(
            self.roles.read().await.values().cloned(),
            |role| (role.date_added(), role.id().as_uuid()),
        ))
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let Some(removed) = self.roles.write().await.remove(&role_id) else {
            return Ok(None);
        };

        for rule in self.rules.write().await.values_mut() {
            rule.remove_role(role_id);
        }
        Ok(Some(removed))
    }
}

#[async_trait]
impl RuleRepository for InMemoryAccessRepository {
    async fn insert_rule(&self, rule: &Rule) -> AppResult<()> {
        self.ensure_roles_exist(rule).await?;

        let mut rules = self.rules.write().await;
        if rules.contains_key(&rule.id()) {
            return Err(AppError::Conflict(format!(
                "rule '{}' already exists",
                rule.id()
            )));
        }
        rules.insert(rule.id(), rule.clone());
        Ok(())
    }

    async fn update_rule(&self, rule: &Rule) -> AppResult<()> {
        self.ensure_roles_exist(rule).await?;

        let mut rules = self.rules.write().await;
        let Some(stored) = rules.get_mut(&rule.id()) else {
            return Err(AppError::NotFound(format!(
                "rule '{}' was not found",
                rule.id()
            )));
        };
        *stored = rule.clone();
        Ok(())
    }

    async fn find_rule(&self, rule_id: RuleId) -> AppResult<Option<Rule>> {
        Ok(self.rules.read().await.get(&rule_id).cloned())
    }

    async fn list_rules(&self) -> AppResult<Vec<Rule>> {
        Ok(sorted_by_creation(
            self.rules.read().await.values().cloned(),
            |rule| (rule.date_added(), rule.id().as_uuid()),
        ))
    }

    async fn list_rules_for_role(&self, role_id: RoleId) -> AppResult<Vec<Rule>> {
        Ok(sorted_by_creation(
            self.rules
                .read()
                .await
                .values()
                .filter(|rule| rule.role_ids().contains(&role_id))
                .cloned(),
            |rule| (rule.date_added(), rule.id().as_uuid()),
        ))
    }

    async fn delete_rule(&self, rule_id: RuleId) -> AppResult<bool> {
        Ok(self.rules.write().await.remove(&rule_id).is_some())
    }
}

#[async_trait]
impl PushRepository for InMemoryAccessRepository {
    async fn append_push(&self, record: &PushRecord) -> AppResult<()> {
        self.pushes.write().await.push(record.clone());
        Ok(())
    }

    async fn list_pushes(&self) -> AppResult<Vec<PushRecord>> {
        Ok(sorted_by_creation(
            self.pushes.read().await.iter().cloned(),
            |record| (record.date_added(), record.id().as_uuid()),
        ))
    }
}

#[async_trait]
impl InventoryDirectory for InMemoryAccessRepository {
    async fn retain_known(
        &self,
        references: InventoryReferences,
    ) -> AppResult<InventoryReferences> {
        let inventory = self.inventory.read().await;
        Ok(InventoryReferences {
            assets: references
                .assets
                .into_iter()
                .filter(|asset| inventory.assets.contains(asset))
                .collect(),
            asset_groups: references
                .asset_groups
                .into_iter()
                .filter(|group| inventory.asset_groups.contains_key(group))
                .collect(),
            users: references
                .users
                .into_iter()
                .filter(|user| inventory.users.contains(user))
                .collect(),
            user_groups: references
                .user_groups
                .into_iter()
                .filter(|group| inventory.user_groups.contains_key(group))
                .collect(),
        })
    }

    async fn groups_of_user(&self, user: &UserId) -> AppResult<Vec<UserGroupId>> {
        Ok(self
            .inventory
            .read()
            .await
            .user_groups
            .iter()
            .filter_map(|(group, members)| members.contains(user).then(|| group.clone()))
            .collect())
    }

    async fn groups_of_asset(&self, asset: &AssetId) -> AppResult<Vec<AssetGroupId>> {
        Ok(self
            .inventory
            .read()
            .await
            .asset_groups
            .iter()
            .filter_map(|(group, members)| members.contains(asset).then(|| group.clone()))
            .collect())
    }

    async fn assets_in_groups(&self, groups: &[AssetGroupId]) -> AppResult<Vec<AssetId>> {
        let inventory = self.inventory.read().await;
        let mut seen = HashSet::new();
        Ok(groups
            .iter()
            .filter_map(|group| inventory.asset_groups.get(group))
            .flatten()
            .filter(|asset| seen.insert((*asset).clone()))
            .cloned()
            .collect())
    }
}
