//! Hand-written fakes shared by the service tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use bastion_core::{AppError, AppResult, NonEmptyString};
use bastion_domain::{
    AssetGroupId, AssetId, KeyPath, PushRecord, Role, RoleId, Rule, RuleId, Sudo, SudoId,
    UserGroupId, UserId, current_timestamp,
};
use tokio::sync::Mutex;

use crate::access_ports::{
    InventoryDirectory, InventoryReferences, IssuedKey, KeyStore, PushRepository, RoleRepository,
    RuleRepository, SudoRepository,
};

#[derive(Default)]
struct AccessState {
    sudos: Vec<Sudo>,
    roles: Vec<Role>,
    rules: Vec<Rule>,
    pushes: Vec<PushRecord>,
}

#[derive(Default)]
struct InventoryState {
    assets: HashSet<AssetId>,
    users: HashSet<UserId>,
    asset_groups: HashMap<AssetGroupId, Vec<AssetId>>,
    user_groups: HashMap<UserGroupId, Vec<UserId>>,
}

/// In-process store implementing every repository port and the inventory port.
#[derive(Default)]
pub(crate) struct FakeAccessStore {
    access: Mutex<AccessState>,
    inventory: Mutex<InventoryState>,
    pending_role_conflicts: AtomicUsize,
    fail_role_inserts: AtomicBool,
    role_insert_attempts: AtomicUsize,
}

impl FakeAccessStore {
    /// Makes the next `count` role inserts report a storage conflict.
    pub(crate) fn inject_role_conflicts(&self, count: usize) {
        self.pending_role_conflicts.store(count, Ordering::SeqCst);
    }

    /// Makes every role insert fail with a persistence error.
    pub(crate) fn fail_role_inserts(&self) {
        self.fail_role_inserts.store(true, Ordering::SeqCst);
    }

    pub(crate) fn role_insert_attempts(&self) -> usize {
        self.role_insert_attempts.load(Ordering::SeqCst)
    }

    /// Stores a role behind the conflict checks, as a concurrent writer would.
    pub(crate) async fn insert_role_unchecked(&self, role: Role) {
        self.access.lock().await.roles.push(role);
    }

    pub(crate) async fn add_asset(&self, asset_id: &str, groups: &[&str]) {
        let mut inventory = self.inventory.lock().await;
        inventory.assets.insert(asset(asset_id));
        for group in groups {
            inventory
                .asset_groups
                .entry(asset_group(group))
                .or_default()
                .push(asset(asset_id));
        }
    }

    pub(crate) async fn add_user(&self, user_id: &str, groups: &[&str]) {
        let mut inventory = self.inventory.lock().await;
        inventory.users.insert(user(user_id));
        for group in groups {
            inventory
                .user_groups
                .entry(user_group(group))
                .or_default()
                .push(user(user_id));
        }
    }

    pub(crate) async fn add_asset_group(&self, group: &str) {
        self.inventory
            .lock()
            .await
            .asset_groups
            .entry(asset_group(group))
            .or_default();
    }
}

#[async_trait]
impl SudoRepository for FakeAccessStore {
    async fn insert_sudo(&self, sudo: &Sudo) -> AppResult<()> {
        self.access.lock().await.sudos.push(sudo.clone());
        Ok(())
    }

    async fn find_sudos(&self, sudo_ids: &[SudoId]) -> AppResult<Vec<Sudo>> {
        Ok(self
            .access
            .lock()
            .await
            .sudos
            .iter()
            .filter(|sudo| sudo_ids.contains(&sudo.id()))
            .cloned()
            .collect())
    }

    async fn list_sudos(&self) -> AppResult<Vec<Sudo>> {
        Ok(self.access.lock().await.sudos.clone())
    }

    async fn delete_sudo(&self, sudo_id: SudoId) -> AppResult<bool> {
        let mut access = self.access.lock().await;
        let before = access.sudos.len();
        access.sudos.retain(|sudo| sudo.id() != sudo_id);
        for role in &mut access.roles {
            role.remove_sudo(sudo_id);
        }
        Ok(access.sudos.len() != before)
    }
}

#[async_trait]
impl RoleRepository for FakeAccessStore {
    async fn insert_role(&self, role: &Role) -> AppResult<()> {
        self.role_insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_role_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("role table unavailable".to_owned()));
        }
        if self
            .pending_role_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pending| {
                pending.checked_sub(1)
            })
            .is_ok()
        {
            return Err(AppError::Conflict(format!(
                "role '{}' conflicts with a concurrent insert",
                role.name()
            )));
        }

        let mut access = self.access.lock().await;
        if access.roles.iter().any(|stored| stored.name() == role.name()) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name()
            )));
        }
        access.roles.push(role.clone());
        Ok(())
    }

    async fn update_role(&self, role: &Role) -> AppResult<()> {
        let mut access = self.access.lock().await;
        let Some(stored) = access
            .roles
            .iter_mut()
            .find(|stored| stored.id() == role.id())
        else {
            return Err(AppError::NotFound(format!(
                "role '{}' was not found",
                role.id()
            )));
        };
        *stored = role.clone();
        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .access
            .lock()
            .await
            .roles
            .iter()
            .find(|role| role.id() == role_id)
            .cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .access
            .lock()
            .await
            .roles
            .iter()
            .find(|role| role.name().as_str() == name)
            .cloned())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.access.lock().await.roles.clone())
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let mut access = self.access.lock().await;
        let Some(position) = access.roles.iter().position(|role| role.id() == role_id) else {
            return Ok(None);
        };
        let removed = access.roles.remove(position);
        for rule in &mut access.rules {
            rule.remove_role(role_id);
        }
        Ok(Some(removed))
    }
}

#[async_trait]
impl RuleRepository for FakeAccessStore {
    async fn insert_rule(&self, rule: &Rule) -> AppResult<()> {
        self.access.lock().await.rules.push(rule.clone());
        Ok(())
    }

    async fn update_rule(&self, rule: &Rule) -> AppResult<()> {
        let mut access = self.access.lock().await;
        if let Some(stored) = access
            .rules
            .iter_mut()
            .find(|stored| stored.id() == rule.id())
        {
            *stored = rule.clone();
        }
        Ok(())
    }

    async fn find_rule(&self, rule_id: RuleId) -> AppResult<Option<Rule>> {
        Ok(self
            .access
            .lock()
            .await
            .rules
            .iter()
            .find(|rule| rule.id() == rule_id)
            .cloned())
    }

    async fn list_rules(&self) -> AppResult<Vec<Rule>> {
        Ok(self.access.lock().await.rules.clone())
    }

    async fn list_rules_for_role(&self, role_id: RoleId) -> AppResult<Vec<Rule>> {
        Ok(self
            .access
            .lock()
            .await
            .rules
            .iter()
            .filter(|rule| rule.role_ids().contains(&role_id))
            .cloned()
            .collect())
    }

    async fn delete_rule(&self, rule_id: RuleId) -> AppResult<bool> {
        let mut access = self.access.lock().await;
        let before = access.rules.len();
        access.rules.retain(|rule| rule.id() != rule_id);
        Ok(access.rules.len() != before)
    }
}

#[async_trait]
impl PushRepository for FakeAccessStore {
    async fn append_push(&self, record: &PushRecord) -> AppResult<()> {
        self.access.lock().await.pushes.push(record.clone());
        Ok(())
    }

    async fn list_pushes(&self) -> AppResult<Vec<PushRecord>> {
        Ok(self.access.lock().await.pushes.clone())
    }
}

#[async_trait]
impl InventoryDirectory for FakeAccessStore {
    async fn retain_known(
        &self,
        references: InventoryReferences,
    ) -> AppResult<InventoryReferences> {
        let inventory = self.inventory.lock().await;
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
            .lock()
            .await
            .user_groups
            .iter()
            .filter(|(_, members)| members.contains(user))
            .map(|(group, _)| group.clone())
            .collect())
    }

    async fn groups_of_asset(&self, asset: &AssetId) -> AppResult<Vec<AssetGroupId>> {
        Ok(self
            .inventory
            .lock()
            .await
            .asset_groups
            .iter()
            .filter(|(_, members)| members.contains(asset))
            .map(|(group, _)| group.clone())
            .collect())
    }

    async fn assets_in_groups(&self, groups: &[AssetGroupId]) -> AppResult<Vec<AssetId>> {
        let inventory = self.inventory.lock().await;
        let mut assets = Vec::new();
        for group in groups {
            for member in inventory.asset_groups.get(group).into_iter().flatten() {
                if !assets.contains(member) {
                    assets.push(member.clone());
                }
            }
        }
        Ok(assets)
    }
}

/// Key store recording issued and discarded directories without touching disk.
#[derive(Default)]
pub(crate) struct FakeKeyStore {
    issued: std::sync::Mutex<Vec<KeyPath>>,
    discarded: std::sync::Mutex<Vec<KeyPath>>,
    fail_discards: AtomicBool,
    materials: std::sync::Mutex<Vec<Option<String>>>,
}

impl FakeKeyStore {
    pub(crate) fn issued(&self) -> Vec<KeyPath> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn discarded(&self) -> Vec<KeyPath> {
        self.discarded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Key material passed to each `issue` call, in order.
    pub(crate) fn materials(&self) -> Vec<Option<String>> {
        self.materials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn fail_discards(&self) {
        self.fail_discards.store(true, Ordering::SeqCst);
    }
}

impl KeyStore for FakeKeyStore {
    fn issue(&self, private_key_pem: Option<&str>) -> AppResult<IssuedKey> {
        self.materials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(private_key_pem.map(str::to_owned));

        if let Some(pem) = private_key_pem
            && !pem.contains("PRIVATE KEY-----")
        {
            return Err(AppError::KeyGeneration(
                "unsupported private key material".to_owned(),
            ));
        }

        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        let key_path = KeyPath::new(format!("/keys/key-{:032x}", issued.len()))?;
        issued.push(key_path.clone());

        Ok(IssuedKey {
            key_path,
            public_key: "ssh-rsa AAAAB3NzaC1yc2E bastion".to_owned(),
            fingerprint: "SHA256:fake".to_owned(),
        })
    }

    fn discard(&self, key_path: &KeyPath) -> AppResult<()> {
        if self.fail_discards.load(Ordering::SeqCst) {
            return Err(AppError::Persistence(format!(
                "failed to remove key directory '{key_path}'"
            )));
        }

        self.discarded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key_path.clone());
        Ok(())
    }

    fn read_public_key(&self, key_path: &KeyPath) -> AppResult<String> {
        if self.discarded().contains(key_path) || !self.issued().contains(key_path) {
            return Err(AppError::NotFound(format!(
                "key directory '{key_path}' was not found"
            )));
        }
        Ok("ssh-rsa AAAAB3NzaC1yc2E bastion".to_owned())
    }
}

pub(crate) fn asset(value: &str) -> AssetId {
    AssetId::new(value).unwrap_or_else(|error| panic!("invalid asset id: {error}"))
}

pub(crate) fn asset_group(value: &str) -> AssetGroupId {
    AssetGroupId::new(value).unwrap_or_else(|error| panic!("invalid asset group id: {error}"))
}

pub(crate) fn user(value: &str) -> UserId {
    UserId::new(value).unwrap_or_else(|error| panic!("invalid user id: {error}"))
}

pub(crate) fn user_group(value: &str) -> UserGroupId {
    UserGroupId::new(value).unwrap_or_else(|error| panic!("invalid user group id: {error}"))
}

/// Builds an unsaved role with a placeholder key directory.
pub(crate) fn role_named(name: &str) -> Role {
    let name = NonEmptyString::new(name).unwrap_or_else(|error| panic!("invalid name: {error}"));
    let key_path = KeyPath::new(format!("/keys/{name}"))
        .unwrap_or_else(|error| panic!("invalid key path: {error}"));
    Role::new(
        RoleId::new(),
        name,
        None,
        key_path,
        current_timestamp(),
        "",
        Vec::new(),
    )
}

/// Stores a role without issuing a key.
pub(crate) async fn stored_role(store: &Arc<FakeAccessStore>, name: &str) -> Role {
    let role = role_named(name);
    store.insert_role_unchecked(role.clone()).await;
    role
}
