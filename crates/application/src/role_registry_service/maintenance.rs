use std::collections::HashSet;

use bastion_core::{AppError, AppResult};
use bastion_domain::{Role, RoleId};
use tracing::{info, warn};

use super::RoleRegistryService;
use crate::access_ports::{RoleDetail, UpdateRoleInput};

impl RoleRegistryService {
    /// Returns a role with the assets and asset groups bound to it by rules.
    pub async fn get_role(&self, role_id: RoleId) -> AppResult<RoleDetail> {
        let role = self.require_role(role_id).await?;
        let rules = self.rule_repository.list_rules_for_role(role_id).await?;

        let mut seen_assets = HashSet::new();
        let mut seen_groups = HashSet::new();
        let mut assets = Vec::new();
        let mut asset_groups = Vec::new();
        for rule in &rules {
            for asset in &rule.members().assets {
                if seen_assets.insert(asset.clone()) {
                    assets.push(asset.clone());
                }
            }
            for group in &rule.members().asset_groups {
                if seen_groups.insert(group.clone()) {
                    asset_groups.push(group.clone());
                }
            }
        }

        Ok(RoleDetail {
            role,
            assets,
            asset_groups,
        })
    }

    /// Lists all roles in creation order.
    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.role_repository.list_roles().await
    }

    /// Replaces password, comment and sudo groups of a role.
    pub async fn update_role(&self, role_id: RoleId, input: UpdateRoleInput) -> AppResult<Role> {
        let mut role = self.require_role(role_id).await?;
        let sudo = self.resolve_sudo(&input.sudo_ids).await?;

        role.update(input.password, input.comment, sudo);
        self.role_repository.update_role(&role).await?;

        Ok(role)
    }

    /// Deletes a role, its rule memberships and its key directory.
    ///
    /// The role stays deleted even when its key directory cannot be removed.
    pub async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let role = self
            .role_repository
            .delete_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;

        if let Err(error) = self.key_store.discard(role.key_path()) {
            warn!(
                role_id = %role.id(),
                key_path = %role.key_path(),
                error = %error,
                "failed to remove key directory of deleted role"
            );
        }

        info!(
            role_id = %role.id(),
            role_name = %role.name(),
            "role deleted"
        );

        Ok(())
    }

    /// Returns the public key line issued to a role.
    pub async fn public_key(&self, role_id: RoleId) -> AppResult<String> {
        let role = self.require_role(role_id).await?;
        self.key_store.read_public_key(role.key_path())
    }

    async fn require_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.role_repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }
}
