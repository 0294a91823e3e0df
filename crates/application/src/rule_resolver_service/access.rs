use std::collections::HashSet;

use bastion_core::{AppError, AppResult};
use bastion_domain::{AssetId, Role, RoleId, UserId};

use super::RuleResolverService;
use crate::access_ports::EffectivePermissions;

impl RuleResolverService {
    /// Returns whether any rule lets the user act as some role against the asset.
    pub async fn resolve_effective_access(&self, user: &UserId, asset: &AssetId) -> AppResult<bool> {
        Ok(!self.effective_roles(user, asset).await?.is_empty())
    }

    /// Returns the roles a user may act as against an asset, in creation order.
    ///
    /// Membership is direct or through user and asset groups; rules with no
    /// existing role or no asset target contribute nothing.
    pub async fn effective_roles(&self, user: &UserId, asset: &AssetId) -> AppResult<Vec<Role>> {
        let user_groups = self.inventory.groups_of_user(user).await?;
        let asset_groups = self.inventory.groups_of_asset(asset).await?;

        let granted = self
            .rule_repository
            .list_rules()
            .await?
            .iter()
            .filter(|rule| rule.grants(user, &user_groups, asset, &asset_groups))
            .flat_map(|rule| rule.role_ids().iter().copied())
            .collect::<HashSet<RoleId>>();

        if granted.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .role_repository
            .list_roles()
            .await?
            .into_iter()
            .filter(|role| granted.contains(&role.id()))
            .collect())
    }

    /// Returns the assets a role reaches and the commands it may run.
    pub async fn effective_permissions(&self, role_id: RoleId) -> AppResult<EffectivePermissions> {
        let role = self
            .role_repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        let rules = self.rule_repository.list_rules_for_role(role_id).await?;

        let mut seen_groups = HashSet::new();
        let asset_groups = rules
            .iter()
            .filter(|rule| rule.is_effective())
            .flat_map(|rule| rule.members().asset_groups.iter().cloned())
            .filter(|group| seen_groups.insert(group.clone()))
            .collect::<Vec<_>>();
        let grouped_assets = if asset_groups.is_empty() {
            Vec::new()
        } else {
            self.inventory.assets_in_groups(&asset_groups).await?
        };

        let mut seen_assets = HashSet::new();
        let assets = rules
            .iter()
            .filter(|rule| rule.is_effective())
            .flat_map(|rule| rule.members().assets.iter().cloned())
            .chain(grouped_assets)
            .filter(|asset| seen_assets.insert(asset.clone()))
            .collect::<Vec<_>>();

        let commands = role
            .commands()
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();

        Ok(EffectivePermissions {
            role,
            assets,
            asset_groups,
            commands,
        })
    }
}
