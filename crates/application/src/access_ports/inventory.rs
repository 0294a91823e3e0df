use async_trait::async_trait;

use bastion_core::AppResult;
use bastion_domain::{AssetGroupId, AssetId, UserGroupId, UserId};

/// References into the asset and user inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryReferences {
    /// Asset identifiers.
    pub assets: Vec<AssetId>,
    /// Asset group identifiers.
    pub asset_groups: Vec<AssetGroupId>,
    /// User identifiers.
    pub users: Vec<UserId>,
    /// User group identifiers.
    pub user_groups: Vec<UserGroupId>,
}

/// Read-only port onto the inventory owned by the asset and user collaborators.
#[async_trait]
pub trait InventoryDirectory: Send + Sync {
    /// Returns the subset of references that exist, keeping input order.
    async fn retain_known(
        &self,
        references: InventoryReferences,
    ) -> AppResult<InventoryReferences>;

    /// Lists the groups a user belongs to.
    async fn groups_of_user(&self, user: &UserId) -> AppResult<Vec<UserGroupId>>;

    /// Lists the groups an asset belongs to.
    async fn groups_of_asset(&self, asset: &AssetId) -> AppResult<Vec<AssetGroupId>>;

    /// Lists the assets contained in any of the given groups.
    async fn assets_in_groups(&self, groups: &[AssetGroupId]) -> AppResult<Vec<AssetId>>;
}
