use std::collections::HashSet;

use async_trait::async_trait;

use bastion_application::{InventoryDirectory, InventoryReferences};
use bastion_core::AppResult;
use bastion_domain::{AssetGroupId, AssetId, UserGroupId, UserId};

use super::{PostgresAccessRepository, persistence_error};

impl PostgresAccessRepository {
    async fn existing_ids(
        &self,
        sql: &'static str,
        candidates: Vec<String>,
    ) -> AppResult<HashSet<String>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = sqlx::query_scalar::<_, String>(sql)
            .bind(candidates)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence_error("look up inventory references"))?;

        Ok(rows.into_iter().collect())
    }

    /// Registers an asset and its group memberships in the inventory tables.
    pub async fn register_asset(&self, asset: &AssetId, groups: &[AssetGroupId]) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(persistence_error("begin transaction"))?;

        sqlx::query("INSERT INTO assets (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(asset.as_str())
            .execute(&mut *transaction)
            .await
            .map_err(persistence_error("register asset"))?;

        for group in groups {
            sqlx::query("INSERT INTO asset_groups (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
                .bind(group.as_str())
                .execute(&mut *transaction)
                .await
                .map_err(persistence_error("register asset group"))?;
            sqlx::query(
                r#"
                INSERT INTO asset_group_assets (asset_group_id, asset_id)
                VALUES ($1, $2)
                ON CONFLICT (asset_group_id, asset_id) DO NOTHING
                "#,
            )
            .bind(group.as_str())
            .bind(asset.as_str())
            .execute(&mut *transaction)
            .await
            .map_err(persistence_error("register asset group membership"))?;
        }

        transaction
            .commit()
            .await
            .map_err(persistence_error("commit transaction"))
    }

    /// Registers a user and its group memberships in the inventory tables.
    pub async fn register_user(&self, user: &UserId, groups: &[UserGroupId]) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(persistence_error("begin transaction"))?;

        sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(user.as_str())
            .execute(&mut *transaction)
            .await
            .map_err(persistence_error("register user"))?;

        for group in groups {
            sqlx::query("INSERT INTO user_groups (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
                .bind(group.as_str())
                .execute(&mut *transaction)
                .await
                .map_err(persistence_error("register user group"))?;
            sqlx::query(
                r#"
                INSERT INTO user_group_users (user_group_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (user_group_id, user_id) DO NOTHING
                "#,
            )
            .bind(group.as_str())
            .bind(user.as_str())
            .execute(&mut *transaction)
            .await
            .map_err(persistence_error("register user group membership"))?;
        }

        transaction
            .commit()
            .await
            .map_err(persistence_error("commit transaction"))
    }
}

#[async_trait]
impl InventoryDirectory for PostgresAccessRepository {
    async fn retain_known(
        &self,
        references: InventoryReferences,
    ) -> AppResult<InventoryReferences> {
        let known_assets = self
            .existing_ids(
                "SELECT id FROM assets WHERE id = ANY($1)",
                references.assets.iter().map(|id| id.as_str().to_owned()).collect(),
            )
            .await?;
        let known_asset_groups = self
            .existing_ids(
                "SELECT id FROM asset_groups WHERE id = ANY($1)",
                references
                    .asset_groups
                    .iter()
                    .map(|id| id.as_str().to_owned())
                    .collect(),
            )
            .await?;
        let known_users = self
            .existing_ids(
                "SELECT id FROM users WHERE id = ANY($1)",
                references.users.iter().map(|id| id.as_str().to_owned()).collect(),
            )
            .await?;
        let known_user_groups = self
            .existing_ids(
                "SELECT id FROM user_groups WHERE id = ANY($1)",
                references
                    .user_groups
                    .iter()
                    .map(|id| id.as_str().to_owned())
                    .collect(),
            )
            .await?;

        Ok(InventoryReferences {
            assets: references
                .assets
                .into_iter()
                .filter(|id| known_assets.contains(id.as_str()))
                .collect(),
            asset_groups: references
                .asset_groups
                .into_iter()
                .filter(|id| known_asset_groups.contains(id.as_str()))
                .collect(),
            users: references
                .users
                .into_iter()
                .filter(|id| known_users.contains(id.as_str()))
                .collect(),
            user_groups: references
                .user_groups
                .into_iter()
                .filter(|id| known_user_groups.contains(id.as_str()))
                .collect(),
        })
    }

    async fn groups_of_user(&self, user: &UserId) -> AppResult<Vec<UserGroupId>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT user_group_id
            FROM user_group_users
            WHERE user_id = $1
            ORDER BY user_group_id
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_error("list user groups"))?
        .into_iter()
        .map(UserGroupId::new)
        .collect()
    }

    async fn groups_of_asset(&self, asset: &AssetId) -> AppResult<Vec<AssetGroupId>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT asset_group_id
            FROM asset_group_assets
            WHERE asset_id = $1
            ORDER BY asset_group_id
            "#,
        )
        .bind(asset.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_error("list asset groups"))?
        .into_iter()
        .map(AssetGroupId::new)
        .collect()
    }

    async fn assets_in_groups(&self, groups: &[AssetGroupId]) -> AppResult<Vec<AssetId>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let group_ids = groups
            .iter()
            .map(|group| group.as_str().to_owned())
            .collect::<Vec<_>>();
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT asset_id
            FROM asset_group_assets
            WHERE asset_group_id = ANY($1)
            GROUP BY asset_id
            ORDER BY MIN(array_position($1, asset_group_id)), asset_id
            "#,
        )
        .bind(group_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_error("list grouped assets"))?
        .into_iter()
        .map(AssetId::new)
        .collect()
    }
}
