use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use bastion_application::PushRepository;
use bastion_core::AppResult;
use bastion_domain::{AssetId, PushId, PushOutcome, PushRecord, RoleId};

use super::{PostgresAccessRepository, persistence_error};

#[derive(Debug, FromRow)]
struct PushRow {
    id: uuid::Uuid,
    asset_ids: Vec<String>,
    role_ids: Vec<uuid::Uuid>,
    success: bool,
    result: String,
    is_public_key: bool,
    is_password: bool,
    date_added: DateTime<Utc>,
}

impl PushRow {
    fn into_record(self) -> AppResult<PushRecord> {
        let assets = self
            .asset_ids
            .into_iter()
            .map(AssetId::new)
            .collect::<AppResult<Vec<_>>>()?;
        let roles = self.role_ids.into_iter().map(RoleId::from_uuid).collect();

        Ok(PushRecord::new(
            PushId::from_uuid(self.id),
            assets,
            roles,
            PushOutcome {
                success: self.success,
                result: self.result,
                is_public_key: self.is_public_key,
                is_password: self.is_password,
            },
            self.date_added,
        ))
    }
}

#[async_trait]
impl PushRepository for PostgresAccessRepository {
    async fn append_push(&self, record: &PushRecord) -> AppResult<()> {
        let asset_ids = record
            .assets()
            .iter()
            .map(|asset| asset.as_str().to_owned())
            .collect::<Vec<_>>();
        let role_ids = record
            .role_ids()
            .iter()
            .map(RoleId::as_uuid)
            .collect::<Vec<_>>();
        let outcome = record.outcome();

        sqlx::query(
            r#"
            INSERT INTO perm_pushes (
                id, asset_ids, role_ids, success, result, is_public_key, is_password, date_added
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id().as_uuid())
        .bind(asset_ids)
        .bind(role_ids)
        .bind(outcome.success)
        .bind(outcome.result.as_str())
        .bind(outcome.is_public_key)
        .bind(outcome.is_password)
        .bind(record.date_added())
        .execute(&self.pool)
        .await
        .map_err(persistence_error("append push record"))?;

        Ok(())
    }

    async fn list_pushes(&self) -> AppResult<Vec<PushRecord>> {
        sqlx::query_as::<_, PushRow>(
            r#"
            SELECT id, asset_ids, role_ids, success, result, is_public_key, is_password, date_added
            FROM perm_pushes
            ORDER BY date_added, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_error("list push records"))?
        .into_iter()
        .map(PushRow::into_record)
        .collect()
    }
}
