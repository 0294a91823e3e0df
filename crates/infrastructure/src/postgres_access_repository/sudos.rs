use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use bastion_application::SudoRepository;
use bastion_core::AppResult;
use bastion_domain::{Sudo, SudoId};

use super::{PostgresAccessRepository, persistence_error};

#[derive(Debug, FromRow)]
pub(super) struct SudoRow {
    pub(super) id: uuid::Uuid,
    pub(super) name: String,
    pub(super) commands: Vec<String>,
    pub(super) comment: String,
    pub(super) date_added: DateTime<Utc>,
}

impl SudoRow {
    pub(super) fn into_sudo(self) -> AppResult<Sudo> {
        Sudo::new(
            SudoId::from_uuid(self.id),
            self.name,
            self.commands,
            self.date_added,
            self.comment,
        )
    }
}

#[async_trait]
impl SudoRepository for PostgresAccessRepository {
    async fn insert_sudo(&self, sudo: &Sudo) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO perm_sudos (id, name, commands, comment, date_added)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(sudo.id().as_uuid())
        .bind(sudo.name().as_str())
        .bind(sudo.commands())
        .bind(sudo.comment())
        .bind(sudo.date_added())
        .execute(&self.pool)
        .await
        .map_err(persistence_error("insert sudo group"))?;

        Ok(())
    }

    async fn find_sudos(&self, sudo_ids: &[SudoId]) -> AppResult<Vec<Sudo>> {
        let ids = sudo_ids.iter().map(SudoId::as_uuid).collect::<Vec<_>>();
        sqlx::query_as::<_, SudoRow>(
            r#"
            SELECT id, name, commands, comment, date_added
            FROM perm_sudos
            WHERE id = ANY($1)
            ORDER BY date_added, id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_error("find sudo groups"))?
        .into_iter()
        .map(SudoRow::into_sudo)
        .collect()
    }

    async fn list_sudos(&self) -> AppResult<Vec<Sudo>> {
        sqlx::query_as::<_, SudoRow>(
            r#"
            SELECT id, name, commands, comment, date_added
            FROM perm_sudos
            ORDER BY date_added, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_error("list sudo groups"))?
        .into_iter()
        .map(SudoRow::into_sudo)
        .collect()
    }

    async fn delete_sudo(&self, sudo_id: SudoId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM perm_sudos WHERE id = $1")
            .bind(sudo_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(persistence_error("delete sudo group"))?;

        Ok(result.rows_affected() > 0)
    }
}
