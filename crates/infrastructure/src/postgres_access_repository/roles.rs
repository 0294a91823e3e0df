use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, Transaction};

use bastion_application::RoleRepository;
use bastion_core::{AppError, AppResult, NonEmptyString};
use bastion_domain::{KeyPath, Role, RoleId, Sudo, SudoId};

use super::{PostgresAccessRepository, persistence_error};

#[derive(Debug, FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    password: Option<String>,
    key_path: String,
    comment: String,
    date_added: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct RoleSudoRow {
    role_id: uuid::Uuid,
    id: uuid::Uuid,
    name: String,
    commands: Vec<String>,
    comment: String,
    date_added: DateTime<Utc>,
}

impl PostgresAccessRepository {
    async fn fetch_roles(&self, condition: RoleCondition<'_>) -> AppResult<Vec<Role>> {
        let query = match condition {
            RoleCondition::All => sqlx::query_as::<_, RoleRow>(
                r#"
                SELECT id, name, password, key_path, comment, date_added
                FROM perm_roles
                ORDER BY date_added, id
                "#,
            ),
            RoleCondition::Id(role_id) => sqlx::query_as::<_, RoleRow>(
                r#"
                SELECT id, name, password, key_path, comment, date_added
                FROM perm_roles
                WHERE id = $1
                "#,
            )
            .bind(role_id.as_uuid()),
            RoleCondition::Name(name) => sqlx::query_as::<_, RoleRow>(
                r#"
                SELECT id, name, password, key_path, comment, date_added
                FROM perm_roles
                WHERE name = $1
                "#,
            )
            .bind(name),
        };

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(persistence_error("load roles"))?;
        self.hydrate_roles(rows).await
    }

    /// Attaches sudo groups, kept in association order, to each role row.
    async fn hydrate_roles(&self, rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let role_ids = rows.iter().map(|row| row.id).collect::<Vec<_>>();
        let sudo_rows = sqlx::query_as::<_, RoleSudoRow>(
            r#"
            SELECT
                role_sudos.role_id,
                sudos.id,
                sudos.name,
                sudos.commands,
                sudos.comment,
                sudos.date_added
            FROM perm_role_sudos AS role_sudos
            INNER JOIN perm_sudos AS sudos
                ON sudos.id = role_sudos.sudo_id
            WHERE role_sudos.role_id = ANY($1)
            ORDER BY role_sudos.role_id, role_sudos.position
            "#,
        )
        .bind(role_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_error("load role sudo groups"))?;

        let mut sudo_by_role: HashMap<uuid::Uuid, Vec<Sudo>> = HashMap::new();
        for row in sudo_rows {
            let sudo = Sudo::new(
                SudoId::from_uuid(row.id),
                row.name,
                row.commands,
                row.date_added,
                row.comment,
            )?;
            sudo_by_role.entry(row.role_id).or_default().push(sudo);
        }

        rows.into_iter()
            .map(|row| {
                let sudo = sudo_by_role.remove(&row.id).unwrap_or_default();
                Ok(Role::new(
                    RoleId::from_uuid(row.id),
                    NonEmptyString::new(row.name)?,
                    row.password,
                    KeyPath::new(row.key_path)?,
                    row.date_added,
                    row.comment,
                    sudo,
                ))
            })
            .collect()
    }
}

enum RoleCondition<'a> {
    All,
    Id(RoleId),
    Name(&'a str),
}

#[async_trait]
impl RoleRepository for PostgresAccessRepository {
    async fn insert_role(&self, role: &Role) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(persistence_error("begin transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO perm_roles (id, name, password, key_path, comment, date_added)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(role.name().as_str())
        .bind(role.password())
        .bind(role.key_path().as_str())
        .bind(role.comment())
        .bind(role.date_added())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, role.name().as_str()))?;

        insert_role_sudos(&mut transaction, role).await?;

        transaction
            .commit()
            .await
            .map_err(persistence_error("commit transaction"))?;

        Ok(())
    }

    async fn update_role(&self, role: &Role) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(persistence_error("begin transaction"))?;

        let updated = sqlx::query(
            r#"
            UPDATE perm_roles
            SET password = $2, comment = $3
            WHERE id = $1
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(role.password())
        .bind(role.comment())
        .execute(&mut *transaction)
        .await
        .map_err(persistence_error("update role"))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "role '{}' was not found",
                role.id()
            )));
        }

        sqlx::query("DELETE FROM perm_role_sudos WHERE role_id = $1")
            .bind(role.id().as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(persistence_error("clear role sudo groups"))?;

        insert_role_sudos(&mut transaction, role).await?;

        transaction
            .commit()
            .await
            .map_err(persistence_error("commit transaction"))?;

        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .fetch_roles(RoleCondition::Id(role_id))
            .await?
            .into_iter()
            .next())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .fetch_roles(RoleCondition::Name(name))
            .await?
            .into_iter()
            .next())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.fetch_roles(RoleCondition::All).await
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let Some(role) = self.find_role(role_id).await? else {
            return Ok(None);
        };

        // Sudo and rule memberships cascade; rules themselves are kept.
        let deleted = sqlx::query("DELETE FROM perm_roles WHERE id = $1")
            .bind(role_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(persistence_error("delete role"))?;

        Ok((deleted.rows_affected() > 0).then_some(role))
    }
}

async fn insert_role_sudos(
    transaction: &mut Transaction<'_, Postgres>,
    role: &Role,
) -> AppResult<()> {
    let sudo_ids = role
        .sudo()
        .iter()
        .map(|sudo| sudo.id().as_uuid())
        .collect::<Vec<_>>();
    if sudo_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO perm_role_sudos (role_id, sudo_id, position)
        SELECT $1, input.sudo_id, (input.ordinality - 1)::INTEGER
        FROM UNNEST($2::UUID[]) WITH ORDINALITY AS input(sudo_id, ordinality)
        "#,
    )
    .bind(role.id().as_uuid())
    .bind(sudo_ids)
    .execute(&mut **transaction)
    .await
    .map_err(persistence_error("persist role sudo groups"))?;

    Ok(())
}

/// Only this unique violation is a name conflict.
const ROLE_NAME_CONSTRAINT: &str = "perm_roles_name_key";

fn map_role_conflict(error: sqlx::Error, role_name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
        && database_error.constraint() == Some(ROLE_NAME_CONSTRAINT)
    {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    AppError::Persistence(format!("failed to insert role: {error}"))
}
