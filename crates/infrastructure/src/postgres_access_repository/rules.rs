use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, Transaction};

use bastion_application::RuleRepository;
use bastion_core::{AppError, AppResult};
use bastion_domain::{
    AssetGroupId, AssetId, RoleId, Rule, RuleId, RuleMembers, UserGroupId, UserId,
};

use super::{PostgresAccessRepository, persistence_error};

#[derive(Debug, FromRow)]
struct RuleRow {
    id: uuid::Uuid,
    name: String,
    comment: String,
    date_added: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct TextMemberRow {
    rule_id: uuid::Uuid,
    member: String,
}

#[derive(Debug, FromRow)]
struct RoleMemberRow {
    rule_id: uuid::Uuid,
    member: uuid::Uuid,
}

/// Text-keyed association tables, in `RuleMembers` field order.
const TEXT_MEMBER_TABLES: [MemberTable; 4] = [
    MemberTable::Assets,
    MemberTable::AssetGroups,
    MemberTable::Users,
    MemberTable::UserGroups,
];

#[derive(Debug, Clone, Copy)]
enum MemberTable {
    Assets,
    AssetGroups,
    Users,
    UserGroups,
}

impl MemberTable {
    fn select_sql(self) -> &'static str {
        match self {
            Self::Assets => {
                "SELECT rule_id, asset_id AS member FROM perm_rule_assets \
                 WHERE rule_id = ANY($1) ORDER BY rule_id, position"
            }
            Self::AssetGroups => {
                "SELECT rule_id, asset_group_id AS member FROM perm_rule_asset_groups \
                 WHERE rule_id = ANY($1) ORDER BY rule_id, position"
            }
            Self::Users => {
                "SELECT rule_id, user_id AS member FROM perm_rule_users \
                 WHERE rule_id = ANY($1) ORDER BY rule_id, position"
            }
            Self::UserGroups => {
                "SELECT rule_id, user_group_id AS member FROM perm_rule_user_groups \
                 WHERE rule_id = ANY($1) ORDER BY rule_id, position"
            }
        }
    }

    fn insert_sql(self) -> &'static str {
        match self {
            Self::Assets => {
                "INSERT INTO perm_rule_assets (rule_id, asset_id, position) \
                 SELECT $1, input.member, (input.ordinality - 1)::INTEGER \
                 FROM UNNEST($2::TEXT[]) WITH ORDINALITY AS input(member, ordinality)"
            }
            Self::AssetGroups => {
                "INSERT INTO perm_rule_asset_groups (rule_id, asset_group_id, position) \
                 SELECT $1, input.member, (input.ordinality - 1)::INTEGER \
                 FROM UNNEST($2::TEXT[]) WITH ORDINALITY AS input(member, ordinality)"
            }
            Self::Users => {
                "INSERT INTO perm_rule_users (rule_id, user_id, position) \
                 SELECT $1, input.member, (input.ordinality - 1)::INTEGER \
                 FROM UNNEST($2::TEXT[]) WITH ORDINALITY AS input(member, ordinality)"
            }
            Self::UserGroups => {
                "INSERT INTO perm_rule_user_groups (rule_id, user_group_id, position) \
                 SELECT $1, input.member, (input.ordinality - 1)::INTEGER \
                 FROM UNNEST($2::TEXT[]) WITH ORDINALITY AS input(member, ordinality)"
            }
        }
    }

    fn delete_sql(self) -> &'static str {
        match self {
            Self::Assets => "DELETE FROM perm_rule_assets WHERE rule_id = $1",
            Self::AssetGroups => "DELETE FROM perm_rule_asset_groups WHERE rule_id = $1",
            Self::Users => "DELETE FROM perm_rule_users WHERE rule_id = $1",
            Self::UserGroups => "DELETE FROM perm_rule_user_groups WHERE rule_id = $1",
        }
    }

    fn values(self, members: &RuleMembers) -> Vec<String> {
        match self {
            Self::Assets => members.assets.iter().map(|id| id.as_str().to_owned()).collect(),
            Self::AssetGroups => members
                .asset_groups
                .iter()
                .map(|id| id.as_str().to_owned())
                .collect(),
            Self::Users => members.users.iter().map(|id| id.as_str().to_owned()).collect(),
            Self::UserGroups => members
                .user_groups
                .iter()
                .map(|id| id.as_str().to_owned())
                .collect(),
        }
    }

    fn push(self, members: &mut RuleMembers, value: String) -> AppResult<()> {
        match self {
            Self::Assets => members.assets.push(AssetId::new(value)?),
            Self::AssetGroups => members.asset_groups.push(AssetGroupId::new(value)?),
            Self::Users => members.users.push(UserId::new(value)?),
            Self::UserGroups => members.user_groups.push(UserGroupId::new(value)?),
        }
        Ok(())
    }
}

impl PostgresAccessRepository {
    async fn hydrate_rules(&self, rows: Vec<RuleRow>) -> AppResult<Vec<Rule>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let rule_ids = rows.iter().map(|row| row.id).collect::<Vec<_>>();
        let mut members_by_rule: HashMap<uuid::Uuid, RuleMembers> = HashMap::new();

        for table in TEXT_MEMBER_TABLES {
            let member_rows = sqlx::query_as::<_, TextMemberRow>(table.select_sql())
                .bind(rule_ids.as_slice())
                .fetch_all(&self.pool)
                .await
                .map_err(persistence_error("load rule members"))?;
            for row in member_rows {
                table.push(members_by_rule.entry(row.rule_id).or_default(), row.member)?;
            }
        }

        let role_rows = sqlx::query_as::<_, RoleMemberRow>(
            r#"
            SELECT rule_id, role_id AS member
            FROM perm_rule_roles
            WHERE rule_id = ANY($1)
            ORDER BY rule_id, position
            "#,
        )
        .bind(rule_ids.as_slice())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_error("load rule roles"))?;
        for row in role_rows {
            members_by_rule
                .entry(row.rule_id)
                .or_default()
                .roles
                .push(RoleId::from_uuid(row.member));
        }

        rows.into_iter()
            .map(|row| {
                let members = members_by_rule.remove(&row.id).unwrap_or_default();
                Rule::new(
                    RuleId::from_uuid(row.id),
                    row.name,
                    row.date_added,
                    row.comment,
                    members,
                )
            })
            .collect()
    }
}

async fn insert_rule_members(
    transaction: &mut Transaction<'_, Postgres>,
    rule: &Rule,
) -> AppResult<()> {
    for table in TEXT_MEMBER_TABLES {
        let values = table.values(rule.members());
        if values.is_empty() {
            continue;
        }
        sqlx::query(table.insert_sql())
            .bind(rule.id().as_uuid())
            .bind(values)
            .execute(&mut **transaction)
            .await
            .map_err(persistence_error("persist rule members"))?;
    }

    let role_ids = rule
        .role_ids()
        .iter()
        .map(RoleId::as_uuid)
        .collect::<Vec<_>>();
    if !role_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO perm_rule_roles (rule_id, role_id, position)
            SELECT $1, input.member, (input.ordinality - 1)::INTEGER
            FROM UNNEST($2::UUID[]) WITH ORDINALITY AS input(member, ordinality)
            "#,
        )
        .bind(rule.id().as_uuid())
        .bind(role_ids)
        .execute(&mut **transaction)
        .await
        .map_err(persistence_error("persist rule roles"))?;
    }

    Ok(())
}

#[async_trait]
impl RuleRepository for PostgresAccessRepository {
    async fn insert_rule(&self, rule: &Rule) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(persistence_error("begin transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO perm_rules (id, name, comment, date_added)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(rule.id().as_uuid())
        .bind(rule.name().as_str())
        .bind(rule.comment())
        .bind(rule.date_added())
        .execute(&mut *transaction)
        .await
        .map_err(persistence_error("insert rule"))?;

        insert_rule_members(&mut transaction, rule).await?;

        transaction
            .commit()
            .await
            .map_err(persistence_error("commit transaction"))?;

        Ok(())
    }

    async fn update_rule(&self, rule: &Rule) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(persistence_error("begin transaction"))?;

        let updated = sqlx::query(
            r#"
            UPDATE perm_rules
            SET name = $2, comment = $3
            WHERE id = $1
            "#,
        )
        .bind(rule.id().as_uuid())
        .bind(rule.name().as_str())
        .bind(rule.comment())
        .execute(&mut *transaction)
        .await
        .map_err(persistence_error("update rule"))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "rule '{}' was not found",
                rule.id()
            )));
        }

        for table in TEXT_MEMBER_TABLES {
            sqlx::query(table.delete_sql())
                .bind(rule.id().as_uuid())
                .execute(&mut *transaction)
                .await
                .map_err(persistence_error("clear rule members"))?;
        }
        sqlx::query("DELETE FROM perm_rule_roles WHERE rule_id = $1")
            .bind(rule.id().as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(persistence_error("clear rule roles"))?;

        insert_rule_members(&mut transaction, rule).await?;

        transaction
            .commit()
            .await
            .map_err(persistence_error("commit transaction"))?;

        Ok(())
    }

    async fn find_rule(&self, rule_id: RuleId) -> AppResult<Option<Rule>> {
        let rows = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT id, name, comment, date_added
            FROM perm_rules
            WHERE id = $1
            "#,
        )
        .bind(rule_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_error("find rule"))?;

        Ok(self.hydrate_rules(rows).await?.into_iter().next())
    }

    async fn list_rules(&self) -> AppResult<Vec<Rule>> {
        let rows = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT id, name, comment, date_added
            FROM perm_rules
            ORDER BY date_added, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_error("list rules"))?;

        self.hydrate_rules(rows).await
    }

    async fn list_rules_for_role(&self, role_id: RoleId) -> AppResult<Vec<Rule>> {
        let rows = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT rules.id, rules.name, rules.comment, rules.date_added
            FROM perm_rules AS rules
            WHERE EXISTS (
                SELECT 1
                FROM perm_rule_roles AS rule_roles
                WHERE rule_roles.rule_id = rules.id
                  AND rule_roles.role_id = $1
            )
            ORDER BY rules.date_added, rules.id
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_error("list rules for role"))?;

        self.hydrate_rules(rows).await
    }

    async fn delete_rule(&self, rule_id: RuleId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM perm_rules WHERE id = $1")
            .bind(rule_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(persistence_error("delete rule"))?;

        Ok(result.rows_affected() > 0)
    }
}
