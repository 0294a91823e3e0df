use std::sync::Arc;

use bastion_core::{AppError, AppResult};
use bastion_domain::{Rule, RuleId, RuleMembers, current_timestamp};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::access_ports::{
    InventoryDirectory, InventoryReferences, ResolvedRule, RoleRepository, RuleInput,
    RuleRepository,
};
use crate::role_index::RoleIndex;

mod access;


/// Application service for permission rules and access resolution.
#[derive(Clone)]
pub struct RuleResolverService {
    rule_repository: Arc<dyn RuleRepository>,
    role_repository: Arc<dyn RoleRepository>,
    inventory: Arc<dyn InventoryDirectory>,
}

impl RuleResolverService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        rule_repository: Arc<dyn RuleRepository>,
        role_repository: Arc<dyn RoleRepository>,
        inventory: Arc<dyn InventoryDirectory>,
    ) -> Self {
        Self {
            rule_repository,
            role_repository,
            inventory,
        }
    }

    /// Creates a rule; references to unknown entities are dropped.
    pub async fn create_rule(&self, input: RuleInput) -> AppResult<Rule> {
        let rule = self
            .build_rule(RuleId::new(), current_timestamp(), input)
            .await?;
        self.rule_repository.insert_rule(&rule).await?;

        info!(
            rule_id = %rule.id(),
            rule_name = %rule.name(),
            roles = rule.role_ids().len(),
            effective = rule.is_effective(),
            "rule created"
        );

        Ok(rule)
    }

    /// Replaces name, comment and associations of an existing rule.
    pub async fn update_rule(&self, rule_id: RuleId, input: RuleInput) -> AppResult<Rule> {
        let existing = self.require_rule(rule_id).await?;
        let rule = self
            .build_rule(rule_id, existing.date_added(), input)
            .await?;
        self.rule_repository.update_rule(&rule).await?;
        Ok(rule)
    }

    /// Deletes a rule.
    pub async fn delete_rule(&self, rule_id: RuleId) -> AppResult<()> {
        if !self.rule_repository.delete_rule(rule_id).await? {
            return Err(AppError::NotFound(format!("rule '{rule_id}' was not found")));
        }

        Ok(())
    }

    /// Returns one rule with its roles expanded.
    pub async fn get_rule(&self, rule_id: RuleId) -> AppResult<ResolvedRule> {
        let rule = self.require_rule(rule_id).await?;
        let index = RoleIndex::new(self.role_repository.list_roles().await?);
        let roles = index.expand(rule.role_ids());
        Ok(ResolvedRule { rule, roles })
    }

    /// Lists all rules in creation order with their roles expanded.
    pub async fn list_rules(&self) -> AppResult<Vec<ResolvedRule>> {
        let rules = self.rule_repository.list_rules().await?;
        let index = RoleIndex::new(self.role_repository.list_roles().await?);

        Ok(rules
            .into_iter()
            .map(|rule| {
                let roles = index.expand(rule.role_ids());
                ResolvedRule { rule, roles }
            })
            .collect())
    }

    async fn require_rule(&self, rule_id: RuleId) -> AppResult<Rule> {
        self.rule_repository
            .find_rule(rule_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("rule '{rule_id}' was not found")))
    }

    async fn build_rule(
        &self,
        rule_id: RuleId,
        date_added: DateTime<Utc>,
        input: RuleInput,
    ) -> AppResult<Rule> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation(
                "rule name must not be empty".to_owned(),
            ));
        }

        let requested = InventoryReferences {
            assets: input.asset_ids,
            asset_groups: input.asset_group_ids,
            users: input.user_ids,
            user_groups: input.user_group_ids,
        };
        let requested_count = reference_count(&requested) + input.role_ids.len();
        let known = self.inventory.retain_known(requested).await?;

        let index = RoleIndex::new(self.role_repository.list_roles().await?);
        let roles = input
            .role_ids
            .into_iter()
            .filter(|role_id| index.contains(*role_id))
            .collect::<Vec<_>>();

        let kept_count = reference_count(&known) + roles.len();
        if kept_count < requested_count {
            debug!(
                rule_id = %rule_id,
                dropped = requested_count - kept_count,
                "excluded unresolved rule references"
            );
        }

        Rule::new(
            rule_id,
            input.name.trim(),
            date_added,
            input.comment,
            RuleMembers {
                assets: known.assets,
                asset_groups: known.asset_groups,
                users: known.users,
                user_groups: known.user_groups,
                roles,
            },
        )
    }
}

fn reference_count(references: &InventoryReferences) -> usize {
    references.assets.len()
        + references.asset_groups.len()
        + references.users.len()
        + references.user_groups.len()
}
