use std::collections::HashSet;

use bastion_core::{AppError, AppResult, NonEmptyString};
use bastion_domain::{KeyPath, Role, RoleId, Sudo, SudoId, current_timestamp};
use tracing::{info, warn};

use super::RoleRegistryService;
use crate::access_ports::CreateRoleInput;

impl RoleRegistryService {
    /// Issues a keypair and persists a new role with its sudo groups.
    pub async fn create_role(&self, input: CreateRoleInput) -> AppResult<Role> {
        let name = NonEmptyString::new(input.name.trim())
            .map_err(|_| AppError::Validation("role name must not be empty".to_owned()))?;
        self.ensure_name_available(name.as_str()).await?;
        let sudo = self.resolve_sudo(&input.sudo_ids).await?;

        let key_material = input
            .key_material
            .as_deref()
            .filter(|pem| !pem.trim().is_empty());
        let issued = self.key_store.issue(key_material)?;

        let role = Role::new(
            RoleId::new(),
            name,
            input.password,
            issued.key_path.clone(),
            current_timestamp(),
            input.comment,
            sudo,
        );

        if let Err(error) = self.persist_new_role(&role).await {
            self.rollback_key(&issued.key_path);
            return Err(error);
        }

        info!(
            role_id = %role.id(),
            role_name = %role.name(),
            key_path = %role.key_path(),
            fingerprint = %issued.fingerprint,
            sudo_groups = role.sudo().len(),
            "role issued"
        );

        Ok(role)
    }

    pub(super) async fn ensure_name_available(&self, name: &str) -> AppResult<()> {
        if self
            .role_repository
            .find_role_by_name(name)
            .await?
            .is_some()
        {
            return Err(AppError::Validation(format!("role '{name}' already exists")));
        }

        Ok(())
    }

    /// Resolves sudo ids to stored groups, failing on any unknown id.
    pub(super) async fn resolve_sudo(&self, sudo_ids: &[SudoId]) -> AppResult<Vec<Sudo>> {
        let mut seen = HashSet::new();
        let requested = sudo_ids
            .iter()
            .copied()
            .filter(|sudo_id| seen.insert(*sudo_id))
            .collect::<Vec<_>>();

        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let found = self.sudo_repository.find_sudos(&requested).await?;

        let unknown = requested
            .iter()
            .filter(|sudo_id| !found.iter().any(|sudo| sudo.id() == **sudo_id))
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            return Err(AppError::Validation(format!(
                "unknown sudo ids: {}",
                unknown.join(", ")
            )));
        }

        Ok(requested
            .iter()
            .filter_map(|sudo_id| found.iter().find(|sudo| sudo.id() == *sudo_id).cloned())
            .collect())
    }

    /// Inserts the role, retrying once when storage reports a name conflict.
    async fn persist_new_role(&self, role: &Role) -> AppResult<()> {
        match self.role_repository.insert_role(role).await {
            Err(AppError::Conflict(detail)) => {
                warn!(
                    role_name = %role.name(),
                    detail = %detail,
                    "role insert conflicted, retrying once"
                );
                self.ensure_name_available(role.name().as_str()).await?;

                self.role_repository
                    .insert_role(role)
                    .await
                    .map_err(|error| match error {
                        AppError::Conflict(_) => AppError::Validation(format!(
                            "role '{}' already exists",
                            role.name()
                        )),
                        other => other,
                    })
            }
            result => result,
        }
    }

    fn rollback_key(&self, key_path: &KeyPath) {
        if let Err(error) = self.key_store.discard(key_path) {
            warn!(
                key_path = %key_path,
                error = %error,
                "failed to discard key directory of unpersisted role"
            );
        }
    }
}
