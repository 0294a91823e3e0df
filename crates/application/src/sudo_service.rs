use std::sync::Arc;

use bastion_core::{AppError, AppResult};
use bastion_domain::{Sudo, SudoId, current_timestamp};
use tracing::info;

use crate::access_ports::{CreateSudoInput, SudoRepository};

/// Application service for sudo command groups.
#[derive(Clone)]
pub struct SudoService {
    repository: Arc<dyn SudoRepository>,
}

impl SudoService {
    /// Creates a new service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn SudoRepository>) -> Self {
        Self { repository }
    }

    /// Creates a sudo command group.
    pub async fn create_sudo(&self, input: CreateSudoInput) -> AppResult<Sudo> {
        let sudo = Sudo::new(
            SudoId::new(),
            input.name.trim(),
            input.commands,
            current_timestamp(),
            input.comment,
        )?;

        self.repository.insert_sudo(&sudo).await?;

        info!(
            sudo_id = %sudo.id(),
            sudo_name = %sudo.name(),
            commands = sudo.commands().len(),
            "sudo group created"
        );

        Ok(sudo)
    }

    /// Lists all sudo groups in creation order.
    pub async fn list_sudos(&self) -> AppResult<Vec<Sudo>> {
        self.repository.list_sudos().await
    }

    /// Deletes a sudo group and removes it from every role.
    pub async fn delete_sudo(&self, sudo_id: SudoId) -> AppResult<()> {
        if !self.repository.delete_sudo(sudo_id).await? {
            return Err(AppError::NotFound(format!(
                "sudo group '{sudo_id}' was not found"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bastion_core::AppError;
    use bastion_domain::SudoId;

    use super::SudoService;
    use crate::access_ports::CreateSudoInput;
    use crate::test_support::FakeAccessStore;

    fn service() -> SudoService {
        SudoService::new(Arc::new(FakeAccessStore::default()))
    }

    #[tokio::test]
    async fn create_sudo_rejects_blank_name() {
        let result = service()
            .create_sudo(CreateSudoInput {
                name: "  ".to_owned(),
                commands: vec!["uptime".to_owned()],
                comment: String::new(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn created_sudo_is_listed() {
        let service = service();
        let created = service
            .create_sudo(CreateSudoInput {
                name: "restart-services".to_owned(),
                commands: vec!["systemctl restart nginx".to_owned()],
                comment: "web tier".to_owned(),
            })
            .await;
        assert!(created.is_ok());

        let listed = service.list_sudos().await.unwrap_or_default();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name().as_str(), "restart-services");
    }

    #[tokio::test]
    async fn delete_unknown_sudo_is_not_found() {
        let result = service().delete_sudo(SudoId::new()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
