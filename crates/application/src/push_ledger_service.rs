use std::sync::Arc;

use bastion_core::AppResult;
use bastion_domain::{PushId, PushOutcome, PushRecord, current_timestamp};
use tracing::info;

use crate::access_ports::{PushRepository, RecordPushInput, ResolvedPush, RoleRepository};
use crate::role_index::RoleIndex;

/// Application service for the append-only credential push ledger.
///
/// The ledger only observes deployments; it never changes roles or rules.
#[derive(Clone)]
pub struct PushLedgerService {
    push_repository: Arc<dyn PushRepository>,
    role_repository: Arc<dyn RoleRepository>,
}

impl PushLedgerService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        push_repository: Arc<dyn PushRepository>,
        role_repository: Arc<dyn RoleRepository>,
    ) -> Self {
        Self {
            push_repository,
            role_repository,
        }
    }

    /// Appends the outcome of a credential push.
    pub async fn record_push(&self, input: RecordPushInput) -> AppResult<PushRecord> {
        let record = PushRecord::new(
            PushId::new(),
            input.asset_ids,
            input.role_ids,
            PushOutcome {
                success: input.success,
                result: input.result,
                is_public_key: input.is_public_key,
                is_password: input.is_password,
            },
            current_timestamp(),
        );

        self.push_repository.append_push(&record).await?;

        info!(
            push_id = %record.id(),
            assets = record.assets().len(),
            roles = record.role_ids().len(),
            success = record.outcome().success,
            "credential push recorded"
        );

        Ok(record)
    }

    /// Lists ledger entries in time order with their roles expanded.
    pub async fn list_pushes(&self) -> AppResult<Vec<ResolvedPush>> {
        let records = self.push_repository.list_pushes().await?;
        let index = RoleIndex::new(self.role_repository.list_roles().await?);

        Ok(records
            .into_iter()
            .map(|record| {
                let roles = index.expand(record.role_ids());
                ResolvedPush { record, roles }
            })
            .collect())
    }
}
