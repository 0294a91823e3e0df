use std::str::FromStr;

use bastion_core::AppResult;
use bastion_domain::EntityKind;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::records::{PushRecordView, RoleRecord, RuleRecord, SudoRecord};
use crate::{PushLedgerService, RoleRegistryService, RuleResolverService, SudoService};

/// Full serialized collection for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogListing {
    /// All roles.
    Roles(Vec<RoleRecord>),
    /// All sudo groups.
    Sudos(Vec<SudoRecord>),
    /// All rules with nested roles.
    Rules(Vec<RuleRecord>),
    /// All push ledger entries with nested roles.
    Pushes(Vec<PushRecordView>),
    /// Selector did not name a known kind; serializes as an empty list.
    Unrecognized,
}

impl CatalogListing {
    /// Returns the listed kind, if the selector was recognized.
    #[must_use]
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            Self::Roles(_) => Some(EntityKind::Role),
            Self::Sudos(_) => Some(EntityKind::Sudo),
            Self::Rules(_) => Some(EntityKind::Rule),
            Self::Pushes(_) => Some(EntityKind::PushRecord),
            Self::Unrecognized => None,
        }
    }

    /// Returns the number of listed records.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Roles(records) => records.len(),
            Self::Sudos(records) => records.len(),
            Self::Rules(records) => records.len(),
            Self::Pushes(records) => records.len(),
            Self::Unrecognized => 0,
        }
    }

    /// Returns whether no record is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for CatalogListing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Roles(records) => records.serialize(serializer),
            Self::Sudos(records) => records.serialize(serializer),
            Self::Rules(records) => records.serialize(serializer),
            Self::Pushes(records) => records.serialize(serializer),
            Self::Unrecognized => serializer.collect_seq(std::iter::empty::<()>()),
        }
    }
}

/// Collection-fetch entry point over every permission entity kind.
#[derive(Clone)]
pub struct CatalogService {
    role_registry: RoleRegistryService,
    sudo_service: SudoService,
    rule_resolver: RuleResolverService,
    push_ledger: PushLedgerService,
}

impl CatalogService {
    /// Creates a new catalog over the entity services.
    #[must_use]
    pub fn new(
        role_registry: RoleRegistryService,
        sudo_service: SudoService,
        rule_resolver: RuleResolverService,
        push_ledger: PushLedgerService,
    ) -> Self {
        Self {
            role_registry,
            sudo_service,
            rule_resolver,
            push_ledger,
        }
    }

    /// Returns the full serialized collection of one kind.
    pub async fn list(&self, kind: EntityKind) -> AppResult<CatalogListing> {
        Ok(match kind {
            EntityKind::Role => CatalogListing::Roles(
                self.role_registry
                    .list_roles()
                    .await?
                    .iter()
                    .map(RoleRecord::from)
                    .collect(),
            ),
            EntityKind::Sudo => CatalogListing::Sudos(
                self.sudo_service
                    .list_sudos()
                    .await?
                    .iter()
                    .map(SudoRecord::from)
                    .collect(),
            ),
            EntityKind::Rule => CatalogListing::Rules(
                self.rule_resolver
                    .list_rules()
                    .await?
                    .iter()
                    .map(RuleRecord::from)
                    .collect(),
            ),
            EntityKind::PushRecord => CatalogListing::Pushes(
                self.push_ledger
                    .list_pushes()
                    .await?
                    .iter()
                    .map(PushRecordView::from)
                    .collect(),
            ),
        })
    }

    /// Lists by transport selector; an unknown selector yields an empty listing.
    pub async fn list_by_selector(&self, selector: &str) -> AppResult<CatalogListing> {
        match EntityKind::from_str(selector) {
            Ok(kind) => self.list(kind).await,
            Err(error) => {
                debug!(selector, error = %error, "unknown catalog selector");
                Ok(CatalogListing::Unrecognized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bastion_domain::EntityKind;

    use super::{CatalogListing, CatalogService};
    use crate::access_ports::CreateSudoInput;
    use crate::test_support::{FakeAccessStore, FakeKeyStore, stored_role};
    use crate::{PushLedgerService, RoleRegistryService, RuleResolverService, SudoService};

    fn catalog(store: &Arc<FakeAccessStore>) -> (CatalogService, SudoService) {
        let sudo_service = SudoService::new(store.clone());
        let catalog = CatalogService::new(
            RoleRegistryService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                Arc::new(FakeKeyStore::default()),
            ),
            sudo_service.clone(),
            RuleResolverService::new(store.clone(), store.clone(), store.clone()),
            PushLedgerService::new(store.clone(), store.clone()),
        );
        (catalog, sudo_service)
    }

    #[tokio::test]
    async fn unknown_selector_lists_nothing() {
        let store = Arc::new(FakeAccessStore::default());
        stored_role(&store, "svc-deploy").await;
        let (catalog, _) = catalog(&store);

        let listing = catalog.list_by_selector("PermAsset").await;
        assert!(matches!(listing, Ok(CatalogListing::Unrecognized)));
        assert_eq!(
            serde_json::to_string(&CatalogListing::Unrecognized).ok().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn legacy_selector_lists_sudo_groups() {
        let store = Arc::new(FakeAccessStore::default());
        let (catalog, sudo_service) = catalog(&store);
        let created = sudo_service
            .create_sudo(CreateSudoInput {
                name: "restart-services".to_owned(),
                commands: vec!["systemctl restart nginx".to_owned()],
                comment: String::new(),
            })
            .await;
        assert!(created.is_ok());

        let listing = catalog.list_by_selector("PermSudo").await;
        let Ok(listing) = listing else {
            panic!("listing must succeed");
        };
        assert_eq!(listing.kind(), Some(EntityKind::Sudo));
        assert_eq!(listing.len(), 1);
    }

    #[tokio::test]
    async fn every_kind_is_listable() {
        let store = Arc::new(FakeAccessStore::default());
        stored_role(&store, "svc-deploy").await;
        let (catalog, _) = catalog(&store);

        for kind in EntityKind::all() {
            let listing = catalog.list(*kind).await;
            assert_eq!(listing.ok().and_then(|listing| listing.kind()), Some(*kind));
        }
    }
}
