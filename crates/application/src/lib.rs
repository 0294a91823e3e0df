//! Application services and ports.

#![forbid(unsafe_code)]

mod access_ports;
mod catalog_service;
mod push_ledger_service;
mod records;
mod role_index;
mod role_registry_service;
mod rule_resolver_service;
mod sudo_service;

#[cfg(test)]
mod test_support;

pub use access_ports::{
    CreateRoleInput, CreateSudoInput, EffectivePermissions, InventoryDirectory,
    InventoryReferences, IssuedKey, KeyStore, PushRepository, RecordPushInput, ResolvedPush,
    ResolvedRule, RoleDetail, RoleRepository, RuleInput, RuleRepository, SudoRepository,
    UpdateRoleInput,
};
pub use catalog_service::{CatalogListing, CatalogService};
pub use push_ledger_service::PushLedgerService;
pub use records::{PushRecordView, RoleRecord, RuleRecord, SudoRecord};
pub use role_registry_service::RoleRegistryService;
pub use rule_resolver_service::RuleResolverService;
pub use sudo_service::SudoService;
