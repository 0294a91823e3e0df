//! Role issuance and maintenance.
//!
//! A role is only ever persisted together with a fully written key
//! directory: key issuance happens after input validation and before the
//! storage transaction, and the directory is discarded again whenever the
//! transaction does not commit.

use std::sync::Arc;

use crate::access_ports::{KeyStore, RoleRepository, RuleRepository, SudoRepository};

mod issuance;
mod maintenance;

#[cfg(test)]
mod tests;

/// Application service for the role registry.
#[derive(Clone)]
pub struct RoleRegistryService {
    role_repository: Arc<dyn RoleRepository>,
    sudo_repository: Arc<dyn SudoRepository>,
    rule_repository: Arc<dyn RuleRepository>,
    key_store: Arc<dyn KeyStore>,
}

impl RoleRegistryService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        role_repository: Arc<dyn RoleRepository>,
        sudo_repository: Arc<dyn SudoRepository>,
        rule_repository: Arc<dyn RuleRepository>,
        key_store: Arc<dyn KeyStore>,
    ) -> Self {
        Self {
            role_repository,
            sudo_repository,
            rule_repository,
            key_store,
        }
    }
}
