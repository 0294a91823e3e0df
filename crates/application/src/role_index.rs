use std::collections::HashMap;

use bastion_domain::{Role, RoleId};

/// Lookup table used to expand role references into full roles.
pub(crate) struct RoleIndex {
    by_id: HashMap<RoleId, Role>,
}

impl RoleIndex {
    pub(crate) fn new(roles: Vec<Role>) -> Self {
        Self {
            by_id: roles.into_iter().map(|role| (role.id(), role)).collect(),
        }
    }

    pub(crate) fn contains(&self, role_id: RoleId) -> bool {
        self.by_id.contains_key(&role_id)
    }

    /// Dangling references are skipped.
    pub(crate) fn expand(&self, role_ids: &[RoleId]) -> Vec<Role> {
        role_ids
            .iter()
            .filter_map(|role_id| self.by_id.get(role_id).cloned())
            .collect()
    }
}
