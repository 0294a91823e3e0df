use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rule::dedup_preserving_order;
use crate::{AssetId, PushId, RoleId};

/// Result of one attempt to deploy role credentials to assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushOutcome {
    /// Whether the deployment succeeded.
    pub success: bool,
    /// Collected stdout or diagnostic text.
    pub result: String,
    /// Whether the public key was pushed.
    pub is_public_key: bool,
    /// Whether the password was pushed.
    pub is_password: bool,
}

/// Immutable audit entry for a credential deployment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRecord {
    id: PushId,
    assets: Vec<AssetId>,
    roles: Vec<RoleId>,
    outcome: PushOutcome,
    date_added: DateTime<Utc>,
}

impl PushRecord {
    /// Creates a ledger entry.
    #[must_use]
    pub fn new(
        id: PushId,
        assets: Vec<AssetId>,
        roles: Vec<RoleId>,
        outcome: PushOutcome,
        date_added: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            assets: dedup_preserving_order(assets),
            roles: dedup_preserving_order(roles),
            outcome,
            date_added,
        }
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn id(&self) -> PushId {
        self.id
    }

    /// Returns the targeted assets.
    #[must_use]
    pub fn assets(&self) -> &[AssetId] {
        self.assets.as_slice()
    }

    /// Returns the roles whose credentials were pushed.
    #[must_use]
    pub fn role_ids(&self) -> &[RoleId] {
        self.roles.as_slice()
    }

    /// Returns the recorded outcome.
    #[must_use]
    pub fn outcome(&self) -> &PushOutcome {
        &self.outcome
    }

    /// Returns the timestamp of the attempt.
    #[must_use]
    pub fn date_added(&self) -> DateTime<Utc> {
        self.date_added
    }
}
