use std::str::FromStr;

use bastion_core::AppError;
use serde::{Deserialize, Serialize};

/// Kinds of permission entities exposed by collection listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Service-account roles.
    Role,
    /// Sudo command groups.
    Sudo,
    /// Permission rules.
    Rule,
    /// Credential push ledger entries.
    PushRecord,
}

impl EntityKind {
    /// Returns a stable transport value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Sudo => "sudo",
            Self::Rule => "rule",
            Self::PushRecord => "push_record",
        }
    }

    /// Returns all known kinds.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[EntityKind] = &[
            EntityKind::Role,
            EntityKind::Sudo,
            EntityKind::Rule,
            EntityKind::PushRecord,
        ];

        ALL
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    /// Accepts the stable values and the legacy `Perm*` model names.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "role" | "PermRole" => Ok(Self::Role),
            "sudo" | "PermSudo" => Ok(Self::Sudo),
            "rule" | "PermRule" => Ok(Self::Rule),
            "push_record" | "PermPush" => Ok(Self::PushRecord),
            _ => Err(AppError::Validation(format!(
                "unknown entity kind '{value}'"
            ))),
        }
    }
}
