use std::fmt::{Display, Formatter};
use std::str::FromStr;

use bastion_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self).map_err(|error| {
                    AppError::Validation(format!("invalid {} '{value}': {error}", $label))
                })
            }
        }
    };
}

macro_rules! inventory_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a validated identifier; surrounding whitespace is trimmed.
            pub fn new(value: impl Into<String>) -> AppResult<Self> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(AppError::Validation(format!(
                        "{} must not be empty",
                        $label
                    )));
                }

                Ok(Self(trimmed.to_owned()))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl TryFrom<String> for $name {
            type Error = AppError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                formatter.write_str(self.0.as_str())
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a role (service account).
    RoleId,
    "role id"
);
uuid_identifier!(
    /// Unique identifier for a sudo command group.
    SudoId,
    "sudo id"
);
uuid_identifier!(
    /// Unique identifier for a permission rule.
    RuleId,
    "rule id"
);
uuid_identifier!(
    /// Unique identifier for a push ledger entry.
    PushId,
    "push id"
);

inventory_identifier!(
    /// Managed target host, owned by the asset inventory.
    AssetId,
    "asset id"
);
inventory_identifier!(
    /// Named collection of hosts, owned by the asset inventory.
    AssetGroupId,
    "asset group id"
);
inventory_identifier!(
    /// Human user allowed to act through the bastion.
    UserId,
    "user id"
);
inventory_identifier!(
    /// Named collection of human users.
    UserGroupId,
    "user group id"
);

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{AssetId, RoleId};

    #[test]
    fn role_id_parses_its_display_form() {
        let role_id = RoleId::new();
        let parsed = RoleId::from_str(role_id.to_string().as_str());
        assert_eq!(parsed.ok(), Some(role_id));
    }

    #[test]
    fn malformed_role_id_is_rejected() {
        assert!(RoleId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn inventory_identifier_is_trimmed() {
        let asset = AssetId::new("  web-01 ");
        assert_eq!(asset.ok().map(String::from).as_deref(), Some("web-01"));
        assert!(AssetId::new("   ").is_err());
    }
}
