//! Domain entities and invariants for role credentials and permission rules.

#![forbid(unsafe_code)]

mod clock;
mod entity_kind;
mod ids;
mod push;
mod role;
mod rule;
mod sudo;

pub use clock::current_timestamp;
pub use entity_kind::EntityKind;
pub use ids::{AssetGroupId, AssetId, PushId, RoleId, RuleId, SudoId, UserGroupId, UserId};
pub use push::{PushOutcome, PushRecord};
pub use role::{KeyPath, Role};
pub use rule::{Rule, RuleMembers};
pub use sudo::Sudo;
