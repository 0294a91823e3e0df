mod inputs;
mod inventory;
mod key_store;
mod projections;
mod repositories;

pub use inputs::{CreateRoleInput, CreateSudoInput, RecordPushInput, RuleInput, UpdateRoleInput};
pub use inventory::{InventoryDirectory, InventoryReferences};
pub use key_store::{IssuedKey, KeyStore};
pub use projections::{EffectivePermissions, ResolvedPush, ResolvedRule, RoleDetail};
pub use repositories::{PushRepository, RoleRepository, RuleRepository, SudoRepository};
