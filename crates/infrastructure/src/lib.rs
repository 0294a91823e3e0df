//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod file_key_store;
mod in_memory_access_repository;
mod postgres_access_repository;

pub use file_key_store::{FileKeyStore, KeyOwner};
pub use in_memory_access_repository::InMemoryAccessRepository;
pub use postgres_access_repository::PostgresAccessRepository;
