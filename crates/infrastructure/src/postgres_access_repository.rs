use sqlx::PgPool;

use bastion_core::AppError;

mod inventory;
mod pushes;
mod roles;
mod rules;
mod sudos;


/// PostgreSQL-backed repository for roles, sudo groups, rules, the push
/// ledger and the inventory tables they reference.
#[derive(Clone)]
pub struct PostgresAccessRepository {
    pool: PgPool,
}

impl PostgresAccessRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn persistence_error(action: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |error| AppError::Persistence(format!("failed to {action}: {error}"))
}
