//! Bastion administration binary.
//!
//! ```text
//! bastion-admin migrate
//! bastion-admin list <role|sudo|rule|push_record>
//! bastion-admin access <user> <asset>
//! bastion-admin issue-role <name> [private-key.pem]
//! ```

#![forbid(unsafe_code)]

mod admin_config;

use std::env;
use std::sync::Arc;

use bastion_application::{
    CatalogService, CreateRoleInput, PushLedgerService, RoleRecord, RoleRegistryService,
    RuleResolverService, SudoService,
};
use bastion_core::{AppError, AppResult};
use bastion_domain::{AssetId, UserId};
use bastion_infrastructure::{FileKeyStore, PostgresAccessRepository};
use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::admin_config::AdminConfig;

#[derive(Debug)]
enum Command {
    Migrate,
    List { selector: String },
    Access { user: UserId, asset: AssetId },
    IssueRole { name: String, key_file: Option<String> },
}

#[derive(Clone)]
struct AdminServices {
    roles: RoleRegistryService,
    sudos: SudoService,
    rules: RuleResolverService,
    pushes: PushLedgerService,
}

#[derive(Debug, Serialize)]
struct AccessReport {
    user: UserId,
    asset: AssetId,
    granted: bool,
    roles: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = parse_command(env::args().skip(1).collect())?;
    let config = AdminConfig::load()?;
    debug!(?command, key_dir = %config.key_dir.display(), "admin command parsed");

    let pool = connect_and_migrate(&config).await?;
    if matches!(command, Command::Migrate) {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let key_store = FileKeyStore::new(
        config.key_dir.clone(),
        config.key_owner,
        config.key_comment.clone(),
    );
    key_store.ensure_root()?;
    let services = build_services(pool, key_store);

    match command {
        Command::Migrate => Ok(()),
        Command::List { selector } => {
            let catalog = CatalogService::new(
                services.roles,
                services.sudos,
                services.rules,
                services.pushes,
            );
            let listing = catalog.list_by_selector(selector.as_str()).await?;
            print_json(&listing)
        }
        Command::Access { user, asset } => {
            let roles = services.rules.effective_roles(&user, &asset).await?;
            print_json(&AccessReport {
                granted: !roles.is_empty(),
                roles: roles
                    .iter()
                    .map(|role| role.name().as_str().to_owned())
                    .collect(),
                user,
                asset,
            })
        }
        Command::IssueRole { name, key_file } => {
            let key_material = key_file
                .map(|path| {
                    std::fs::read_to_string(&path).map_err(|error| {
                        AppError::Validation(format!("failed to read key file '{path}': {error}"))
                    })
                })
                .transpose()?;
            let role = services
                .roles
                .create_role(CreateRoleInput {
                    name,
                    password: None,
                    comment: String::new(),
                    sudo_ids: Vec::new(),
                    key_material,
                })
                .await?;
            print_json(&RoleRecord::from(&role))
        }
    }
}

fn parse_command(arguments: Vec<String>) -> AppResult<Command> {
    let arguments = arguments.iter().map(String::as_str).collect::<Vec<_>>();
    match arguments.as_slice() {
        ["migrate"] => Ok(Command::Migrate),
        ["list", selector] => Ok(Command::List {
            selector: (*selector).to_owned(),
        }),
        ["access", user, asset] => Ok(Command::Access {
            user: UserId::new(*user)?,
            asset: AssetId::new(*asset)?,
        }),
        ["issue-role", name] => Ok(Command::IssueRole {
            name: (*name).to_owned(),
            key_file: None,
        }),
        ["issue-role", name, key_file] => Ok(Command::IssueRole {
            name: (*name).to_owned(),
            key_file: Some((*key_file).to_owned()),
        }),
        _ => Err(AppError::Validation(
            "usage: bastion-admin <migrate | list <kind> | access <user> <asset> | \
             issue-role <name> [private-key.pem]>"
                .to_owned(),
        )),
    }
}

fn build_services(pool: PgPool, key_store: FileKeyStore) -> AdminServices {
    let repository = Arc::new(PostgresAccessRepository::new(pool));
    let key_store = Arc::new(key_store);

    AdminServices {
        roles: RoleRegistryService::new(
            repository.clone(),
            repository.clone(),
            repository.clone(),
            key_store,
        ),
        sudos: SudoService::new(repository.clone()),
        rules: RuleResolverService::new(repository.clone(), repository.clone(), repository.clone()),
        pushes: PushLedgerService::new(repository.clone(), repository),
    }
}

async fn connect_and_migrate(config: &AdminConfig) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| {
            AppError::Persistence(format!("failed to connect to database: {error}"))
        })?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Persistence(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

fn print_json(value: &impl Serialize) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|error| AppError::Validation(format!("failed to render output: {error}")))?;
    println!("{rendered}");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bastion_admin=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use bastion_core::AppError;

    use super::{Command, parse_command};

    fn arguments(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn issue_role_accepts_an_optional_key_file() {
        let parsed = parse_command(arguments(&["issue-role", "svc-deploy", "id_rsa"]));
        assert!(matches!(
            parsed,
            Ok(Command::IssueRole { ref name, key_file: Some(ref key_file) })
                if name == "svc-deploy" && key_file == "id_rsa"
        ));
        assert!(matches!(
            parse_command(arguments(&["issue-role", "svc-deploy"])),
            Ok(Command::IssueRole { key_file: None, .. })
        ));
    }

    #[test]
    fn access_validates_identifiers() {
        assert!(matches!(
            parse_command(arguments(&["access", "alice", "web-01"])),
            Ok(Command::Access { .. })
        ));
        assert!(matches!(
            parse_command(arguments(&["access", "alice", " "])),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn unknown_commands_print_usage() {
        let parsed = parse_command(arguments(&["rotate"]));
        let Err(AppError::Validation(message)) = parsed else {
            panic!("unknown command must be rejected");
        };
        assert!(message.starts_with("usage:"));
    }
}
