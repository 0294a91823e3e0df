use std::env;
use std::path::PathBuf;

use bastion_core::{AppError, AppResult};
use bastion_infrastructure::KeyOwner;

const DEFAULT_KEY_DIR: &str = "/var/lib/bastion/keys";
const DEFAULT_KEY_COMMENT: &str = "bastion";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Environment-driven settings for the admin binary.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub database_url: String,
    pub key_dir: PathBuf,
    pub key_owner: Option<KeyOwner>,
    pub key_comment: String,
    pub max_connections: u32,
}

impl AdminConfig {
    pub fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let key_dir = optional_env("KEY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_DIR));
        let key_owner =
            parse_key_owner(optional_env("KEY_OWNER_UID"), optional_env("KEY_OWNER_GID"))?;
        let key_comment =
            optional_env("KEY_COMMENT").unwrap_or_else(|| DEFAULT_KEY_COMMENT.to_owned());
        let max_connections = parse_env_u32("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;

        if max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            key_dir,
            key_owner,
            key_comment,
            max_connections,
        })
    }
}

/// Owner ids must be given together or not at all.
fn parse_key_owner(uid: Option<String>, gid: Option<String>) -> AppResult<Option<KeyOwner>> {
    match (uid, gid) {
        (None, None) => Ok(None),
        (Some(uid), Some(gid)) => Ok(Some(KeyOwner {
            uid: parse_id("KEY_OWNER_UID", uid.as_str())?,
            gid: parse_id("KEY_OWNER_GID", gid.as_str())?,
        })),
        _ => Err(AppError::Validation(
            "KEY_OWNER_UID and KEY_OWNER_GID must be set together".to_owned(),
        )),
    }
}

fn parse_id(name: &str, value: &str) -> AppResult<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|error| AppError::Validation(format!("invalid {name} value '{value}': {error}")))
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match optional_env(name) {
        Some(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
