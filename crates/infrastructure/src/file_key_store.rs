//! Filesystem key store.
//!
//! Each issued key lives in its own directory under the store root:
//!
//! ```text
//! <root>/key-<32 hex chars>/id_rsa      mode 0600
//! <root>/key-<32 hex chars>/id_rsa.pub  mode 0644
//! ```
//!
//! Directory names carry 128 random bits and are created with `create_dir`,
//! so two concurrent issuances never share a directory.

use std::fs::{self, DirBuilder, OpenOptions, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use bastion_application::{IssuedKey, KeyStore};
use bastion_core::{AppError, AppResult};
use bastion_domain::KeyPath;
use ssh_key::{HashAlg, LineEnding};
use tracing::{debug, warn};

mod material;


const PRIVATE_KEY_FILE: &str = "id_rsa";
const PUBLIC_KEY_FILE: &str = "id_rsa.pub";
const DIRECTORY_PREFIX: &str = "key-";
const CREATE_ATTEMPTS: usize = 3;

/// Numeric owner applied to issued key directories and files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOwner {
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
}

/// Key store writing OpenSSH keypairs below a root directory.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    root: PathBuf,
    owner: Option<KeyOwner>,
    comment: String,
}

impl FileKeyStore {
    /// Creates a store rooted at `root`; public keys carry `comment`.
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        owner: Option<KeyOwner>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            owner,
            comment: comment.into(),
        }
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Creates the store root when it does not exist yet.
    pub fn ensure_root(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root).map_err(|error| {
            AppError::Persistence(format!(
                "failed to create key root '{}': {error}",
                self.root.display()
            ))
        })
    }

    fn create_key_directory(&self) -> AppResult<PathBuf> {
        for _ in 0..CREATE_ATTEMPTS {
            let directory = self.root.join(directory_name()?);
            match DirBuilder::new().mode(0o755).create(&directory) {
                Ok(()) => {
                    set_mode(&directory, 0o755)?;
                    return Ok(directory);
                }
                Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                    debug!(directory = %directory.display(), "key directory name collided");
                }
                Err(error) => {
                    return Err(AppError::KeyGeneration(format!(
                        "failed to create key directory '{}': {error}",
                        directory.display()
                    )));
                }
            }
        }

        Err(AppError::KeyGeneration(
            "failed to allocate a unique key directory".to_owned(),
        ))
    }

    fn write_key_files(
        &self,
        directory: &Path,
        private_key: &str,
        public_key: &str,
    ) -> AppResult<()> {
        let private_path = directory.join(PRIVATE_KEY_FILE);
        write_file(&private_path, private_key.as_bytes(), 0o600)?;

        let public_path = directory.join(PUBLIC_KEY_FILE);
        write_file(&public_path, format!("{public_key}\n").as_bytes(), 0o644)?;

        if let Some(owner) = self.owner {
            for path in [directory, private_path.as_path(), public_path.as_path()] {
                std::os::unix::fs::chown(path, Some(owner.uid), Some(owner.gid)).map_err(
                    |error| {
                        AppError::KeyGeneration(format!(
                            "failed to change owner of '{}': {error}",
                            path.display()
                        ))
                    },
                )?;
            }
        }

        Ok(())
    }

    /// Resolves a stored key reference, rejecting anything outside the root.
    fn owned_directory(&self, key_path: &KeyPath) -> AppResult<PathBuf> {
        let path = key_path.as_path();
        let is_key_directory = path.parent() == Some(self.root.as_path())
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(DIRECTORY_PREFIX));
        if !is_key_directory {
            return Err(AppError::Validation(format!(
                "key path '{key_path}' is not managed by this key store"
            )));
        }

        Ok(path.to_path_buf())
    }
}

impl KeyStore for FileKeyStore {
    fn issue(&self, private_key_pem: Option<&str>) -> AppResult<IssuedKey> {
        let private_key = match private_key_pem {
            Some(pem) => material::import(pem, self.comment.as_str())?,
            None => material::generate(self.comment.as_str())?,
        };

        let private_openssh = private_key.to_openssh(LineEnding::LF).map_err(|error| {
            AppError::KeyGeneration(format!("failed to encode private key: {error}"))
        })?;
        let public_key = private_key.public_key().to_openssh().map_err(|error| {
            AppError::KeyGeneration(format!("failed to encode public key: {error}"))
        })?;
        let fingerprint = private_key.fingerprint(HashAlg::Sha256).to_string();

        let directory = self.create_key_directory()?;
        if let Err(error) = self.write_key_files(&directory, &private_openssh, &public_key) {
            remove_scratch_directory(&directory);
            return Err(error);
        }

        let key_path = match KeyPath::new(directory.to_string_lossy().into_owned()) {
            Ok(key_path) => key_path,
            Err(error) => {
                remove_scratch_directory(&directory);
                return Err(error);
            }
        };

        debug!(key_path = %key_path, fingerprint = %fingerprint, "key directory written");

        Ok(IssuedKey {
            key_path,
            public_key,
            fingerprint,
        })
    }

    fn discard(&self, key_path: &KeyPath) -> AppResult<()> {
        let directory = self.owned_directory(key_path)?;
        match fs::remove_dir_all(&directory) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AppError::Persistence(format!(
                "failed to remove key directory '{key_path}': {error}"
            ))),
        }
    }

    fn read_public_key(&self, key_path: &KeyPath) -> AppResult<String> {
        let directory = self.owned_directory(key_path)?;
        match fs::read_to_string(directory.join(PUBLIC_KEY_FILE)) {
            Ok(contents) => Ok(contents.trim_end().to_owned()),
            Err(error) if error.kind() == ErrorKind::NotFound => Err(AppError::NotFound(format!(
                "public key for '{key_path}' was not found"
            ))),
            Err(error) => Err(AppError::Persistence(format!(
                "failed to read public key for '{key_path}': {error}"
            ))),
        }
    }
}

/// Returns `key-` followed by 128 OS-random bits in lowercase hex.
fn directory_name() -> AppResult<String> {
    use std::fmt::Write as _;

    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes).map_err(|error| {
        AppError::KeyGeneration(format!("failed to gather key directory entropy: {error}"))
    })?;

    Ok(bytes
        .iter()
        .fold(String::from(DIRECTORY_PREFIX), |mut name, byte| {
            let _ = write!(name, "{byte:02x}");
            name
        }))
}

fn write_file(path: &Path, contents: &[u8], mode: u32) -> AppResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)
        .map_err(|error| {
            AppError::KeyGeneration(format!("failed to create '{}': {error}", path.display()))
        })?;
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .map_err(|error| {
            AppError::KeyGeneration(format!("failed to write '{}': {error}", path.display()))
        })?;

    // The process umask may have narrowed the requested mode.
    set_mode(path, mode)
}

fn set_mode(path: &Path, mode: u32) -> AppResult<()> {
    fs::set_permissions(path, Permissions::from_mode(mode)).map_err(|error| {
        AppError::KeyGeneration(format!(
            "failed to set permissions on '{}': {error}",
            path.display()
        ))
    })
}

fn remove_scratch_directory(directory: &Path) {
    if let Err(error) = fs::remove_dir_all(directory) {
        warn!(
            directory = %directory.display(),
            error = %error,
            "failed to remove partially written key directory"
        );
    }
}
