use bastion_core::AppResult;
use bastion_domain::KeyPath;

/// Keypair written to a fresh key directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedKey {
    /// Directory holding `id_rsa` and `id_rsa.pub`.
    pub key_path: KeyPath,
    /// Public key line in `<algorithm> <base64> <comment>` form.
    pub public_key: String,
    /// SHA-256 fingerprint of the public key.
    pub fingerprint: String,
}

/// Port for issuing and removing role key material.
pub trait KeyStore: Send + Sync {
    /// Generates a 2048-bit RSA keypair, or imports the given PEM private key,
    /// into a new uniquely named directory.
    ///
    /// Fails with `AppError::KeyGeneration` without leaving a directory behind.
    fn issue(&self, private_key_pem: Option<&str>) -> AppResult<IssuedKey>;

    /// Removes a key directory. A directory that is already gone is not an error.
    fn discard(&self, key_path: &KeyPath) -> AppResult<()>;

    /// Reads the public key line stored for a key directory.
    fn read_public_key(&self, key_path: &KeyPath) -> AppResult<String>;
}
