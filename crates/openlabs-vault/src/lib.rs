//! openlabs-vault
//!
//! Per-user envelope-encrypted cloud credentials. Derives a deterministic
//! master key from a password and a per-user salt, uses it to unwrap an
//! RSA private key, and uses that private key to decrypt secret bundles
//! uploaded under the matching public key. The vault never sees HTTP —
//! cookie handling lives in openlabs-api.

pub mod crypto;
pub mod error;
pub mod jwt;

pub use error::VaultError;
