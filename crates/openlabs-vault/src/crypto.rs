use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use openlabs_core::models::{AwsCredential, AzureCredential, Provider, SecretBundle, SecretRecord};
use rand::RngCore;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::VaultError;

const MASTER_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const SALT_LEN: usize = 16;

/// Fresh 16-byte random salt for a newly registered user.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Deterministic password-based KDF: `derive_master_key(p, salt)` is
/// equal for equal `(p, salt)` — it is not a slow/salted password hash,
/// it is the symmetric key used to unwrap the user's private key.
pub fn derive_master_key(password: &str, salt: &[u8]) -> [u8; MASTER_KEY_LEN] {
    let hk = Hkdf::<Sha256>::new(Some(salt), password.as_bytes());
    let mut key = [0u8; MASTER_KEY_LEN];
    hk.expand(b"openlabs-master-key", &mut key)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    key
}

/// Login password hash, independent of the master-key KDF above —
/// non-deterministic by design, checked with `verify_password`.
pub fn hash_password(password: &str) -> Result<String, VaultError> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, VaultError> {
    Ok(bcrypt::verify(password, hash)?)
}

/// Generates a fresh RSA-2048 keypair and wraps the private key under
/// `master_key`. Returns `(public_key_pem, encrypted_private_key)`.
pub fn generate_keypair(master_key: &[u8; MASTER_KEY_LEN]) -> Result<(String, Vec<u8>), VaultError> {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, 2048)?;
    let public_key = RsaPublicKey::from(&private_key);

    let public_pem = public_key
        .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
        .map_err(|_| VaultError::InvalidEncryptionKey)?;
    let private_der = private_key
        .to_pkcs8_der()
        .map_err(|_| VaultError::InvalidEncryptionKey)?;

    let encrypted_private_key = aes_gcm_encrypt(master_key, private_der.as_bytes())?;
    Ok((public_pem, encrypted_private_key))
}

/// Envelope-encrypts `plaintext` under `public_key_pem`: a fresh AES-256
/// data key encrypts the payload, then the data key is RSA-OAEP wrapped
/// under the public key. Requires no master key — safe to call at any
/// time credentials are uploaded.
pub fn encrypt_for_user(public_key_pem: &str, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
    let public_key =
        RsaPublicKey::from_public_key_pem(public_key_pem).map_err(|_| VaultError::InvalidEncryptionKey)?;

    let mut rng = rand::thread_rng();
    let mut data_key = [0u8; MASTER_KEY_LEN];
    rng.fill_bytes(&mut data_key);

    let payload = aes_gcm_encrypt(&data_key, plaintext)?;
    let wrapped_key = public_key.encrypt(&mut rng, Oaep::new::<Sha256>(), &data_key)?;

    let envelope = Envelope {
        wrapped_key,
        payload,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Reverses `encrypt_for_user`: unwraps the user's private key with
/// `master_key`, RSA-unwraps the data key, then AES-GCM-decrypts the
/// payload.
pub fn decrypt_for_user(
    encrypted_private_key: &[u8],
    master_key: &[u8; MASTER_KEY_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, VaultError> {
    let private_der = aes_gcm_decrypt(master_key, encrypted_private_key)
        .map_err(|_| VaultError::AuthenticationFailure)?;
    let private_key = RsaPrivateKey::from_pkcs8_der(&private_der)
        .map_err(|_| VaultError::AuthenticationFailure)?;

    let envelope: Envelope = serde_json::from_slice(ciphertext)?;
    let data_key = private_key
        .decrypt(Oaep::new::<Sha256>(), &envelope.wrapped_key)
        .map_err(|_| VaultError::AuthenticationFailure)?;
    let data_key: [u8; MASTER_KEY_LEN] = data_key
        .try_into()
        .map_err(|_| VaultError::AuthenticationFailure)?;

    aes_gcm_decrypt(&data_key, &envelope.payload).map_err(|_| VaultError::AuthenticationFailure)
}

/// Decrypts every secret record for a user into a `SecretBundle`.
/// A record whose provider payload fails to decode is skipped rather
/// than failing the whole bundle — partial decryption failures surface
/// as missing credentials, which the caller already treats as
/// `NoCredentials`.
pub fn get_decrypted_secrets(
    encrypted_private_key: &[u8],
    master_key: &[u8; MASTER_KEY_LEN],
    records: &[SecretRecord],
) -> SecretBundle {
    let mut bundle = SecretBundle::default();
    for record in records {
        let Ok(plaintext) = decrypt_for_user(encrypted_private_key, master_key, &record.ciphertext)
        else {
            continue;
        };
        match record.provider {
            Provider::Aws => {
                if let Ok(cred) = serde_json::from_slice::<AwsCredential>(&plaintext) {
                    bundle.aws = Some(cred);
                }
            }
            Provider::Azure => {
                if let Ok(cred) = serde_json::from_slice::<AzureCredential>(&plaintext) {
                    bundle.azure = Some(cred);
                }
            }
        }
    }
    bundle
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Envelope {
    wrapped_key: Vec<u8>,
    payload: Vec<u8>,
}

fn aes_gcm_encrypt(key: &[u8; MASTER_KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| VaultError::InvalidEncryptionKey)?;
    let mut out = nonce_bytes.to_vec();
    out.append(&mut ciphertext);
    Ok(out)
}

fn aes_gcm_decrypt(key: &[u8; MASTER_KEY_LEN], blob: &[u8]) -> Result<Vec<u8>, VaultError> {
    if blob.len() < NONCE_LEN {
        return Err(VaultError::InvalidEncryptionKey);
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| VaultError::InvalidEncryptionKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_key_derivation_is_deterministic() {
        let salt = generate_salt();
        let a = derive_master_key("hunter2", &salt);
        let b = derive_master_key("hunter2", &salt);
        assert_eq!(a, b);
    }

    #[test]
    fn different_passwords_derive_different_keys() {
        let salt = generate_salt();
        let a = derive_master_key("hunter2", &salt);
        let b = derive_master_key("hunter3", &salt);
        assert_ne!(a, b);
    }

    #[test]
    fn envelope_round_trips_through_a_users_keypair() {
        let master_key = derive_master_key("hunter2", &generate_salt());
        let (public_pem, encrypted_private_key) = generate_keypair(&master_key).unwrap();

        let plaintext = br#"{"access_key_id":"AKIA...","secret_access_key":"shh"}"#;
        let ciphertext = encrypt_for_user(&public_pem, plaintext).unwrap();

        let decrypted = decrypt_for_user(&encrypted_private_key, &master_key, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_master_key_fails_to_unwrap_private_key() {
        let master_key = derive_master_key("hunter2", &generate_salt());
        let (public_pem, encrypted_private_key) = generate_keypair(&master_key).unwrap();
        let ciphertext = encrypt_for_user(&public_pem, b"secret").unwrap();

        let wrong_key = derive_master_key("wrong", &generate_salt());
        let result = decrypt_for_user(&encrypted_private_key, &wrong_key, &ciphertext);
        assert!(matches!(result, Err(VaultError::AuthenticationFailure)));
    }
}
