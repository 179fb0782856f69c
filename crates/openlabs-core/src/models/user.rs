use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// 16 random bytes, base64-encoded; used to derive the master key
    /// from the login password. Absent on legacy accounts.
    pub key_salt: Option<String>,
    pub public_key: String,
    #[serde(skip_serializing)]
    pub encrypted_private_key: Vec<u8>,
    pub is_admin: bool,
    pub created_at: jiff::Timestamp,
}
