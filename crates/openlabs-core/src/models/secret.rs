use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::provider::Provider;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SecretRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub provider: Provider,
    /// Envelope-encrypted credential payload; opaque outside the vault.
    #[serde(skip_serializing)]
    pub ciphertext: Vec<u8>,
    pub created_at: jiff::Timestamp,
}

/// Decrypted per-provider credential struct. Never serialized to disk or
/// logged — only held in memory for the lifetime of a request or job.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AzureCredential {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub subscription_id: String,
}

/// Bundle of every credential a user currently has on file, decrypted
/// with a request-scoped master key. Returned by `get_decrypted_secrets`.
#[derive(Debug, Clone, Default)]
pub struct SecretBundle {
    pub aws: Option<AwsCredential>,
    pub azure: Option<AzureCredential>,
}

impl SecretBundle {
    pub fn has_secrets(&self, provider: Provider) -> bool {
        match provider {
            Provider::Aws => self.aws.is_some(),
            Provider::Azure => self.azure.is_some(),
        }
    }

    /// Environment variables to inject into the provisioner subprocess
    /// for the given provider. Empty if the bundle lacks that provider's
    /// credentials.
    pub fn cred_env_vars(&self, provider: Provider) -> Vec<(String, String)> {
        match provider {
            Provider::Aws => match &self.aws {
                Some(cred) => vec![
                    ("AWS_ACCESS_KEY_ID".to_string(), cred.access_key_id.clone()),
                    (
                        "AWS_SECRET_ACCESS_KEY".to_string(),
                        cred.secret_access_key.clone(),
                    ),
                ],
                None => vec![],
            },
            Provider::Azure => match &self.azure {
                Some(cred) => vec![
                    ("ARM_CLIENT_ID".to_string(), cred.client_id.clone()),
                    ("ARM_CLIENT_SECRET".to_string(), cred.client_secret.clone()),
                    ("ARM_TENANT_ID".to_string(), cred.tenant_id.clone()),
                    (
                        "ARM_SUBSCRIPTION_ID".to_string(),
                        cred.subscription_id.clone(),
                    ),
                ],
                None => vec![],
            },
        }
    }
}
