use openlabs_core::models::{Provider, SecretRecord};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(sqlx::FromRow)]
struct SecretRecordRow {
    id: Uuid,
    owner_id: Uuid,
    provider: String,
    ciphertext: Vec<u8>,
    created_at: String,
}

impl TryFrom<SecretRecordRow> for SecretRecord {
    type Error = StoreError;

    fn try_from(row: SecretRecordRow) -> Result<Self, Self::Error> {
        Ok(SecretRecord {
            id: row.id,
            owner_id: row.owner_id,
            provider: parse_provider(&row.provider)?,
            ciphertext: row.ciphertext,
            created_at: row.created_at.parse().map_err(|e: jiff::Error| {
                StoreError::Validation(openlabs_core::error::CoreError::Validation(e.to_string()))
            })?,
        })
    }
}

fn parse_provider(s: &str) -> Result<Provider, StoreError> {
    match s {
        "aws" => Ok(Provider::Aws),
        "azure" => Ok(Provider::Azure),
        other => Err(StoreError::Validation(
            openlabs_core::error::CoreError::Validation(format!("unknown provider: {other}")),
        )),
    }
}

/// Inserts or replaces the secret record for `(owner_id, provider)` —
/// credential upload is update-in-place, not append-only.
pub async fn upsert_secret_record(
    pool: &PgPool,
    owner_id: Uuid,
    provider: Provider,
    ciphertext: &[u8],
) -> Result<SecretRecord, StoreError> {
    let id = Uuid::new_v4();
    let created_at = jiff::Timestamp::now();
    sqlx::query(
        "INSERT INTO secret_records (id, owner_id, provider, ciphertext, created_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (owner_id, provider)
         DO UPDATE SET ciphertext = EXCLUDED.ciphertext, created_at = EXCLUDED.created_at",
    )
    .bind(id)
    .bind(owner_id)
    .bind(provider.as_str())
    .bind(ciphertext)
    .bind(created_at.to_string())
    .execute(pool)
    .await?;

    Ok(SecretRecord {
        id,
        owner_id,
        provider,
        ciphertext: ciphertext.to_vec(),
        created_at,
    })
}

pub async fn list_secret_records(pool: &PgPool, owner_id: Uuid) -> Result<Vec<SecretRecord>, StoreError> {
    let rows = sqlx::query_as::<_, SecretRecordRow>("SELECT * FROM secret_records WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(SecretRecord::try_from).collect()
}
