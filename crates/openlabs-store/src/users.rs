use openlabs_core::models::User;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    key_salt: Option<String>,
    public_key: String,
    encrypted_private_key: Vec<u8>,
    is_admin: bool,
    created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            key_salt: row.key_salt,
            public_key: row.public_key,
            encrypted_private_key: row.encrypted_private_key,
            is_admin: row.is_admin,
            created_at: row
                .created_at
                .parse()
                .map_err(|e: jiff::Error| StoreError::Validation(openlabs_core::error::CoreError::Validation(e.to_string())))?,
        })
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    password_hash: &str,
    key_salt: &str,
    public_key: &str,
    encrypted_private_key: &[u8],
    is_admin: bool,
) -> Result<User, StoreError> {
    let id = Uuid::new_v4();
    let created_at = jiff::Timestamp::now();
    sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, key_salt, public_key, encrypted_private_key, is_admin, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(id)
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .bind(key_salt)
    .bind(public_key)
    .bind(encrypted_private_key)
    .bind(is_admin)
    .bind(created_at.to_string())
    .execute(pool)
    .await?;

    get_user_by_id(pool, id)
        .await?
        .ok_or(StoreError::NotFound(id))
}

pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, StoreError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    row.map(User::try_from).transpose()
}

pub async fn get_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, StoreError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(User::try_from).transpose()
}

/// Seeds the configured admin account if it does not already exist.
/// Supplements the original's `create_admin.py` bootstrap script —
/// called once at API/worker startup.
pub async fn seed_admin_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    password_hash: &str,
    key_salt: &str,
    public_key: &str,
    encrypted_private_key: &[u8],
) -> Result<(), StoreError> {
    if get_user_by_email(pool, email).await?.is_some() {
        return Ok(());
    }
    create_user(
        pool,
        email,
        name,
        password_hash,
        key_salt,
        public_key,
        encrypted_private_key,
        true,
    )
    .await?;
    Ok(())
}
