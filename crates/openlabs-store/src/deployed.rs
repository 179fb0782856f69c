use openlabs_core::models::{DeployedHost, DeployedRange, DeployedSubnet, DeployedVpc, Provider, RangeState};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedRangeHeader {
    pub id: Uuid,
    pub name: String,
    pub provider: Provider,
    pub region: String,
    pub state: RangeState,
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

/// Inserts a Deployed Range with its own copy of the topology (not a
/// foreign key back to the blueprint — the deployed graph can diverge,
/// e.g. once private IPs are assigned). Called once per successful
/// `apply`; id collisions (a retried worker job) are the caller's
/// responsibility to check before calling this.
pub async fn create_deployed_range(pool: &PgPool, range: &DeployedRange) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO deployed_ranges
            (id, name, provider, region, owner_id, blueprint_range_id, provider_resource_ids,
             state_blob, private_ssh_key, state, deployed_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(range.id)
    .bind(&range.name)
    .bind(range.provider.as_str())
    .bind(&range.region)
    .bind(range.owner_id)
    .bind(range.blueprint_range_id)
    .bind(&range.provider_resource_ids)
    .bind(&range.state_blob)
    .bind(&range.private_ssh_key)
    .bind(range.state.as_str())
    .bind(range.deployed_at.to_string())
    .execute(&mut *tx)
    .await?;

    for vpc in &range.vpcs {
        sqlx::query(
            "INSERT INTO deployed_vpcs (id, name, cidr, parent_range_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(vpc.id)
        .bind(&vpc.name)
        .bind(vpc.cidr.to_string())
        .bind(range.id)
        .execute(&mut *tx)
        .await?;

        for subnet in &vpc.subnets {
            sqlx::query(
                "INSERT INTO deployed_subnets (id, name, cidr, parent_vpc_id) VALUES ($1, $2, $3, $4)",
            )
            .bind(subnet.id)
            .bind(&subnet.name)
            .bind(subnet.cidr.to_string())
            .bind(vpc.id)
            .execute(&mut *tx)
            .await?;

            for host in &subnet.hosts {
                sqlx::query(
                    "INSERT INTO deployed_hosts (id, hostname, os, spec, private_ip, parent_subnet_id)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(host.id)
                .bind(&host.hostname)
                .bind(&host.os)
                .bind(&host.spec)
                .bind(&host.private_ip)
                .bind(subnet.id)
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    tx.commit().await?;
    Ok(())
}

pub async fn list_deployed_range_headers(
    pool: &PgPool,
    owner: Option<Uuid>,
) -> Result<Vec<DeployedRangeHeader>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: Uuid,
        name: String,
        provider: String,
        region: String,
        state: String,
    }

    let rows = match owner {
        Some(owner_id) => sqlx::query_as::<_, Row>(
            "SELECT id, name, provider, region, state FROM deployed_ranges WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await?,
        None => {
            sqlx::query_as::<_, Row>("SELECT id, name, provider, region, state FROM deployed_ranges")
                .fetch_all(pool)
                .await?
        }
    };

    rows.into_iter()
        .map(|r| {
            Ok(DeployedRangeHeader {
                id: r.id,
                name: r.name,
                provider: parse_provider(&r.provider)?,
                region: r.region,
                state: r.state.parse().map_err(StoreError::Validation)?,
            })
        })
        .collect()
}

pub async fn get_deployed_range(
    pool: &PgPool,
    id: Uuid,
    owner: Option<Uuid>,
) -> Result<Option<DeployedRange>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct RangeRow {
        id: Uuid,
        name: String,
        provider: String,
        region: String,
        owner_id: Uuid,
        blueprint_range_id: Uuid,
        provider_resource_ids: serde_json::Value,
        state_blob: Option<Vec<u8>>,
        private_ssh_key: Option<Vec<u8>>,
        state: String,
        deployed_at: String,
    }

    let Some(row) = sqlx::query_as::<_, RangeRow>("SELECT * FROM deployed_ranges WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    if let Some(owner_id) = owner {
        if row.owner_id != owner_id {
            return Ok(None);
        }
    }

    #[derive(sqlx::FromRow)]
    struct VpcRow {
        id: Uuid,
        name: String,
        cidr: String,
    }
    #[derive(sqlx::FromRow)]
    struct SubnetRow {
        id: Uuid,
        name: String,
        cidr: String,
    }
    #[derive(sqlx::FromRow)]
    struct HostRow {
        id: Uuid,
        hostname: String,
        os: String,
        spec: String,
        private_ip: Option<String>,
    }

    let vpc_rows = sqlx::query_as::<_, VpcRow>(
        "SELECT id, name, cidr FROM deployed_vpcs WHERE parent_range_id = $1",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let mut vpcs = Vec::with_capacity(vpc_rows.len());
    for vpc_row in vpc_rows {
        let subnet_rows = sqlx::query_as::<_, SubnetRow>(
            "SELECT id, name, cidr FROM deployed_subnets WHERE parent_vpc_id = $1",
        )
        .bind(vpc_row.id)
        .fetch_all(pool)
        .await?;

        let mut subnets = Vec::with_capacity(subnet_rows.len());
        for subnet_row in subnet_rows {
            let host_rows = sqlx::query_as::<_, HostRow>(
                "SELECT id, hostname, os, spec, private_ip FROM deployed_hosts WHERE parent_subnet_id = $1",
            )
            .bind(subnet_row.id)
            .fetch_all(pool)
            .await?;

            let hosts = host_rows
                .into_iter()
                .map(|h| DeployedHost {
                    id: h.id,
                    hostname: h.hostname,
                    os: h.os,
                    spec: h.spec,
                    private_ip: h.private_ip,
                    parent_subnet_id: subnet_row.id,
                })
                .collect();

            subnets.push(DeployedSubnet {
                id: subnet_row.id,
                name: subnet_row.name,
                cidr: subnet_row.cidr.parse().map_err(|_| {
                    StoreError::Validation(openlabs_core::error::CoreError::Validation(
                        "invalid cidr in database".to_string(),
                    ))
                })?,
                parent_vpc_id: vpc_row.id,
                hosts,
            });
        }

        vpcs.push(DeployedVpc {
            id: vpc_row.id,
            name: vpc_row.name,
            cidr: vpc_row.cidr.parse().map_err(|_| {
                StoreError::Validation(openlabs_core::error::CoreError::Validation(
                    "invalid cidr in database".to_string(),
                ))
            })?,
            parent_range_id: id,
            subnets,
        });
    }

    Ok(Some(DeployedRange {
        id: row.id,
        name: row.name,
        provider: parse_provider(&row.provider)?,
        region: row.region,
        owner_id: row.owner_id,
        blueprint_range_id: row.blueprint_range_id,
        provider_resource_ids: row.provider_resource_ids,
        state_blob: row.state_blob,
        private_ssh_key: row.private_ssh_key,
        state: row.state.parse().map_err(StoreError::Validation)?,
        deployed_at: row.deployed_at.parse().map_err(|e: jiff::Error| {
            StoreError::Validation(openlabs_core::error::CoreError::Validation(e.to_string()))
        })?,
        vpcs,
    }))
}

/// Used by the worker to decide whether a retried job's deterministic
/// id has already been provisioned — a hit is a no-op success.
pub async fn deployed_range_exists(pool: &PgPool, id: Uuid) -> Result<bool, StoreError> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM deployed_ranges WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub async fn update_deployed_range_state(pool: &PgPool, id: Uuid, state: RangeState) -> Result<(), StoreError> {
    sqlx::query("UPDATE deployed_ranges SET state = $1 WHERE id = $2")
        .bind(state.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_deployed_range(pool: &PgPool, id: Uuid, owner: Option<Uuid>) -> Result<bool, StoreError> {
    let result = match owner {
        Some(owner_id) => {
            sqlx::query("DELETE FROM deployed_ranges WHERE id = $1 AND owner_id = $2")
                .bind(id)
                .bind(owner_id)
                .execute(pool)
                .await?
        }
        None => {
            sqlx::query("DELETE FROM deployed_ranges WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?
        }
    };
    Ok(result.rows_affected() > 0)
}
