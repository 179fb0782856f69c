use ipnet::Ipv4Net;
use openlabs_core::models::{BlueprintHost, BlueprintRange, BlueprintSubnet, BlueprintVpc, Provider};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintRangeHeader {
    pub id: Uuid,
    pub name: String,
    pub provider: Provider,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintVpcHeader {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "cidr_as_string")]
    pub cidr: Ipv4Net,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintSubnetHeader {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "cidr_as_string")]
    pub cidr: Ipv4Net,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintHostHeader {
    pub id: Uuid,
    pub hostname: String,
}

mod cidr_as_string {
    use ipnet::Ipv4Net;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(cidr: &Ipv4Net, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&cidr.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Ipv4Net, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
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

/// Inserts a full blueprint graph transactionally. Server-assigns every
/// id in the tree; the ids on the incoming struct are ignored. Uniqueness
/// on `(owner, blueprint_id)` is deliberately not enforced here.
pub async fn create_range(pool: &PgPool, range: &BlueprintRange) -> Result<BlueprintRange, StoreError> {
    let mut tx = pool.begin().await?;

    let range_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO blueprint_ranges (id, name, provider, region, vnc, vpn, owner_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(range_id)
    .bind(&range.name)
    .bind(range.provider.as_str())
    .bind(&range.region)
    .bind(range.vnc)
    .bind(range.vpn)
    .bind(range.owner_id)
    .execute(&mut *tx)
    .await?;

    let mut vpcs = Vec::with_capacity(range.vpcs.len());
    for vpc in &range.vpcs {
        let vpc_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO blueprint_vpcs (id, name, cidr, parent_range_id, owner_id)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(vpc_id)
        .bind(&vpc.name)
        .bind(vpc.cidr.to_string())
        .bind(range_id)
        .bind(range.owner_id)
        .execute(&mut *tx)
        .await?;

        let mut subnets = Vec::with_capacity(vpc.subnets.len());
        for subnet in &vpc.subnets {
            let subnet_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO blueprint_subnets (id, name, cidr, parent_vpc_id, owner_id)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(subnet_id)
            .bind(&subnet.name)
            .bind(subnet.cidr.to_string())
            .bind(vpc_id)
            .bind(range.owner_id)
            .execute(&mut *tx)
            .await?;

            let mut hosts = Vec::with_capacity(subnet.hosts.len());
            for host in &subnet.hosts {
                let host_id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO blueprint_hosts (id, hostname, os, spec, disk_size_gb, tags, parent_subnet_id, owner_id)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(host_id)
                .bind(&host.hostname)
                .bind(&host.os)
                .bind(&host.spec)
                .bind(host.disk_size_gb)
                .bind(serde_json::to_value(&host.tags)?)
                .bind(subnet_id)
                .bind(range.owner_id)
                .execute(&mut *tx)
                .await?;

                hosts.push(BlueprintHost {
                    id: host_id,
                    hostname: host.hostname.clone(),
                    os: host.os.clone(),
                    spec: host.spec.clone(),
                    disk_size_gb: host.disk_size_gb,
                    tags: host.tags.clone(),
                    parent_subnet_id: Some(subnet_id),
                });
            }

            subnets.push(BlueprintSubnet {
                id: subnet_id,
                name: subnet.name.clone(),
                cidr: subnet.cidr,
                parent_vpc_id: Some(vpc_id),
                hosts,
            });
        }

        vpcs.push(BlueprintVpc {
            id: vpc_id,
            name: vpc.name.clone(),
            cidr: vpc.cidr,
            parent_range_id: Some(range_id),
            subnets,
        });
    }

    tx.commit().await?;

    Ok(BlueprintRange {
        id: range_id,
        name: range.name.clone(),
        provider: range.provider,
        region: range.region.clone(),
        vnc: range.vnc,
        vpn: range.vpn,
        owner_id: range.owner_id,
        vpcs,
    })
}

pub async fn list_blueprint_range_headers(
    pool: &PgPool,
    owner: Option<Uuid>,
) -> Result<Vec<BlueprintRangeHeader>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: Uuid,
        name: String,
        provider: String,
        region: String,
    }

    let rows = match owner {
        Some(owner_id) => {
            sqlx::query_as::<_, Row>(
                "SELECT id, name, provider, region FROM blueprint_ranges WHERE owner_id = $1",
            )
            .bind(owner_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Row>("SELECT id, name, provider, region FROM blueprint_ranges")
                .fetch_all(pool)
                .await?
        }
    };

    rows.into_iter()
        .map(|r| {
            Ok(BlueprintRangeHeader {
                id: r.id,
                name: r.name,
                provider: parse_provider(&r.provider)?,
                region: r.region,
            })
        })
        .collect()
}

/// Returns `None` both when the id is unknown and when `owner` is set
/// and does not match — the API layer maps both to the same 404 to
/// avoid leaking existence.
pub async fn get_blueprint_range(
    pool: &PgPool,
    id: Uuid,
    owner: Option<Uuid>,
) -> Result<Option<BlueprintRange>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct RangeRow {
        id: Uuid,
        name: String,
        provider: String,
        region: String,
        vnc: bool,
        vpn: bool,
        owner_id: Uuid,
    }

    let Some(range_row) = sqlx::query_as::<_, RangeRow>("SELECT * FROM blueprint_ranges WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    if let Some(owner_id) = owner {
        if range_row.owner_id != owner_id {
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
        parent_vpc_id: Option<Uuid>,
    }
    #[derive(sqlx::FromRow)]
    struct HostRow {
        id: Uuid,
        hostname: String,
        os: String,
        spec: String,
        disk_size_gb: i32,
        tags: serde_json::Value,
        parent_subnet_id: Option<Uuid>,
    }

    let vpc_rows =
        sqlx::query_as::<_, VpcRow>("SELECT id, name, cidr FROM blueprint_vpcs WHERE parent_range_id = $1")
            .bind(id)
            .fetch_all(pool)
            .await?;

    let mut vpcs = Vec::with_capacity(vpc_rows.len());
    for vpc_row in vpc_rows {
        let subnet_rows = sqlx::query_as::<_, SubnetRow>(
            "SELECT id, name, cidr, parent_vpc_id FROM blueprint_subnets WHERE parent_vpc_id = $1",
        )
        .bind(vpc_row.id)
        .fetch_all(pool)
        .await?;

        let mut subnets = Vec::with_capacity(subnet_rows.len());
        for subnet_row in subnet_rows {
            let host_rows = sqlx::query_as::<_, HostRow>(
                "SELECT id, hostname, os, spec, disk_size_gb, tags, parent_subnet_id FROM blueprint_hosts WHERE parent_subnet_id = $1",
            )
            .bind(subnet_row.id)
            .fetch_all(pool)
            .await?;

            let hosts = host_rows
                .into_iter()
                .map(|h| {
                    Ok(BlueprintHost {
                        id: h.id,
                        hostname: h.hostname,
                        os: h.os,
                        spec: h.spec,
                        disk_size_gb: h.disk_size_gb,
                        tags: serde_json::from_value(h.tags)?,
                        parent_subnet_id: h.parent_subnet_id,
                    })
                })
                .collect::<Result<Vec<_>, StoreError>>()?;

            subnets.push(BlueprintSubnet {
                id: subnet_row.id,
                name: subnet_row.name,
                cidr: subnet_row.cidr.parse().map_err(|_| {
                    StoreError::Validation(openlabs_core::error::CoreError::Validation(
                        "invalid cidr in database".to_string(),
                    ))
                })?,
                parent_vpc_id: subnet_row.parent_vpc_id,
                hosts,
            });
        }

        vpcs.push(BlueprintVpc {
            id: vpc_row.id,
            name: vpc_row.name,
            cidr: vpc_row.cidr.parse().map_err(|_| {
                StoreError::Validation(openlabs_core::error::CoreError::Validation(
                    "invalid cidr in database".to_string(),
                ))
            })?,
            parent_range_id: Some(id),
            subnets,
        });
    }

    Ok(Some(BlueprintRange {
        id: range_row.id,
        name: range_row.name,
        provider: parse_provider(&range_row.provider)?,
        region: range_row.region,
        vnc: range_row.vnc,
        vpn: range_row.vpn,
        owner_id: range_row.owner_id,
        vpcs,
    }))
}

/// Deletes a blueprint range; VPCs/subnets/hosts cascade via foreign key.
pub async fn delete_blueprint_range(pool: &PgPool, id: Uuid, owner: Option<Uuid>) -> Result<bool, StoreError> {
    let result = match owner {
        Some(owner_id) => {
            sqlx::query("DELETE FROM blueprint_ranges WHERE id = $1 AND owner_id = $2")
                .bind(id)
                .bind(owner_id)
                .execute(pool)
                .await?
        }
        None => {
            sqlx::query("DELETE FROM blueprint_ranges WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?
        }
    };
    Ok(result.rows_affected() > 0)
}

/// Lists VPC headers, optionally restricted to standalone sub-graphs
/// (`parent_range_id IS NULL`).
pub async fn list_blueprint_vpc_headers(
    pool: &PgPool,
    owner: Option<Uuid>,
    standalone_only: bool,
) -> Result<Vec<BlueprintVpcHeader>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: Uuid,
        name: String,
        cidr: String,
    }

    let sql = match (owner.is_some(), standalone_only) {
        (true, true) => "SELECT id, name, cidr FROM blueprint_vpcs WHERE owner_id = $1 AND parent_range_id IS NULL",
        (true, false) => "SELECT id, name, cidr FROM blueprint_vpcs WHERE owner_id = $1",
        (false, true) => "SELECT id, name, cidr FROM blueprint_vpcs WHERE parent_range_id IS NULL",
        (false, false) => "SELECT id, name, cidr FROM blueprint_vpcs",
    };

    let mut query = sqlx::query_as::<_, Row>(sql);
    if let Some(owner_id) = owner {
        query = query.bind(owner_id);
    }
    let rows = query.fetch_all(pool).await?;

    rows.into_iter()
        .map(|r| {
            Ok(BlueprintVpcHeader {
                id: r.id,
                name: r.name,
                cidr: r.cidr.parse().map_err(|_| {
                    StoreError::Validation(openlabs_core::error::CoreError::Validation(
                        "invalid cidr in database".to_string(),
                    ))
                })?,
            })
        })
        .collect()
}

/// Inserts a standalone VPC (not attached to any Blueprint Range).
pub async fn create_standalone_vpc(pool: &PgPool, owner_id: Uuid, vpc: &BlueprintVpc) -> Result<BlueprintVpc, StoreError> {
    let vpc_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO blueprint_vpcs (id, name, cidr, parent_range_id, owner_id) VALUES ($1, $2, $3, NULL, $4)",
    )
    .bind(vpc_id)
    .bind(&vpc.name)
    .bind(vpc.cidr.to_string())
    .bind(owner_id)
    .execute(pool)
    .await?;

    Ok(BlueprintVpc {
        id: vpc_id,
        name: vpc.name.clone(),
        cidr: vpc.cidr,
        parent_range_id: None,
        subnets: Vec::new(),
    })
}

/// Inserts a standalone subnet (not attached to any VPC).
pub async fn create_standalone_subnet(
    pool: &PgPool,
    owner_id: Uuid,
    subnet: &BlueprintSubnet,
) -> Result<BlueprintSubnet, StoreError> {
    let subnet_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO blueprint_subnets (id, name, cidr, parent_vpc_id, owner_id) VALUES ($1, $2, $3, NULL, $4)",
    )
    .bind(subnet_id)
    .bind(&subnet.name)
    .bind(subnet.cidr.to_string())
    .bind(owner_id)
    .execute(pool)
    .await?;

    Ok(BlueprintSubnet {
        id: subnet_id,
        name: subnet.name.clone(),
        cidr: subnet.cidr,
        parent_vpc_id: None,
        hosts: Vec::new(),
    })
}

/// Inserts a standalone host (not attached to any subnet).
pub async fn create_standalone_host(pool: &PgPool, owner_id: Uuid, host: &BlueprintHost) -> Result<BlueprintHost, StoreError> {
    let host_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO blueprint_hosts (id, hostname, os, spec, disk_size_gb, tags, parent_subnet_id, owner_id)
         VALUES ($1, $2, $3, $4, $5, $6, NULL, $7)",
    )
    .bind(host_id)
    .bind(&host.hostname)
    .bind(&host.os)
    .bind(&host.spec)
    .bind(host.disk_size_gb)
    .bind(serde_json::to_value(&host.tags)?)
    .bind(owner_id)
    .execute(pool)
    .await?;

    Ok(BlueprintHost {
        id: host_id,
        hostname: host.hostname.clone(),
        os: host.os.clone(),
        spec: host.spec.clone(),
        disk_size_gb: host.disk_size_gb,
        tags: host.tags.clone(),
        parent_subnet_id: None,
    })
}

/// Lists subnet headers, optionally restricted to standalone sub-graphs.
pub async fn list_blueprint_subnet_headers(
    pool: &PgPool,
    owner: Option<Uuid>,
    standalone_only: bool,
) -> Result<Vec<BlueprintSubnetHeader>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: Uuid,
        name: String,
        cidr: String,
    }

    let sql = match (owner.is_some(), standalone_only) {
        (true, true) => "SELECT id, name, cidr FROM blueprint_subnets WHERE owner_id = $1 AND parent_vpc_id IS NULL",
        (true, false) => "SELECT id, name, cidr FROM blueprint_subnets WHERE owner_id = $1",
        (false, true) => "SELECT id, name, cidr FROM blueprint_subnets WHERE parent_vpc_id IS NULL",
        (false, false) => "SELECT id, name, cidr FROM blueprint_subnets",
    };

    let mut query = sqlx::query_as::<_, Row>(sql);
    if let Some(owner_id) = owner {
        query = query.bind(owner_id);
    }
    let rows = query.fetch_all(pool).await?;

    rows.into_iter()
        .map(|r| {
            Ok(BlueprintSubnetHeader {
                id: r.id,
                name: r.name,
                cidr: r.cidr.parse().map_err(|_| {
                    StoreError::Validation(openlabs_core::error::CoreError::Validation(
                        "invalid cidr in database".to_string(),
                    ))
                })?,
            })
        })
        .collect()
}

/// Lists host headers, optionally restricted to standalone sub-graphs.
pub async fn list_blueprint_host_headers(
    pool: &PgPool,
    owner: Option<Uuid>,
    standalone_only: bool,
) -> Result<Vec<BlueprintHostHeader>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: Uuid,
        hostname: String,
    }

    let sql = match (owner.is_some(), standalone_only) {
        (true, true) => "SELECT id, hostname FROM blueprint_hosts WHERE owner_id = $1 AND parent_subnet_id IS NULL",
        (true, false) => "SELECT id, hostname FROM blueprint_hosts WHERE owner_id = $1",
        (false, true) => "SELECT id, hostname FROM blueprint_hosts WHERE parent_subnet_id IS NULL",
        (false, false) => "SELECT id, hostname FROM blueprint_hosts",
    };

    let mut query = sqlx::query_as::<_, Row>(sql);
    if let Some(owner_id) = owner {
        query = query.bind(owner_id);
    }
    let rows = query.fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|r| BlueprintHostHeader {
            id: r.id,
            hostname: r.hostname,
        })
        .collect())
}

/// Fetches a single VPC with its subnets/hosts, regardless of whether it
/// is standalone or attached to a range.
pub async fn get_blueprint_vpc(pool: &PgPool, id: Uuid, owner: Option<Uuid>) -> Result<Option<BlueprintVpc>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct VpcRow {
        id: Uuid,
        name: String,
        cidr: String,
        parent_range_id: Option<Uuid>,
        owner_id: Uuid,
    }

    let Some(vpc_row) = sqlx::query_as::<_, VpcRow>("SELECT * FROM blueprint_vpcs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    if let Some(owner_id) = owner {
        if vpc_row.owner_id != owner_id {
            return Ok(None);
        }
    }

    let subnets = get_blueprint_subnets_for_vpc(pool, vpc_row.id).await?;

    Ok(Some(BlueprintVpc {
        id: vpc_row.id,
        name: vpc_row.name,
        cidr: vpc_row.cidr.parse().map_err(|_| {
            StoreError::Validation(openlabs_core::error::CoreError::Validation(
                "invalid cidr in database".to_string(),
            ))
        })?,
        parent_range_id: vpc_row.parent_range_id,
        subnets,
    }))
}

async fn get_blueprint_subnets_for_vpc(pool: &PgPool, vpc_id: Uuid) -> Result<Vec<BlueprintSubnet>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct SubnetRow {
        id: Uuid,
        name: String,
        cidr: String,
    }

    let subnet_rows = sqlx::query_as::<_, SubnetRow>(
        "SELECT id, name, cidr FROM blueprint_subnets WHERE parent_vpc_id = $1",
    )
    .bind(vpc_id)
    .fetch_all(pool)
    .await?;

    let mut subnets = Vec::with_capacity(subnet_rows.len());
    for subnet_row in subnet_rows {
        let hosts = get_blueprint_hosts_for_subnet(pool, subnet_row.id).await?;
        subnets.push(BlueprintSubnet {
            id: subnet_row.id,
            name: subnet_row.name,
            cidr: subnet_row.cidr.parse().map_err(|_| {
                StoreError::Validation(openlabs_core::error::CoreError::Validation(
                    "invalid cidr in database".to_string(),
                ))
            })?,
            parent_vpc_id: Some(vpc_id),
            hosts,
        });
    }
    Ok(subnets)
}

async fn get_blueprint_hosts_for_subnet(pool: &PgPool, subnet_id: Uuid) -> Result<Vec<BlueprintHost>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct HostRow {
        id: Uuid,
        hostname: String,
        os: String,
        spec: String,
        disk_size_gb: i32,
        tags: serde_json::Value,
    }

    let host_rows = sqlx::query_as::<_, HostRow>(
        "SELECT id, hostname, os, spec, disk_size_gb, tags FROM blueprint_hosts WHERE parent_subnet_id = $1",
    )
    .bind(subnet_id)
    .fetch_all(pool)
    .await?;

    host_rows
        .into_iter()
        .map(|h| {
            Ok(BlueprintHost {
                id: h.id,
                hostname: h.hostname,
                os: h.os,
                spec: h.spec,
                disk_size_gb: h.disk_size_gb,
                tags: serde_json::from_value(h.tags)?,
                parent_subnet_id: Some(subnet_id),
            })
        })
        .collect()
}

/// Fetches a single subnet with its hosts, regardless of whether it is
/// standalone or attached to a VPC.
pub async fn get_blueprint_subnet(pool: &PgPool, id: Uuid, owner: Option<Uuid>) -> Result<Option<BlueprintSubnet>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct SubnetRow {
        id: Uuid,
        name: String,
        cidr: String,
        parent_vpc_id: Option<Uuid>,
        owner_id: Uuid,
    }

    let Some(subnet_row) = sqlx::query_as::<_, SubnetRow>("SELECT * FROM blueprint_subnets WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    if let Some(owner_id) = owner {
        if subnet_row.owner_id != owner_id {
            return Ok(None);
        }
    }

    let hosts = get_blueprint_hosts_for_subnet(pool, subnet_row.id).await?;

    Ok(Some(BlueprintSubnet {
        id: subnet_row.id,
        name: subnet_row.name,
        cidr: subnet_row.cidr.parse().map_err(|_| {
            StoreError::Validation(openlabs_core::error::CoreError::Validation(
                "invalid cidr in database".to_string(),
            ))
        })?,
        parent_vpc_id: subnet_row.parent_vpc_id,
        hosts,
    }))
}

/// Fetches a single host.
pub async fn get_blueprint_host(pool: &PgPool, id: Uuid, owner: Option<Uuid>) -> Result<Option<BlueprintHost>, StoreError> {
    #[derive(sqlx::FromRow)]
    struct HostRow {
        id: Uuid,
        hostname: String,
        os: String,
        spec: String,
        disk_size_gb: i32,
        tags: serde_json::Value,
        parent_subnet_id: Option<Uuid>,
        owner_id: Uuid,
    }

    let Some(row) = sqlx::query_as::<_, HostRow>("SELECT * FROM blueprint_hosts WHERE id = $1")
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

    Ok(Some(BlueprintHost {
        id: row.id,
        hostname: row.hostname,
        os: row.os,
        spec: row.spec,
        disk_size_gb: row.disk_size_gb,
        tags: serde_json::from_value(row.tags)?,
        parent_subnet_id: row.parent_subnet_id,
    }))
}
