use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::provider::Provider;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BlueprintRange {
    pub id: Uuid,
    pub name: String,
    pub provider: Provider,
    pub region: String,
    pub vnc: bool,
    pub vpn: bool,
    pub owner_id: Uuid,
    pub vpcs: Vec<BlueprintVpc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BlueprintVpc {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub cidr: Ipv4Net,
    /// Null when this VPC is a standalone sub-graph, not attached to a
    /// Blueprint Range.
    pub parent_range_id: Option<Uuid>,
    pub subnets: Vec<BlueprintSubnet>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BlueprintSubnet {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub cidr: Ipv4Net,
    pub parent_vpc_id: Option<Uuid>,
    pub hosts: Vec<BlueprintHost>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BlueprintHost {
    pub id: Uuid,
    pub hostname: String,
    pub os: String,
    pub spec: String,
    pub disk_size_gb: i32,
    pub tags: Vec<String>,
    pub parent_subnet_id: Option<Uuid>,
}
