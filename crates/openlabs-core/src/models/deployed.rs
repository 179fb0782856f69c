use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::provider::Provider;
use super::range_state::RangeState;

/// Mirrors `BlueprintRange` and adds the fields that only exist once a
/// range has actually been provisioned in a cloud account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeployedRange {
    pub id: Uuid,
    pub name: String,
    pub provider: Provider,
    pub region: String,
    pub owner_id: Uuid,
    pub blueprint_range_id: Uuid,
    pub provider_resource_ids: serde_json::Value,
    /// Opaque bytes handed back by the provisioner driver (a Terraform
    /// state file). The authoritative handle to the cloud resources —
    /// losing it leaks them.
    #[serde(skip_serializing)]
    pub state_blob: Option<Vec<u8>>,
    #[serde(skip_serializing)]
    pub private_ssh_key: Option<Vec<u8>>,
    pub state: RangeState,
    pub deployed_at: jiff::Timestamp,
    pub vpcs: Vec<DeployedVpc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeployedVpc {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub cidr: Ipv4Net,
    pub parent_range_id: Uuid,
    pub subnets: Vec<DeployedSubnet>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeployedSubnet {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub cidr: Ipv4Net,
    pub parent_vpc_id: Uuid,
    pub hosts: Vec<DeployedHost>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeployedHost {
    pub id: Uuid,
    pub hostname: String,
    pub os: String,
    pub spec: String,
    pub private_ip: Option<String>,
    pub parent_subnet_id: Uuid,
}
