//! openlabs-materializer
//!
//! Turns a blueprint + region + deployed range id + jumpbox public key
//! into a provider-specific provisioner plan laid out on disk. Pure
//! function of its inputs: two calls with the same arguments produce
//! byte-identical plan files.

pub mod aws;
pub mod error;

use std::path::{Path, PathBuf};

use openlabs_core::models::{BlueprintRange, Provider};
use uuid::Uuid;

use error::MaterializerError;

/// `stack_name = "<range_name>-<deployed_range_id>"`.
pub fn stack_name(range: &BlueprintRange, deployed_range_id: Uuid) -> String {
    format!("{}-{}", range.name, deployed_range_id)
}

/// Writes the plan to `<workdir>/stacks/<stack_name>/cdk.tf.json` and
/// returns the plan directory.
pub fn materialize(
    range: &BlueprintRange,
    deployed_range_id: Uuid,
    workdir: &Path,
    jumpbox_public_key: &str,
) -> Result<PathBuf, MaterializerError> {
    let stack = stack_name(range, deployed_range_id);
    let plan_dir = workdir.join("stacks").join(&stack);
    std::fs::create_dir_all(&plan_dir)?;

    let plan = match range.provider {
        Provider::Aws => aws::build_plan(range, deployed_range_id, &stack, jumpbox_public_key),
        Provider::Azure => {
            return Err(MaterializerError::UnsupportedProvider(
                Provider::Azure.to_string(),
            ))
        }
    };

    let plan_path = plan_dir.join("cdk.tf.json");
    std::fs::write(&plan_path, serde_json::to_vec_pretty(&plan)?)?;

    tracing::info!(stack = %stack, plan_dir = %plan_dir.display(), "materialized plan");
    Ok(plan_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipnet::Ipv4Net;
    use openlabs_core::models::{BlueprintHost, BlueprintSubnet, BlueprintVpc};

    fn sample_range() -> BlueprintRange {
        BlueprintRange {
            id: Uuid::nil(),
            name: "range1".to_string(),
            provider: Provider::Aws,
            region: "us_east_1".to_string(),
            vnc: false,
            vpn: false,
            owner_id: Uuid::nil(),
            vpcs: vec![BlueprintVpc {
                id: Uuid::nil(),
                name: "vpc1".to_string(),
                cidr: "10.0.0.0/16".parse::<Ipv4Net>().unwrap(),
                parent_range_id: None,
                subnets: vec![BlueprintSubnet {
                    id: Uuid::nil(),
                    name: "subnet1".to_string(),
                    cidr: "10.0.1.0/24".parse::<Ipv4Net>().unwrap(),
                    parent_vpc_id: None,
                    hosts: vec![BlueprintHost {
                        id: Uuid::nil(),
                        hostname: "h1".to_string(),
                        os: "debian_11".to_string(),
                        spec: "tiny".to_string(),
                        disk_size_gb: 8,
                        tags: vec![],
                        parent_subnet_id: None,
                    }],
                }],
            }],
        }
    }

    #[test]
    fn materialize_is_deterministic_for_identical_inputs() {
        let range = sample_range();
        let id = Uuid::nil();

        let dir1 = tempfile_dir();
        let dir2 = tempfile_dir();

        let public_key = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC test";
        let plan_dir1 = materialize(&range, id, &dir1, public_key).unwrap();
        let plan_dir2 = materialize(&range, id, &dir2, public_key).unwrap();

        let bytes1 = std::fs::read(plan_dir1.join("cdk.tf.json")).unwrap();
        let bytes2 = std::fs::read(plan_dir2.join("cdk.tf.json")).unwrap();
        assert_eq!(bytes1, bytes2);

        std::fs::remove_dir_all(&dir1).ok();
        std::fs::remove_dir_all(&dir2).ok();
    }

    #[test]
    fn stack_name_embeds_range_name_and_deployed_id() {
        let range = sample_range();
        let id = Uuid::nil();
        assert_eq!(stack_name(&range, id), format!("range1-{id}"));
    }

    fn tempfile_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("openlabs-materializer-test-{}", Uuid::new_v4()));
        dir
    }
}
