//! Per-job-kind processing, dispatched from the poll loop in `main.rs`:
//! re-validate ownership, materialize, apply/destroy, persist, and
//! update the job bookkeeping row, in that order.

use base64::Engine;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use serde_json::json;
use uuid::Uuid;

use openlabs_core::models::{
    BlueprintHost, BlueprintRange, BlueprintSubnet, BlueprintVpc, DeployedHost, DeployedRange, DeployedSubnet,
    DeployedVpc, JobStatus,
};
use openlabs_core::validators::min_disk_gb;
use openlabs_provisioner::driver::DeployContext;
use openlabs_queue::{DeployJobArgs, DestroyJobArgs};

use crate::error::WorkerError;
use crate::state::WorkerState;

/// Fixed namespace for deriving `deployed_range_id` from `queue_job_id`:
/// retries of the same queue job converge on the same deployed range
/// id rather than minting a fresh one each attempt.
const NAMESPACE_OPENLABS: Uuid = Uuid::from_bytes([
    0x6f, 0x70, 0x65, 0x6e, 0x6c, 0x61, 0x62, 0x73, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
]);

fn deployed_range_id_for(queue_job_id: &str) -> Uuid {
    Uuid::new_v5(&NAMESPACE_OPENLABS, queue_job_id.as_bytes())
}

pub async fn deploy_range(state: &WorkerState, queue_job_id: &str, args: DeployJobArgs) -> Result<(), WorkerError> {
    match run_deploy(state, queue_job_id, &args).await {
        Ok(deployed_range_id) => {
            let result = json!({ "deployed_range_id": deployed_range_id });
            openlabs_store::jobs::update_job_status(&state.pool, queue_job_id, JobStatus::Complete, None).await?;
            state.queue.mark_complete(queue_job_id, result).await?;
            Ok(())
        }
        Err(e) => {
            tracing::error!(queue_job_id, error = %e, "deploy job failed");
            openlabs_store::jobs::update_job_status(
                &state.pool,
                queue_job_id,
                JobStatus::Failed,
                Some(&e.to_string()),
            )
            .await?;
            state.queue.mark_failed(queue_job_id, e.to_string()).await?;
            Err(e)
        }
    }
}

async fn run_deploy(state: &WorkerState, queue_job_id: &str, args: &DeployJobArgs) -> Result<Uuid, WorkerError> {
    let owner_scope = if args.is_admin { None } else { Some(args.user_id) };
    openlabs_store::blueprints::get_blueprint_range(&state.pool, args.blueprint.id, owner_scope)
        .await?
        .ok_or(WorkerError::BlueprintNotOwned(args.blueprint.id))?;

    let deployed_range_id = deployed_range_id_for(queue_job_id);
    if openlabs_store::deployed::deployed_range_exists(&state.pool, deployed_range_id).await? {
        tracing::info!(queue_job_id, %deployed_range_id, "deploy job already applied, treating retry as a no-op");
        return Ok(deployed_range_id);
    }

    let user = openlabs_store::users::get_user_by_id(&state.pool, args.user_id)
        .await?
        .ok_or(WorkerError::BlueprintNotOwned(args.blueprint.id))?;

    let master_key = decode_enc_key(&args.enc_key)?;
    let records = openlabs_store::secrets::list_secret_records(&state.pool, user.id).await?;
    let bundle =
        openlabs_vault::crypto::get_decrypted_secrets(&user.encrypted_private_key, &master_key, &records);
    let cred_env_vars = bundle.cred_env_vars(args.blueprint.provider);

    let (ssh_private_pem, jumpbox_public_key) = generate_jumpbox_keypair()?;

    let ctx = DeployContext {
        range: args.blueprint.clone(),
        deployed_range_id,
        workdir: state.settings.cdktf_dir.clone(),
        cred_env_vars,
        jumpbox_public_key,
    };

    state.driver.synthesize(&ctx).await?;
    let state_blob = state.driver.apply(&ctx).await?;

    let encrypted_ssh_key = openlabs_vault::crypto::encrypt_for_user(&user.public_key, ssh_private_pem.as_bytes())?;

    let deployed_range = DeployedRange {
        id: deployed_range_id,
        name: args.deploy_request.name.clone(),
        provider: args.blueprint.provider,
        region: args.deploy_request.region.clone(),
        owner_id: args.blueprint.owner_id,
        blueprint_range_id: args.blueprint.id,
        provider_resource_ids: json!({}),
        state_blob: Some(state_blob),
        private_ssh_key: Some(encrypted_ssh_key),
        state: openlabs_core::models::RangeState::On,
        deployed_at: jiff::Timestamp::now(),
        vpcs: args.blueprint.vpcs.iter().map(deployed_vpc_from_blueprint).collect(),
    };

    openlabs_store::deployed::create_deployed_range(&state.pool, &deployed_range).await?;
    Ok(deployed_range_id)
}

pub async fn destroy_range(state: &WorkerState, queue_job_id: &str, args: DestroyJobArgs) -> Result<(), WorkerError> {
    match run_destroy(state, &args).await {
        Ok(()) => {
            openlabs_store::jobs::update_job_status(&state.pool, queue_job_id, JobStatus::Complete, None).await?;
            state
                .queue
                .mark_complete(queue_job_id, json!({ "deployed_range_id": args.deployed_range_id }))
                .await?;
            Ok(())
        }
        Err(e) => {
            tracing::error!(queue_job_id, error = %e, "destroy job failed");
            openlabs_store::jobs::update_job_status(
                &state.pool,
                queue_job_id,
                JobStatus::Failed,
                Some(&e.to_string()),
            )
            .await?;
            state.queue.mark_failed(queue_job_id, e.to_string()).await?;
            Err(e)
        }
    }
}

async fn run_destroy(state: &WorkerState, args: &DestroyJobArgs) -> Result<(), WorkerError> {
    let owner_scope = if args.is_admin { None } else { Some(args.user_id) };
    let range = openlabs_store::deployed::get_deployed_range(&state.pool, args.deployed_range_id, owner_scope)
        .await?
        .ok_or(WorkerError::RangeNotOwned(args.deployed_range_id))?;

    let state_blob = range.state_blob.clone().ok_or(WorkerError::MissingState)?;

    let master_key = decode_enc_key(&args.enc_key)?;
    let records = openlabs_store::secrets::list_secret_records(&state.pool, range.owner_id).await?;
    let user = openlabs_store::users::get_user_by_id(&state.pool, range.owner_id)
        .await?
        .ok_or(WorkerError::RangeNotOwned(args.deployed_range_id))?;
    let bundle =
        openlabs_vault::crypto::get_decrypted_secrets(&user.encrypted_private_key, &master_key, &records);
    let cred_env_vars = bundle.cred_env_vars(range.provider);

    let ctx = DeployContext {
        range: blueprint_range_from_deployed(&range),
        deployed_range_id: range.id,
        workdir: state.settings.cdktf_dir.clone(),
        cred_env_vars,
        // `terraform destroy` tears down whatever is already in the state
        // file regardless of what the regenerated config's key_pair
        // resource says, so the exact key material here is immaterial.
        jumpbox_public_key: String::new(),
    };

    state.driver.destroy(&ctx, &state_blob).await?;
    openlabs_store::deployed::delete_deployed_range(&state.pool, range.id, None).await?;
    Ok(())
}

fn decode_enc_key(raw: &str) -> Result<[u8; 32], WorkerError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(raw)
        .map_err(|_| WorkerError::MissingState)?;
    bytes.try_into().map_err(|_| WorkerError::MissingState)
}

fn generate_jumpbox_keypair() -> Result<(String, String), WorkerError> {
    let mut rng = rand::thread_rng();
    let private_key = rsa::RsaPrivateKey::new(&mut rng, 2048).map_err(|_| WorkerError::MissingState)?;
    let public_key = rsa::RsaPublicKey::from(&private_key);

    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|_| WorkerError::MissingState)?
        .to_string();

    Ok((private_pem, openssh_public_key(&public_key)))
}

/// Encodes an RSA public key as an `ssh-rsa` authorized-keys line per
/// RFC 4253 section 6.6, since `aws_key_pair.public_key` takes the SSH
/// wire format rather than PEM/SubjectPublicKeyInfo.
fn openssh_public_key(public_key: &rsa::RsaPublicKey) -> String {
    use rsa::traits::PublicKeyParts;

    let mut blob = Vec::new();
    ssh_wire_string(&mut blob, b"ssh-rsa");
    ssh_wire_mpint(&mut blob, &public_key.e().to_bytes_be());
    ssh_wire_mpint(&mut blob, &public_key.n().to_bytes_be());

    let encoded = base64::engine::general_purpose::STANDARD.encode(blob);
    format!("ssh-rsa {encoded} openlabs-jumpbox")
}

fn ssh_wire_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

/// Encodes an unsigned big-endian integer as an SSH mpint: a leading
/// `0x00` byte is prepended when the high bit of the first byte is set,
/// so the value is never misread as negative.
fn ssh_wire_mpint(buf: &mut Vec<u8>, bytes: &[u8]) {
    if !bytes.is_empty() && bytes[0] & 0x80 != 0 {
        let mut padded = Vec::with_capacity(bytes.len() + 1);
        padded.push(0u8);
        padded.extend_from_slice(bytes);
        ssh_wire_string(buf, &padded);
    } else {
        ssh_wire_string(buf, bytes);
    }
}

fn deployed_vpc_from_blueprint(vpc: &BlueprintVpc) -> DeployedVpc {
    let id = Uuid::new_v4();
    DeployedVpc {
        id,
        name: vpc.name.clone(),
        cidr: vpc.cidr,
        parent_range_id: Uuid::nil(), // overwritten by the store on insert
        subnets: vpc.subnets.iter().map(deployed_subnet_from_blueprint).collect(),
    }
}

fn deployed_subnet_from_blueprint(subnet: &BlueprintSubnet) -> DeployedSubnet {
    let id = Uuid::new_v4();
    DeployedSubnet {
        id,
        name: subnet.name.clone(),
        cidr: subnet.cidr,
        parent_vpc_id: Uuid::nil(),
        hosts: subnet.hosts.iter().map(deployed_host_from_blueprint).collect(),
    }
}

fn deployed_host_from_blueprint(host: &BlueprintHost) -> DeployedHost {
    DeployedHost {
        id: Uuid::new_v4(),
        hostname: host.hostname.clone(),
        os: host.os.clone(),
        spec: host.spec.clone(),
        private_ip: None,
        parent_subnet_id: Uuid::nil(),
    }
}

/// Reconstructs a best-effort `BlueprintRange` from a `DeployedRange`
/// for destroy's re-synthesis step. `terraform destroy` is driven by
/// the persisted state blob, not the regenerated plan, so defaults
/// standing in for fields the Deployed Range row does not retain
/// (`disk_size_gb`, `tags`) do not affect which resources get torn
/// down.
fn blueprint_range_from_deployed(range: &DeployedRange) -> BlueprintRange {
    BlueprintRange {
        id: range.blueprint_range_id,
        name: range.name.clone(),
        provider: range.provider,
        region: range.region.clone(),
        vnc: false,
        vpn: false,
        owner_id: range.owner_id,
        vpcs: range.vpcs.iter().map(blueprint_vpc_from_deployed).collect(),
    }
}

fn blueprint_vpc_from_deployed(vpc: &DeployedVpc) -> BlueprintVpc {
    BlueprintVpc {
        id: vpc.id,
        name: vpc.name.clone(),
        cidr: vpc.cidr,
        parent_range_id: None,
        subnets: vpc.subnets.iter().map(blueprint_subnet_from_deployed).collect(),
    }
}

fn blueprint_subnet_from_deployed(subnet: &DeployedSubnet) -> BlueprintSubnet {
    BlueprintSubnet {
        id: subnet.id,
        name: subnet.name.clone(),
        cidr: subnet.cidr,
        parent_vpc_id: None,
        hosts: subnet.hosts.iter().map(blueprint_host_from_deployed).collect(),
    }
}

fn blueprint_host_from_deployed(host: &DeployedHost) -> BlueprintHost {
    BlueprintHost {
        id: host.id,
        hostname: host.hostname.clone(),
        os: host.os.clone(),
        spec: host.spec.clone(),
        disk_size_gb: min_disk_gb(&host.os),
        tags: Vec::new(),
        parent_subnet_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipnet::Ipv4Net;
    use openlabs_core::models::{Provider, RangeState};

    #[test]
    fn deployed_range_id_for_is_deterministic_per_queue_job() {
        let a = deployed_range_id_for("job-123");
        let b = deployed_range_id_for("job-123");
        assert_eq!(a, b, "two deliveries of the same queue job must land on the same deployed range id");
    }

    #[test]
    fn deployed_range_id_for_differs_across_queue_jobs() {
        let a = deployed_range_id_for("job-123");
        let b = deployed_range_id_for("job-456");
        assert_ne!(a, b);
    }

    #[test]
    fn decode_enc_key_round_trips_a_32_byte_key() {
        let key = [7u8; 32];
        let encoded = base64::engine::general_purpose::STANDARD.encode(key);
        assert_eq!(decode_enc_key(&encoded).unwrap(), key);
    }

    #[test]
    fn decode_enc_key_rejects_the_wrong_length() {
        let encoded = base64::engine::general_purpose::STANDARD.encode([1u8; 16]);
        assert!(matches!(decode_enc_key(&encoded), Err(WorkerError::MissingState)));
    }

    #[test]
    fn ssh_wire_mpint_pads_a_leading_high_bit() {
        let mut buf = Vec::new();
        ssh_wire_mpint(&mut buf, &[0x80, 0x01]);
        // length prefix (3, since a 0x00 pad byte was inserted) then the padded bytes.
        assert_eq!(buf, vec![0x00, 0x00, 0x00, 0x03, 0x00, 0x80, 0x01]);
    }

    #[test]
    fn ssh_wire_mpint_leaves_a_clear_high_bit_alone() {
        let mut buf = Vec::new();
        ssh_wire_mpint(&mut buf, &[0x7f, 0x01]);
        assert_eq!(buf, vec![0x00, 0x00, 0x00, 0x02, 0x7f, 0x01]);
    }

    #[test]
    fn openssh_public_key_is_a_well_formed_authorized_keys_line() {
        let mut rng = rand::thread_rng();
        let private_key = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = rsa::RsaPublicKey::from(&private_key);

        let line = openssh_public_key(&public_key);
        let mut parts = line.split(' ');
        assert_eq!(parts.next(), Some("ssh-rsa"));
        let encoded_blob = parts.next().expect("a base64 key blob");
        assert_eq!(parts.next(), Some("openlabs-jumpbox"));

        let blob = base64::engine::general_purpose::STANDARD.decode(encoded_blob).unwrap();
        let type_len = u32::from_be_bytes(blob[0..4].try_into().unwrap()) as usize;
        assert_eq!(&blob[4..4 + type_len], b"ssh-rsa");
    }

    fn sample_deployed_range() -> DeployedRange {
        DeployedRange {
            id: Uuid::nil(),
            name: "range-1".to_string(),
            provider: Provider::Aws,
            region: "us_east_1".to_string(),
            owner_id: Uuid::nil(),
            blueprint_range_id: Uuid::nil(),
            provider_resource_ids: json!({}),
            state_blob: None,
            private_ssh_key: None,
            state: RangeState::On,
            deployed_at: jiff::Timestamp::now(),
            vpcs: vec![DeployedVpc {
                id: Uuid::new_v4(),
                name: "vpc-1".to_string(),
                cidr: "10.0.0.0/16".parse::<Ipv4Net>().unwrap(),
                parent_range_id: Uuid::nil(),
                subnets: vec![DeployedSubnet {
                    id: Uuid::new_v4(),
                    name: "subnet-1".to_string(),
                    cidr: "10.0.1.0/24".parse::<Ipv4Net>().unwrap(),
                    parent_vpc_id: Uuid::nil(),
                    hosts: vec![DeployedHost {
                        id: Uuid::new_v4(),
                        hostname: "h1".to_string(),
                        os: "windows_server_2022".to_string(),
                        spec: "tiny".to_string(),
                        private_ip: Some("10.0.1.10".to_string()),
                        parent_subnet_id: Uuid::nil(),
                    }],
                }],
            }],
        }
    }

    #[test]
    fn blueprint_range_from_deployed_preserves_topology_and_fills_in_disk_size() {
        let deployed = sample_deployed_range();
        let blueprint = blueprint_range_from_deployed(&deployed);

        assert_eq!(blueprint.id, deployed.blueprint_range_id);
        assert_eq!(blueprint.provider, deployed.provider);
        assert_eq!(blueprint.vpcs.len(), 1);
        assert_eq!(blueprint.vpcs[0].cidr, deployed.vpcs[0].cidr);
        assert_eq!(blueprint.vpcs[0].subnets[0].hosts[0].hostname, "h1");
        // windows hosts need more disk than the blanket default; reconstruction
        // must derive it from the os rather than falling back to a fixed size.
        assert_eq!(blueprint.vpcs[0].subnets[0].hosts[0].disk_size_gb, min_disk_gb("windows_server_2022"));
    }
}
