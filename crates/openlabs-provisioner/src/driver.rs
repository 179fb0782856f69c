use std::path::PathBuf;

use async_trait::async_trait;
use openlabs_core::models::BlueprintRange;
use uuid::Uuid;

use crate::error::ProvisionerError;
use crate::iac::{DefaultIaCCommandRunner, IaCCommandRunner, IaCTool};

/// Everything a provisioner operation needs to know about one range.
pub struct DeployContext {
    pub range: BlueprintRange,
    pub deployed_range_id: Uuid,
    /// Process-wide configured root (`CDKTF_DIR`); the per-range plan
    /// directory is `<workdir>/stacks/<stack_name>`.
    pub workdir: PathBuf,
    pub cred_env_vars: Vec<(String, String)>,
    /// OpenSSH-formatted jumpbox public key embedded into the plan's
    /// `aws_key_pair` resource.
    pub jumpbox_public_key: String,
}

impl DeployContext {
    pub fn stack_name(&self) -> String {
        openlabs_materializer::stack_name(&self.range, self.deployed_range_id)
    }

    pub fn plan_dir(&self) -> PathBuf {
        self.workdir.join("stacks").join(self.stack_name())
    }

    pub fn state_file_path(&self) -> PathBuf {
        self.plan_dir()
            .join(format!("terraform.{}.tfstate", self.stack_name()))
    }
}

#[async_trait]
pub trait ProvisionerDriver: Send + Sync {
    async fn synthesize(&self, ctx: &DeployContext) -> Result<(), ProvisionerError>;
    async fn apply(&self, ctx: &DeployContext) -> Result<Vec<u8>, ProvisionerError>;
    async fn destroy(&self, ctx: &DeployContext, state_blob: &[u8]) -> Result<(), ProvisionerError>;
}

pub struct TerraformDriver<R: IaCCommandRunner> {
    pub runner: R,
    pub tool: IaCTool,
}

impl TerraformDriver<DefaultIaCCommandRunner> {
    pub fn new() -> Self {
        Self {
            runner: DefaultIaCCommandRunner,
            tool: IaCTool::from_env(),
        }
    }
}

impl Default for TerraformDriver<DefaultIaCCommandRunner> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use openlabs_core::models::Provider;

    /// Stands in for the real CLI: `init`/`apply` write the state blob
    /// the test primes, `destroy` just records the state file's
    /// contents at call time so the test can assert on it.
    struct FakeRunner {
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl IaCCommandRunner for FakeRunner {
        async fn run(
            &self,
            _tool: IaCTool,
            dir: &std::path::Path,
            args: &[&str],
            _env: &[(String, String)],
        ) -> Result<(), ProvisionerError> {
            self.calls.lock().unwrap().push(args[0].to_string());
            if args[0] == "apply" {
                let state_path = dir.join(format!(
                    "terraform.{}.tfstate",
                    dir.file_name().unwrap().to_string_lossy()
                ));
                tokio::fs::write(&state_path, b"{\"fake\":\"state\"}").await?;
            }
            Ok(())
        }
    }

    fn sample_range() -> BlueprintRange {
        use ipnet::Ipv4Net;
        use openlabs_core::models::{BlueprintHost, BlueprintSubnet, BlueprintVpc};

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

    #[tokio::test]
    async fn apply_requires_synthesize_first() {
        let tmp = tempfile::tempdir().unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let driver = TerraformDriver {
            runner: FakeRunner { calls },
            tool: IaCTool::Terraform,
        };
        let ctx = DeployContext {
            range: sample_range(),
            deployed_range_id: Uuid::nil(),
            workdir: tmp.path().to_path_buf(),
            cred_env_vars: vec![],
            jumpbox_public_key: "ssh-rsa AAAA test".to_string(),
        };

        let result = driver.apply(&ctx).await;
        assert!(matches!(result, Err(ProvisionerError::NotSynthesized)));
    }

    #[tokio::test]
    async fn destroy_rejects_an_empty_state_blob() {
        let tmp = tempfile::tempdir().unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let driver = TerraformDriver {
            runner: FakeRunner { calls },
            tool: IaCTool::Terraform,
        };
        let ctx = DeployContext {
            range: sample_range(),
            deployed_range_id: Uuid::nil(),
            workdir: tmp.path().to_path_buf(),
            cred_env_vars: vec![],
            jumpbox_public_key: String::new(),
        };

        let result = driver.destroy(&ctx, &[]).await;
        assert!(matches!(result, Err(ProvisionerError::MissingState)));
    }

    #[tokio::test]
    async fn apply_captures_the_state_blob_destroy_later_rehydrates() {
        let tmp = tempfile::tempdir().unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let driver = TerraformDriver {
            runner: FakeRunner { calls: calls.clone() },
            tool: IaCTool::Terraform,
        };
        let ctx = DeployContext {
            range: sample_range(),
            deployed_range_id: Uuid::nil(),
            workdir: tmp.path().to_path_buf(),
            cred_env_vars: vec![],
            jumpbox_public_key: "ssh-rsa AAAA test".to_string(),
        };

        driver.synthesize(&ctx).await.unwrap();
        let state_blob = driver.apply(&ctx).await.unwrap();
        assert_eq!(state_blob, b"{\"fake\":\"state\"}");
        // apply cleans up the plan directory on success.
        assert!(!ctx.plan_dir().exists());

        driver.destroy(&ctx, &state_blob).await.unwrap();
        assert!(!ctx.plan_dir().exists());

        let recorded = calls.lock().unwrap();
        let recorded: Vec<&str> = recorded.iter().map(String::as_str).collect();
        assert_eq!(recorded, vec!["init", "apply", "init", "destroy"]);
    }
}

#[async_trait]
impl<R: IaCCommandRunner> ProvisionerDriver for TerraformDriver<R> {
    async fn synthesize(&self, ctx: &DeployContext) -> Result<(), ProvisionerError> {
        openlabs_materializer::materialize(
            &ctx.range,
            ctx.deployed_range_id,
            &ctx.workdir,
            &ctx.jumpbox_public_key,
        )?;
        Ok(())
    }

    async fn apply(&self, ctx: &DeployContext) -> Result<Vec<u8>, ProvisionerError> {
        if !ctx.plan_dir().join("cdk.tf.json").exists() {
            return Err(ProvisionerError::NotSynthesized);
        }

        self.runner
            .run(
                self.tool,
                &ctx.plan_dir(),
                &["init", "-input=false"],
                &ctx.cred_env_vars,
            )
            .await?;
        self.runner
            .run(
                self.tool,
                &ctx.plan_dir(),
                &["apply", "-input=false", "-auto-approve"],
                &ctx.cred_env_vars,
            )
            .await?;

        let state_blob = tokio::fs::read(ctx.state_file_path()).await?;

        if let Err(e) = tokio::fs::remove_dir_all(ctx.plan_dir()).await {
            tracing::warn!(stack = %ctx.stack_name(), error = %e, "failed to clean up plan directory after apply");
        }

        Ok(state_blob)
    }

    async fn destroy(&self, ctx: &DeployContext, state_blob: &[u8]) -> Result<(), ProvisionerError> {
        if state_blob.is_empty() {
            return Err(ProvisionerError::MissingState);
        }

        self.synthesize(ctx).await?;
        tokio::fs::write(ctx.state_file_path(), state_blob).await?;

        self.runner
            .run(
                self.tool,
                &ctx.plan_dir(),
                &["init", "-input=false"],
                &ctx.cred_env_vars,
            )
            .await?;
        self.runner
            .run(
                self.tool,
                &ctx.plan_dir(),
                &["destroy", "-input=false", "-auto-approve"],
                &ctx.cred_env_vars,
            )
            .await?;

        if let Err(e) = tokio::fs::remove_dir_all(ctx.plan_dir()).await {
            tracing::warn!(stack = %ctx.stack_name(), error = %e, "failed to clean up plan directory after destroy");
        }

        Ok(())
    }
}

