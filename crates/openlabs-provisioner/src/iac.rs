//! Subprocess execution of the `terraform`/`tofu` CLI. The actual wait
//! on the child process runs on a blocking-thread pool (`spawn_blocking`)
//! rather than `tokio::process`, per the cooperative-suspension design
//! note: a long-running provisioner apply should not tie up an event
//! loop worker thread for the duration of the subprocess.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use async_trait::async_trait;

use crate::error::ProvisionerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IaCTool {
    Terraform,
    OpenTofu,
}

impl IaCTool {
    pub fn binary_name(&self) -> &'static str {
        match self {
            IaCTool::Terraform => "terraform",
            IaCTool::OpenTofu => "tofu",
        }
    }

    pub fn from_env() -> Self {
        match std::env::var("OPENLABS_IAC_TOOL").as_deref() {
            Ok("opentofu") | Ok("tofu") => IaCTool::OpenTofu,
            _ => IaCTool::Terraform,
        }
    }
}

impl std::fmt::Display for IaCTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary_name())
    }
}

pub fn resolve_iac_tool(tool: IaCTool) -> Result<PathBuf, ProvisionerError> {
    which::which(tool.binary_name()).map_err(|_| ProvisionerError::ToolMissing {
        tool: tool.to_string(),
        binary: tool.binary_name(),
    })
}

#[async_trait]
pub trait IaCCommandRunner: Send + Sync {
    async fn run(
        &self,
        tool: IaCTool,
        dir: &Path,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<(), ProvisionerError>;
}

pub struct DefaultIaCCommandRunner;

#[async_trait]
impl IaCCommandRunner for DefaultIaCCommandRunner {
    async fn run(
        &self,
        tool: IaCTool,
        dir: &Path,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<(), ProvisionerError> {
        run_blocking(tool, dir, args, env).await
    }
}

async fn run_blocking(
    tool: IaCTool,
    dir: &Path,
    args: &[&str],
    env: &[(String, String)],
) -> Result<(), ProvisionerError> {
    let binary = resolve_iac_tool(tool)?;
    let dir = dir.to_path_buf();
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let env = env.to_vec();
    let step: &'static str = step_name(&args);

    tokio::task::spawn_blocking(move || {
        let output = Command::new(&binary)
            .args(&args)
            .current_dir(&dir)
            .envs(env)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(ProvisionerError::ProvisionerFailed {
                step,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    })
    .await
    .expect("blocking task panicked")
}

fn step_name(args: &[String]) -> &'static str {
    match args.first().map(String::as_str) {
        Some("init") => "init",
        Some("apply") => "apply",
        Some("destroy") => "destroy",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct MockRunner {
        calls: Arc<Mutex<Vec<(IaCTool, Vec<String>)>>>,
    }

    #[async_trait]
    impl IaCCommandRunner for MockRunner {
        async fn run(
            &self,
            tool: IaCTool,
            _dir: &Path,
            args: &[&str],
            _env: &[(String, String)],
        ) -> Result<(), ProvisionerError> {
            self.calls
                .lock()
                .unwrap()
                .push((tool, args.iter().map(|s| s.to_string()).collect()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn apply_sequence_invokes_init_then_apply() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let runner = MockRunner {
            calls: calls.clone(),
        };
        let dir = PathBuf::from("/tmp/does-not-matter");

        runner
            .run(IaCTool::Terraform, &dir, &["init", "-input=false"], &[])
            .await
            .unwrap();
        runner
            .run(
                IaCTool::Terraform,
                &dir,
                &["apply", "-input=false", "-auto-approve"],
                &[],
            )
            .await
            .unwrap();

        let recorded = calls.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].1[0], "init");
        assert_eq!(recorded[1].1[0], "apply");
    }

    #[test]
    fn binary_names_match_their_cli_tools() {
        assert_eq!(IaCTool::Terraform.binary_name(), "terraform");
        assert_eq!(IaCTool::OpenTofu.binary_name(), "tofu");
    }
}
