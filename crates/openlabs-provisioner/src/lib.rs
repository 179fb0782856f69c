pub mod driver;
pub mod error;
pub mod iac;

pub use driver::{DeployContext, ProvisionerDriver, TerraformDriver};
pub use error::ProvisionerError;
pub use iac::{DefaultIaCCommandRunner, IaCCommandRunner, IaCTool};
