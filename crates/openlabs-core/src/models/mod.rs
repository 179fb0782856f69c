pub mod blueprint;
pub mod deployed;
pub mod job;
pub mod provider;
pub mod range_state;
pub mod secret;
pub mod user;

pub use blueprint::{BlueprintHost, BlueprintRange, BlueprintSubnet, BlueprintVpc};
pub use deployed::{DeployedHost, DeployedRange, DeployedSubnet, DeployedVpc};
pub use job::{JobName, JobRecord, JobStatus};
pub use provider::Provider;
pub use range_state::RangeState;
pub use secret::{SecretBundle, SecretRecord};
pub use user::User;
