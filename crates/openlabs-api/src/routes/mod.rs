pub mod auth;
pub mod blueprints;
pub mod jobs;
pub mod ranges;
pub mod secrets;
