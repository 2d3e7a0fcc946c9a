//! Form-submission verification pipeline.
//!
//! Exposes modules for integration testing.

pub mod config;
pub mod errors;
pub mod verifier;
pub mod workflow;

// Re-export commonly used types for external use
pub use config::AppConfig;
pub use errors::{ConfigError, VerifyError};
pub use verifier::{SubmissionVerifier, VerificationReport, VerificationVerdict};
pub use workflow::message_compose_workflow;
