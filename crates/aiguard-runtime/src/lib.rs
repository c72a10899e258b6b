//! # aiguard-runtime
//!
//! Gateway processor backed by the AI Guard evaluation service.
//!
//! `aiguard-core` decides what to do with a verdict; this crate fetches
//! the verdict. It provides:
//!
//! - [`client::AiGuardClient`], the HTTP client for the evaluation API
//! - [`config::GuardConfig`], loaded from JSON or YAML
//! - [`processor::AiGuardProcessor`], the input/output hook the gateway calls
//!
//! ## Example
//!
//! ```rust,ignore
//! use aiguard_runtime::{AiGuardProcessor, GuardConfig, Processor};
//!
//! let processor = AiGuardProcessor::from_config(GuardConfig::from_env()?)?;
//! let decision = processor
//!     .process_input(prompt, &metadata, &parameters, &request)
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod processor;

pub use client::{AiGuardClient, ApiToken, ApiVersion, EvaluationRequest, GuardClient, TokenSource};
pub use config::{ConfigError, GuardConfig};
pub use processor::{
    AiGuardProcessor, Processor, ProcessorError, ProcessorInfo, Signature, PROCESSOR_NAME,
    PROCESSOR_NAMESPACE,
};
