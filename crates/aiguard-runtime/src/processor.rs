//! Gateway processor.
//!
//! The host gateway calls [`Processor::process_input`] for every prompt
//! and [`Processor::process_output`] for every completion. Each call makes
//! at most one evaluation request:
//!
//! ```text
//! envelope ──► preflight ──► GuardClient::evaluate ──► decide ──► Decision
//!                 │                                        ▲
//!                 └──────────── skip (no action / empty) ──┘
//! ```

use std::fmt;
use std::sync::Arc;

use aiguard_core::{
    decide, preflight, ContractViolation, Decision, Envelope, Metadata, Phase, Preflight,
    ProcessorParameters, RequestContext, RequestInput, ResponseOutput, SkipReason,
};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::client::{AiGuardClient, EvaluationRequest, GuardClient};
use crate::config::{ConfigError, GuardConfig, DEFAULT_APP_NAME};

/// Name the processor registers under.
pub const PROCESSOR_NAME: &str = "pangea-ai-guard";

/// Namespace the processor registers under.
pub const PROCESSOR_NAMESPACE: &str = "guardrails";

/// Errors from a processing phase that are not policy outcomes.
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Contract violation: {0}")]
    Contract(#[from] ContractViolation),
}

/// Which phases a processor takes part in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signature {
    Input,
    Output,
    #[default]
    Both,
}

impl Signature {
    pub fn handles(self, phase: Phase) -> bool {
        matches!(
            (self, phase),
            (Signature::Both, _)
                | (Signature::Input, Phase::Input)
                | (Signature::Output, Phase::Output)
        )
    }
}

/// Registration details reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessorInfo {
    pub name: String,
    pub version: String,
    pub namespace: String,
    pub signature: Signature,
}

impl Default for ProcessorInfo {
    fn default() -> Self {
        Self {
            name: PROCESSOR_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            namespace: PROCESSOR_NAMESPACE.to_string(),
            signature: Signature::default(),
        }
    }
}

impl fmt::Display for ProcessorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.namespace, self.name, self.version)
    }
}

/// A gateway processor hook.
#[async_trait]
pub trait Processor: Send + Sync {
    fn info(&self) -> &ProcessorInfo;

    /// Inspect a prompt before it reaches the model.
    async fn process_input(
        &self,
        prompt: RequestInput,
        metadata: &Metadata,
        parameters: &ProcessorParameters,
        request: &RequestContext,
    ) -> Result<Decision<RequestInput>, ProcessorError>;

    /// Inspect a completion before it reaches the client.
    ///
    /// `prompt` is the request that produced the response. It is not
    /// evaluated again.
    async fn process_output(
        &self,
        prompt: Option<&RequestInput>,
        response: ResponseOutput,
        metadata: &Metadata,
        parameters: &ProcessorParameters,
        request: &RequestContext,
    ) -> Result<Decision<ResponseOutput>, ProcessorError>;
}

/// Processor backed by the AI Guard evaluation service.
pub struct AiGuardProcessor {
    client: Arc<dyn GuardClient>,
    info: ProcessorInfo,
    app_name: String,
}

impl AiGuardProcessor {
    pub fn new(client: Arc<dyn GuardClient>) -> Self {
        Self {
            client,
            info: ProcessorInfo::default(),
            app_name: DEFAULT_APP_NAME.to_string(),
        }
    }

    /// Build the processor and its HTTP client from configuration.
    pub fn from_config(config: GuardConfig) -> Result<Self, ConfigError> {
        let app_name = config.app_name.clone();
        let client = AiGuardClient::from_config(config)?;
        Ok(Self::new(Arc::new(client)).with_app_name(app_name))
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.info.signature = signature;
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    async fn run_phase<E: Envelope + Send>(
        &self,
        phase: Phase,
        envelope: E,
        parameters: &ProcessorParameters,
    ) -> Result<Decision<E>, ProcessorError> {
        if !self.info.signature.handles(phase) {
            tracing::debug!(phase = %phase, signature = ?self.info.signature, "Phase not handled");
            return Ok(Decision::pass());
        }

        let skip_empty = self.client.api_version().skips_empty_conversation();
        let messages = match preflight(parameters, &envelope, skip_empty) {
            Preflight::Skip(reason) => {
                match reason {
                    SkipReason::NoAction => {
                        tracing::debug!(phase = %phase, "No action requested, skipping evaluation")
                    }
                    SkipReason::NoMessages => {
                        tracing::debug!(phase = %phase, "No messages, skipping evaluation")
                    }
                }
                return Ok(Decision::pass());
            }
            Preflight::Evaluate(messages) => messages,
        };

        let request = EvaluationRequest {
            phase,
            recipe: phase.recipe(parameters).map(str::to_string),
            app_name: self.app_name.clone(),
            messages,
        };

        tracing::debug!(
            phase = %phase,
            client = self.client.name(),
            recipe = request.recipe.as_deref().unwrap_or("-"),
            messages = request.messages.len(),
            "Evaluating conversation"
        );

        let outcome = self.client.evaluate(&request).await;
        if let Err(failure) = &outcome {
            tracing::warn!(phase = %phase, detail = %failure.detail, "AI Guard evaluation failed");
        }

        let decision = decide(phase, parameters, envelope, outcome).map_err(|e| {
            tracing::error!(phase = %phase, error = %e, "AI Guard response broke contract");
            ProcessorError::from(e)
        })?;

        if decision.is_blocked() {
            tracing::info!(phase = %phase, blocked = true, "Blocked by AI Guard");
        } else {
            tracing::debug!(
                phase = %phase,
                decision = decision.kind(),
                modified = decision.is_modified(),
                tags = decision.tags().len(),
                "Phase complete"
            );
        }

        Ok(decision)
    }
}

impl fmt::Debug for AiGuardProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiGuardProcessor")
            .field("client", &self.client.name())
            .field("info", &self.info)
            .field("app_name", &self.app_name)
            .finish()
    }
}

fn log_context(phase: Phase, metadata: &Metadata, request: &RequestContext) {
    tracing::debug!(
        phase = %phase,
        metadata_keys = ?metadata.keys().collect::<Vec<_>>(),
        client = request.client.as_deref().unwrap_or("-"),
        headers = ?request.headers.keys().collect::<Vec<_>>(),
        "Processing"
    );
}

#[async_trait]
impl Processor for AiGuardProcessor {
    fn info(&self) -> &ProcessorInfo {
        &self.info
    }

    async fn process_input(
        &self,
        prompt: RequestInput,
        metadata: &Metadata,
        parameters: &ProcessorParameters,
        request: &RequestContext,
    ) -> Result<Decision<RequestInput>, ProcessorError> {
        log_context(Phase::Input, metadata, request);
        self.run_phase(Phase::Input, prompt, parameters).await
    }

    async fn process_output(
        &self,
        _prompt: Option<&RequestInput>,
        response: ResponseOutput,
        metadata: &Metadata,
        parameters: &ProcessorParameters,
        request: &RequestContext,
    ) -> Result<Decision<ResponseOutput>, ProcessorError> {
        log_context(Phase::Output, metadata, request);
        self.run_phase(Phase::Output, response, parameters).await
    }
}
