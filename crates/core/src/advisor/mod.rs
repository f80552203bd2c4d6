//! AI-backed flows: scalping suggestions and backtest report summaries.

pub mod suggestions;
pub mod summary;

use crate::llm::error::LlmDiagnosticsError;
use crate::llm::Provider;
use std::fmt;

/// Caller-facing failure of an AI flow. The underlying cause is logged, not exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvisorError {
    Upstream {
        flow: &'static str,
        message: &'static str,
    },
    InvalidOutput {
        flow: &'static str,
        message: &'static str,
    },
}

impl AdvisorError {
    pub fn flow(&self) -> &'static str {
        match self {
            AdvisorError::Upstream { flow, .. } | AdvisorError::InvalidOutput { flow, .. } => flow,
        }
    }
}

impl fmt::Display for AdvisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvisorError::Upstream { message, .. } | AdvisorError::InvalidOutput { message, .. } => {
                f.write_str(message)
            }
        }
    }
}

impl std::error::Error for AdvisorError {}

/// Logs a failed collaborator call with whatever the provider sent back. Returns the
/// diagnostics when the failure carried them.
pub(crate) fn log_call_failure<'a>(
    flow: &'static str,
    provider: Provider,
    err: &'a anyhow::Error,
) -> Option<&'a LlmDiagnosticsError> {
    let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() else {
        tracing::error!(?provider, flow, error = %format!("{err:#}"), "AI call failed");
        return None;
    };
    tracing::error!(
        ?provider,
        flow,
        stage = diag.stage,
        detail = %diag.detail,
        provider_error = diag.provider_error_type().unwrap_or("-"),
        raw_output = diag.raw_output_excerpt().as_deref().unwrap_or(""),
        "AI call failed"
    );
    Some(diag)
}
