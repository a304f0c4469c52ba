//! Service client error types

use thiserror::Error;

use crate::rpc::TransportError;

/// Failures of a tool invocation
///
/// Clients never hand these to the session; they degrade to empty values
/// and keep the last transport fault for display.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Worker '{worker}' sent no response")]
    NoResponse { worker: String },

    #[error("Worker '{worker}' answered {method} with an error: {message}")]
    Rpc {
        worker: String,
        method: String,
        message: String,
    },

    #[error("Tool '{tool}' reported an error: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Tool '{tool}' returned no usable payload")]
    EmptyPayload { tool: String },

    #[error("Tool '{tool}' is not offered by worker '{worker}'")]
    ToolNotFound { worker: String, tool: String },

    #[error("Worker '{worker}' sent an unexpected result shape: {source}")]
    Decode {
        worker: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ServiceError {
    /// Whether the failure came from the worker process rather than the data
    pub fn is_transport(&self) -> bool {
        matches!(self, ServiceError::Transport(_) | ServiceError::NoResponse { .. })
    }
}
