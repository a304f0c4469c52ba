//! Transport error types

use thiserror::Error;

/// Errors raised while talking to a worker subprocess
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Worker '{worker}' is not started")]
    NotStarted { worker: String },

    #[error("Failed to spawn worker '{worker}': {source}")]
    Spawn {
        worker: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker '{worker}' failed to start: {reason}")]
    StartupFailed { worker: String, reason: String },

    #[error("Worker '{worker}' has exited ({status})")]
    WorkerExited { worker: String, status: String },

    #[error("Worker '{worker}' I/O error: {source}")]
    Io {
        worker: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker '{worker}' sent a malformed response line: {source}")]
    MalformedResponse {
        worker: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Worker '{worker}' has an unanswered request outstanding; responses can no longer be paired")]
    Desynchronized { worker: String },

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl TransportError {
    /// True when the worker process is gone and every further call will fail
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::WorkerExited { .. } | TransportError::Desynchronized { .. }
        )
    }
}
