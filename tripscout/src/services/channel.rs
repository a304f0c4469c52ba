//! Tool invocation over a worker
//!
//! Wraps an [`RpcWorker`] with lazy start, the optional MCP handshake, tool
//! discovery and the `tools/call` result envelope.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::ServiceError;
use crate::rpc::RpcWorker;
use crate::rpc::messages::{
    InitializeParams, METHOD_INITIALIZE, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, ToolCallParams, ToolCallResult,
    ToolInfo, ToolsListResult,
};

pub struct ToolChannel {
    worker: Box<dyn RpcWorker>,
    handshake: bool,
    initialized: bool,
    last_fault: Option<String>,
}

impl ToolChannel {
    /// `handshake` sends `initialize` after every (re)start
    pub fn new(worker: Box<dyn RpcWorker>, handshake: bool) -> Self {
        Self {
            worker,
            handshake,
            initialized: false,
            last_fault: None,
        }
    }

    pub fn name(&self) -> &str {
        self.worker.name()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Start the worker if needed and complete the handshake
    pub async fn ensure_started(&mut self) -> Result<(), ServiceError> {
        if !self.worker.is_running() {
            debug!(worker = %self.name(), "ToolChannel::ensure_started: starting worker");
            self.worker.start().await?;
            self.initialized = false;
        }
        if self.handshake && !self.initialized {
            let params = serde_json::to_value(InitializeParams::for_this_client()).map_err(|source| {
                ServiceError::Decode {
                    worker: self.name().to_string(),
                    source,
                }
            })?;
            let result = self.request(METHOD_INITIALIZE, params).await?;
            info!(worker = %self.name(), server = %result["serverInfo"], "Worker initialized");
            self.initialized = true;
        }
        Ok(())
    }

    /// Discover the worker's tools
    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, ServiceError> {
        debug!(worker = %self.name(), "ToolChannel::list_tools: called");
        self.ensure_started().await?;
        let result = self.request(METHOD_TOOLS_LIST, Value::Object(Default::default())).await?;
        let list: ToolsListResult = serde_json::from_value(result).map_err(|source| ServiceError::Decode {
            worker: self.name().to_string(),
            source,
        })?;
        debug!(count = list.tools.len(), "ToolChannel::list_tools: discovered tools");
        Ok(list.tools)
    }

    /// Look up one tool by name
    pub async fn find_tool(&mut self, tool: &str) -> Result<ToolInfo, ServiceError> {
        debug!(worker = %self.name(), %tool, "ToolChannel::find_tool: called");
        let tools = self.list_tools().await?;
        tools
            .into_iter()
            .find(|t| t.name == tool)
            .ok_or_else(|| ServiceError::ToolNotFound {
                worker: self.name().to_string(),
                tool: tool.to_string(),
            })
    }

    /// Invoke a tool and return the payload of its first content block
    pub async fn call_tool(&mut self, tool: &str, arguments: Value) -> Result<Value, ServiceError> {
        debug!(worker = %self.name(), %tool, %arguments, "ToolChannel::call_tool: called");
        self.ensure_started().await?;

        let params = ToolCallParams {
            name: tool.to_string(),
            arguments,
        };
        let params = serde_json::to_value(params).map_err(|source| ServiceError::Decode {
            worker: self.name().to_string(),
            source,
        })?;
        let result = self.request(METHOD_TOOLS_CALL, params).await?;
        let result: ToolCallResult = serde_json::from_value(result).map_err(|source| ServiceError::Decode {
            worker: self.name().to_string(),
            source,
        })?;

        if result.is_error {
            let message = result
                .content
                .first()
                .and_then(|c| c.text.clone())
                .unwrap_or_else(|| "no message".to_string());
            return Err(ServiceError::ToolFailed {
                tool: tool.to_string(),
                message,
            });
        }

        result
            .content
            .first()
            .and_then(|block| block.payload())
            .ok_or_else(|| ServiceError::EmptyPayload { tool: tool.to_string() })
    }

    /// Log a failed operation and remember it if the worker is at fault
    ///
    /// A worker that has exited or lost request pairing is stopped so the
    /// next operation starts a fresh process.
    pub async fn note_failure(&mut self, operation: &str, err: &ServiceError) {
        warn!(worker = %self.name(), %operation, error = %err, "Service call failed");
        if !err.is_transport() {
            return;
        }
        self.last_fault = Some(err.to_string());
        let unrecoverable = match err {
            ServiceError::Transport(e) => e.is_fatal(),
            ServiceError::NoResponse { .. } => true,
            _ => false,
        };
        if unrecoverable {
            info!(worker = %self.name(), "Stopping failed worker; it restarts on next use");
            self.worker.stop().await;
            self.initialized = false;
        }
    }

    /// Most recent transport fault, cleared by reading it
    pub fn take_fault(&mut self) -> Option<String> {
        self.last_fault.take()
    }

    pub async fn shutdown(&mut self) {
        debug!(worker = %self.name(), "ToolChannel::shutdown: called");
        self.worker.stop().await;
        self.initialized = false;
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value, ServiceError> {
        let worker = self.name().to_string();
        let response = self
            .worker
            .call(method, params)
            .await?
            .ok_or_else(|| ServiceError::NoResponse { worker: worker.clone() })?;

        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            let message = error["message"]
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| error.to_string());
            return Err(ServiceError::Rpc {
                worker,
                method: method.to_string(),
                message,
            });
        }

        match response.get("result") {
            Some(result) if !result.is_null() => Ok(result.clone()),
            _ => Err(ServiceError::Rpc {
                worker,
                method: method.to_string(),
                message: "response has no result".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::rpc::transport::mock::{ScriptedWorker, error_result, json_result, text_result};
    use crate::rpc::{ProcessWorker, TransportError, WorkerSpec};
    use serde_json::json;

    #[tokio::test]
    async fn test_lazy_start_and_handshake() {
        let worker = ScriptedWorker::new("poi", |method, _| {
            Ok(Some(json!({"jsonrpc": "2.0", "id": 1, "result": {"method": method}})))
        });
        let log = worker.call_log();
        let starts = worker.start_count();
        let mut channel = ToolChannel::new(Box::new(worker), true);
        assert!(!channel.is_running());

        channel.ensure_started().await.unwrap();
        channel.ensure_started().await.unwrap();

        assert_eq!(*starts.lock().unwrap(), 1);
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].method, "initialize");
        assert_eq!(log[0].params["protocolVersion"], "2024-11-05");
    }

    #[tokio::test]
    async fn test_no_handshake_when_disabled() {
        let worker = ScriptedWorker::tools("acc", |_, _| Some(text_result(json!({"searchResults": []}))));
        let log = worker.call_log();
        let mut channel = ToolChannel::new(Box::new(worker), false);

        channel.call_tool("airbnb_search", json!({"location": "Kiev"})).await.unwrap();
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].tool(), Some("airbnb_search"));
    }

    #[tokio::test]
    async fn test_call_tool_decodes_both_block_kinds() {
        let worker = ScriptedWorker::tools("w", |tool, _| match tool {
            "as_text" => Some(text_result(json!({"a": 1}))),
            _ => Some(json_result(json!({"b": 2}))),
        });
        let mut channel = ToolChannel::new(Box::new(worker), false);
        assert_eq!(channel.call_tool("as_text", json!({})).await.unwrap(), json!({"a": 1}));
        assert_eq!(channel.call_tool("as_json", json!({})).await.unwrap(), json!({"b": 2}));
    }

    #[tokio::test]
    async fn test_error_flag_and_missing_result() {
        let worker = ScriptedWorker::tools("w", |tool, _| match tool {
            "flagged" => Some(error_result("quota exceeded")),
            "bare" => Some(json!({"jsonrpc": "2.0", "id": 1})),
            _ => Some(json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32601, "message": "no such tool"}})),
        });
        let mut channel = ToolChannel::new(Box::new(worker), false);

        let err = channel.call_tool("flagged", json!({})).await.unwrap_err();
        assert!(matches!(err, ServiceError::ToolFailed { ref message, .. } if message == "quota exceeded"));

        let err = channel.call_tool("bare", json!({})).await.unwrap_err();
        assert!(matches!(err, ServiceError::Rpc { .. }));

        let err = channel.call_tool("other", json!({})).await.unwrap_err();
        assert!(matches!(err, ServiceError::Rpc { ref message, .. } if message == "no such tool"));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_find_tool() {
        let worker = ScriptedWorker::new("acc", |_, _| {
            Ok(Some(json!({
                "jsonrpc": "2.0", "id": 1,
                "result": {"tools": [
                    {"name": "airbnb_search", "description": "Search", "inputSchema": {"type": "object"}},
                    {"name": "airbnb_listing_details"}
                ]}
            })))
        });
        let mut channel = ToolChannel::new(Box::new(worker), false);
        let tool = channel.find_tool("airbnb_search").await.unwrap();
        assert_eq!(tool.input_schema["type"], "object");

        let err = channel.find_tool("search_nearby").await.unwrap_err();
        assert!(matches!(err, ServiceError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_fatal_fault_is_recorded_and_worker_restarted() {
        let mut calls = 0;
        let worker = ScriptedWorker::new("poi", move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(TransportError::WorkerExited {
                    worker: "poi".to_string(),
                    status: "signal: 9".to_string(),
                })
            } else {
                Ok(Some(json_result(json!({"data": []}))))
            }
        });
        let starts = worker.start_count();
        let stops = worker.stop_count();
        let mut channel = ToolChannel::new(Box::new(worker), false);

        let err = channel.call_tool("search_locations", json!({})).await.unwrap_err();
        channel.note_failure("search", &err).await;
        let fault = channel.take_fault().unwrap();
        assert!(fault.contains("signal: 9"));
        assert!(channel.take_fault().is_none());
        assert_eq!(*stops.lock().unwrap(), 1);

        channel.call_tool("search_locations", json!({})).await.unwrap();
        assert_eq!(*starts.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_lost_pairing_stops_process_and_next_call_restarts() {
        let reply = r#"{"jsonrpc":"2.0","id":1,"result":{"content":[{"type":"json","json":{"ok":true}}]}}"#;
        let script = format!("echo up >&2; while read line; do sleep 1; echo '{}'; done", reply);
        let command = vec!["sh".to_string(), "-c".to_string(), script];
        let spec = WorkerSpec::from_command("late", &command)
            .unwrap()
            .with_shutdown_grace(Duration::from_millis(500));
        let mut channel = ToolChannel::new(Box::new(ProcessWorker::new(spec)), false);
        channel.ensure_started().await.unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            channel.call_tool("search_locations", json!({})),
        )
        .await;
        assert!(abandoned.is_err());

        let err = channel.call_tool("search_locations", json!({})).await.unwrap_err();
        assert!(matches!(err, ServiceError::Transport(TransportError::Desynchronized { .. })));
        channel.note_failure("search", &err).await;
        assert!(!channel.is_running());
        assert!(channel.take_fault().unwrap().contains("can no longer be paired"));

        let payload = channel.call_tool("search_locations", json!({})).await.unwrap();
        assert_eq!(payload, json!({"ok": true}));
        assert!(channel.is_running());
        channel.shutdown().await;
    }

    #[tokio::test]
    async fn test_domain_failure_is_not_a_fault() {
        let worker = ScriptedWorker::tools("acc", |_, _| Some(error_result("blocked")));
        let stops = worker.stop_count();
        let mut channel = ToolChannel::new(Box::new(worker), false);
        let err = channel.call_tool("airbnb_search", json!({})).await.unwrap_err();
        channel.note_failure("search", &err).await;
        assert!(channel.take_fault().is_none());
        assert_eq!(*stops.lock().unwrap(), 0);
    }
}
