//! Line-delimited JSON-RPC transport over a worker subprocess
//!
//! A worker is spawned with piped stdio. Startup is complete once the worker
//! prints one line on stderr; after that stderr is drained into the log.
//! Each `call` writes one request line to stdin and reads exactly one line
//! back from stdout. There is no read timeout: a stalled worker stalls the
//! caller until the worker is stopped.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::TransportError;
use super::messages::{JsonRpcRequest, REQUEST_ID};

/// The start/call/stop contract shared by real workers and test fakes
#[async_trait]
pub trait RpcWorker: Send {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Whether `start` has succeeded and `stop` has not been called since
    fn is_running(&self) -> bool;

    /// Spawn the worker and wait for its startup line; returns that line
    async fn start(&mut self) -> Result<String, TransportError>;

    /// Send one request and read one response
    ///
    /// `Ok(None)` means the worker answered with nothing (closed or blank line).
    async fn call(&mut self, method: &str, params: Value) -> Result<Option<Value>, TransportError>;

    /// Terminate the worker and release its handles; safe to call repeatedly
    async fn stop(&mut self);
}

/// How to launch a worker
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub shutdown_grace: Duration,
}

impl WorkerSpec {
    /// Build a spec from an argv-style command line
    pub fn from_command(name: impl Into<String>, command: &[String]) -> Result<Self, TransportError> {
        let name = name.into();
        debug!(%name, ?command, "WorkerSpec::from_command: called");
        let (program, args) = command.split_first().ok_or_else(|| TransportError::StartupFailed {
            worker: name.clone(),
            reason: "empty command line".to_string(),
        })?;

        Ok(Self {
            name,
            program: program.clone(),
            args: args.to_vec(),
            env: Vec::new(),
            shutdown_grace: Duration::from_secs(3),
        })
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

struct Running {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr_drain: JoinHandle<()>,
}

/// A worker backed by a real child process
pub struct ProcessWorker {
    spec: WorkerSpec,
    running: Option<Running>,
    banner: String,
    // Set while a request is written but its response not yet read. If a call
    // is abandoned midway the flag stays set and pairing is lost for good.
    in_flight: bool,
    closed: bool,
}

impl ProcessWorker {
    pub fn new(spec: WorkerSpec) -> Self {
        debug!(name = %spec.name, program = %spec.program, "ProcessWorker::new: called");
        Self {
            spec,
            running: None,
            banner: String::new(),
            in_flight: false,
            closed: false,
        }
    }

    /// OS process id of the running worker
    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().and_then(|r| r.child.id())
    }

    fn io_error(&self, source: std::io::Error) -> TransportError {
        TransportError::Io {
            worker: self.spec.name.clone(),
            source,
        }
    }
}

#[async_trait]
impl RpcWorker for ProcessWorker {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn is_running(&self) -> bool {
        self.running.is_some()
    }

    async fn start(&mut self) -> Result<String, TransportError> {
        debug!(worker = %self.spec.name, "ProcessWorker::start: called");
        if self.running.is_some() {
            debug!("ProcessWorker::start: already running");
            return Ok(self.banner.clone());
        }

        let worker = self.spec.name.clone();
        let mut child = Command::new(&self.spec.program)
            .args(&self.spec.args)
            .envs(self.spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                worker: worker.clone(),
                source,
            })?;

        let missing = |stream: &str| TransportError::StartupFailed {
            worker: worker.clone(),
            reason: format!("{} was not captured", stream),
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let mut stderr = BufReader::new(stderr);
        let mut banner = String::new();
        let read = stderr.read_line(&mut banner).await.map_err(|e| self.io_error(e))?;
        if read == 0 {
            let status = match child.wait().await {
                Ok(status) => status.to_string(),
                Err(e) => e.to_string(),
            };
            warn!(%worker, %status, "ProcessWorker::start: worker exited before announcing startup");
            return Err(TransportError::StartupFailed {
                worker,
                reason: format!("closed its diagnostic stream before announcing startup ({})", status),
            });
        }
        let banner = banner.trim().to_string();

        let drain_name = worker.clone();
        let stderr_drain = tokio::spawn(async move {
            let mut lines = stderr.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(worker = %drain_name, %line, "worker stderr");
            }
        });

        self.running = Some(Running {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr_drain,
        });
        info!(%worker, pid = ?self.pid(), %banner, "Worker started");
        self.banner = banner.clone();
        self.in_flight = false;
        self.closed = false;
        Ok(banner)
    }

    async fn call(&mut self, method: &str, params: Value) -> Result<Option<Value>, TransportError> {
        debug!(worker = %self.spec.name, %method, "ProcessWorker::call: called");
        let worker = self.spec.name.clone();
        let Some(running) = self.running.as_mut() else {
            debug!("ProcessWorker::call: not started");
            return Err(TransportError::NotStarted { worker });
        };

        if self.closed {
            debug!("ProcessWorker::call: output stream already closed");
            return Err(TransportError::WorkerExited {
                worker,
                status: "output stream closed".to_string(),
            });
        }
        if let Ok(Some(status)) = running.child.try_wait() {
            debug!(%status, "ProcessWorker::call: worker has exited");
            self.closed = true;
            return Err(TransportError::WorkerExited {
                worker,
                status: status.to_string(),
            });
        }
        if self.in_flight {
            warn!(%worker, "ProcessWorker::call: previous request was never answered");
            return Err(TransportError::Desynchronized { worker });
        }

        let mut line = serde_json::to_string(&JsonRpcRequest::new(method, &params))?;
        line.push('\n');

        self.in_flight = true;
        let written: std::io::Result<()> = async {
            running.stdin.write_all(line.as_bytes()).await?;
            running.stdin.flush().await
        }
        .await;
        if let Err(source) = written {
            debug!(error = %source, "ProcessWorker::call: write failed");
            self.in_flight = false;
            self.closed = true;
            return Err(if source.kind() == std::io::ErrorKind::BrokenPipe {
                TransportError::WorkerExited {
                    worker,
                    status: "input pipe closed".to_string(),
                }
            } else {
                TransportError::Io { worker, source }
            });
        }

        let mut response = String::new();
        let read = running.stdout.read_line(&mut response).await;
        self.in_flight = false;
        let read = match read {
            Ok(n) => n,
            Err(source) => {
                self.closed = true;
                return Err(TransportError::Io { worker, source });
            }
        };

        if read == 0 {
            warn!(%worker, %method, "Worker closed its output stream");
            self.closed = true;
            return Ok(None);
        }

        let trimmed = response.trim();
        if trimmed.is_empty() {
            debug!("ProcessWorker::call: blank response line");
            return Ok(None);
        }

        let value: Value =
            serde_json::from_str(trimmed).map_err(|source| TransportError::MalformedResponse {
                worker: worker.clone(),
                source,
            })?;

        if let Some(id) = value.get("id")
            && !id.is_null()
            && id.as_i64() != Some(REQUEST_ID)
        {
            warn!(%worker, %id, "Response id does not match request id");
        }

        Ok(Some(value))
    }

    async fn stop(&mut self) {
        debug!(worker = %self.spec.name, "ProcessWorker::stop: called");
        let Some(running) = self.running.take() else {
            debug!("ProcessWorker::stop: not running");
            return;
        };
        let Running {
            mut child,
            stdin,
            stdout,
            stderr_drain,
        } = running;
        drop(stdin);
        drop(stdout);

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            debug!(pid, "ProcessWorker::stop: sending SIGTERM");
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                debug!(pid, error = %e, "ProcessWorker::stop: SIGTERM failed");
            }
        }

        match tokio::time::timeout(self.spec.shutdown_grace, child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "ProcessWorker::stop: worker exited"),
            Ok(Err(e)) => warn!(worker = %self.spec.name, error = %e, "Failed to reap worker"),
            Err(_) => {
                warn!(worker = %self.spec.name, "Worker did not exit gracefully, killing");
                if let Err(e) = child.kill().await {
                    warn!(worker = %self.spec.name, error = %e, "Failed to kill worker");
                }
            }
        }

        stderr_drain.abort();
        self.in_flight = false;
        self.closed = false;
        info!(worker = %self.spec.name, "Worker stopped");
    }
}

#[cfg(test)]
pub mod mock {
    //! In-memory worker for unit tests

    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::rpc::messages::METHOD_TOOLS_CALL;

    /// A call received by a [`ScriptedWorker`]
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub method: String,
        pub params: Value,
    }

    impl RecordedCall {
        /// Tool name for `tools/call` requests
        pub fn tool(&self) -> Option<&str> {
            if self.method == METHOD_TOOLS_CALL {
                self.params["name"].as_str()
            } else {
                None
            }
        }

        pub fn arguments(&self) -> &Value {
            &self.params["arguments"]
        }
    }

    pub type CallLog = Arc<Mutex<Vec<RecordedCall>>>;

    type Handler = Box<dyn FnMut(&str, &Value) -> Result<Option<Value>, TransportError> + Send>;

    /// Worker whose responses come from a closure
    pub struct ScriptedWorker {
        name: String,
        running: bool,
        handler: Handler,
        calls: CallLog,
        starts: Arc<Mutex<usize>>,
        stops: Arc<Mutex<usize>>,
    }

    impl ScriptedWorker {
        pub fn new(
            name: &str,
            handler: impl FnMut(&str, &Value) -> Result<Option<Value>, TransportError> + Send + 'static,
        ) -> Self {
            Self {
                name: name.to_string(),
                running: false,
                handler: Box::new(handler),
                calls: Arc::new(Mutex::new(Vec::new())),
                starts: Arc::new(Mutex::new(0)),
                stops: Arc::new(Mutex::new(0)),
            }
        }

        /// Answer every `tools/call` via `tool_handler(tool_name, arguments)`
        pub fn tools(
            name: &str,
            mut tool_handler: impl FnMut(&str, &Value) -> Option<Value> + Send + 'static,
        ) -> Self {
            Self::new(name, move |method, params| {
                if method == METHOD_TOOLS_CALL {
                    let tool = params["name"].as_str().unwrap_or_default();
                    Ok(tool_handler(tool, &params["arguments"]))
                } else {
                    Ok(Some(json!({"jsonrpc": "2.0", "id": 1, "result": {}})))
                }
            })
        }

        pub fn call_log(&self) -> CallLog {
            self.calls.clone()
        }

        pub fn start_count(&self) -> Arc<Mutex<usize>> {
            self.starts.clone()
        }

        pub fn stop_count(&self) -> Arc<Mutex<usize>> {
            self.stops.clone()
        }
    }

    #[async_trait]
    impl RpcWorker for ScriptedWorker {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_running(&self) -> bool {
            self.running
        }

        async fn start(&mut self) -> Result<String, TransportError> {
            self.running = true;
            *self.starts.lock().unwrap() += 1;
            Ok(format!("{} ready", self.name))
        }

        async fn call(&mut self, method: &str, params: Value) -> Result<Option<Value>, TransportError> {
            if !self.running {
                return Err(TransportError::NotStarted {
                    worker: self.name.clone(),
                });
            }
            self.calls.lock().unwrap().push(RecordedCall {
                method: method.to_string(),
                params: params.clone(),
            });
            (self.handler)(method, &params)
        }

        async fn stop(&mut self) {
            if self.running {
                *self.stops.lock().unwrap() += 1;
            }
            self.running = false;
        }
    }

    /// Wrap a payload the way the POI worker does (`json` content block)
    pub fn json_result(payload: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"content": [{"type": "json", "json": payload}]}
        })
    }

    /// Wrap a payload the way the accommodation worker does (`text` block)
    pub fn text_result(payload: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"content": [{"type": "text", "text": payload.to_string()}]}
        })
    }

    /// An error-flagged tool result
    pub fn error_result(message: &str) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"content": [{"type": "text", "text": message}], "isError": true}
        })
    }

    #[tokio::test]
    async fn test_scripted_worker_requires_start() {
        let mut worker = ScriptedWorker::tools("fake", |_, _| None);
        let err = worker.call("tools/list", json!({})).await.unwrap_err();
        assert!(matches!(err, TransportError::NotStarted { .. }));

        worker.start().await.unwrap();
        assert!(worker.call("tools/list", json!({})).await.unwrap().is_some());
        assert_eq!(worker.call_log().lock().unwrap().len(), 1);
    }
}
