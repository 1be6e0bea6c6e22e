//! Browser driver client
//!
//! The driver is any long-running process that speaks the `cellops-driver`
//! line protocol on stdio: one request line in, one response line out.
//! Responses are read on a dedicated thread so every request can be waited
//! on with a deadline.

use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use cellops_driver::{
    ClickPayload, DriverRequest, DriverResponse, EvaluatePayload, GotoPayload, Operation,
    ProtocolError, ScreenshotPayload,
};
use serde::Serialize;
use serde_json::Value;

/// Driver errors
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("driver command is empty; set [smoke] driver or pass --driver")]
    EmptyCommand,

    #[error("failed to spawn driver '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("driver I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("driver protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("driver exited before answering {0}")]
    Closed(&'static str),

    #[error("driver did not answer {op} within {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("unexpected {op} result: {reason}")]
    UnexpectedPayload { op: &'static str, reason: String },
}

/// Operations the smoke scenario needs from a browser
pub trait Driver {
    fn goto(&mut self, url: &str) -> Result<(), DriverError>;

    /// Evaluate a JavaScript expression and return its JSON value.
    fn evaluate(&mut self, expression: &str) -> Result<Value, DriverError>;

    fn click(&mut self, selector: &str) -> Result<(), DriverError>;

    fn screenshot(&mut self, path: &Path) -> Result<(), DriverError>;

    /// Console messages logged since the previous call.
    fn drain_console(&mut self) -> Result<Vec<String>, DriverError>;

    fn close(&mut self) -> Result<(), DriverError>;
}

/// Driver backed by a child process
#[derive(Debug)]
pub struct ProcessDriver {
    child: Child,
    stdin: ChildStdin,
    responses: Receiver<io::Result<String>>,
    request_timeout: Duration,
    next_id: u64,
    closed: bool,
}

/// Forward stdout lines until EOF or a read error; dropping the sender
/// tells the driver side the process is gone.
fn read_responses(stdout: ChildStdout) -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
    rx
}

impl ProcessDriver {
    /// Spawn `argv[0]` with the remaining arguments. Each request fails with
    /// [`DriverError::Timeout`] when no response arrives within
    /// `request_timeout`.
    pub fn spawn(argv: &[String], request_timeout: Duration) -> Result<Self, DriverError> {
        let (program, args) = argv.split_first().ok_or(DriverError::EmptyCommand)?;

        log::debug!("spawning driver: {}", argv.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| DriverError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "driver stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "driver stdout unavailable"))?;

        Ok(Self {
            child,
            stdin,
            responses: read_responses(stdout),
            request_timeout,
            next_id: 0,
            closed: false,
        })
    }

    fn kill(&mut self) {
        self.closed = true;
        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    fn call<P: Serialize>(&mut self, op: Operation, payload: &P) -> Result<Value, DriverError> {
        self.next_id += 1;
        let request_id = format!("req-{}", self.next_id);
        let request = DriverRequest::with_payload(request_id.as_str(), op, payload)?;

        log::debug!("driver <- {} ({})", op.as_str(), request_id);
        writeln!(self.stdin, "{}", request.to_line()?)?;
        self.stdin.flush()?;

        let line = match self.responses.recv_timeout(self.request_timeout) {
            Ok(line) => line?,
            Err(RecvTimeoutError::Disconnected) => return Err(DriverError::Closed(op.as_str())),
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "driver did not answer {} within {:?}; killing it",
                    op.as_str(),
                    self.request_timeout
                );
                self.kill();
                return Err(DriverError::Timeout {
                    op: op.as_str(),
                    after: self.request_timeout,
                });
            }
        };

        let response = DriverResponse::from_line(&line)?;
        Ok(response.into_payload(&request_id)?)
    }
}

impl Driver for ProcessDriver {
    fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.call(Operation::Goto, &GotoPayload { url: url.to_string() })?;
        Ok(())
    }

    fn evaluate(&mut self, expression: &str) -> Result<Value, DriverError> {
        self.call(
            Operation::Evaluate,
            &EvaluatePayload {
                expression: expression.to_string(),
            },
        )
    }

    fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        self.call(
            Operation::Click,
            &ClickPayload {
                selector: selector.to_string(),
            },
        )?;
        Ok(())
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), DriverError> {
        self.call(
            Operation::Screenshot,
            &ScreenshotPayload {
                path: path.to_string_lossy().into_owned(),
            },
        )?;
        Ok(())
    }

    fn drain_console(&mut self) -> Result<Vec<String>, DriverError> {
        let value = self.call(Operation::Console, &Value::Null)?;
        match value {
            Value::Null => Ok(Vec::new()),
            other => serde_json::from_value(other).map_err(|e| DriverError::UnexpectedPayload {
                op: Operation::Console.as_str(),
                reason: e.to_string(),
            }),
        }
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let result = self.call(Operation::Close, &Value::Null);
        if result.is_err() {
            self.kill();
        } else {
            let _ = self.child.wait();
        }
        result.map(|_| ())
    }
}

impl Drop for ProcessDriver {
    fn drop(&mut self) {
        if !self.closed {
            self.kill();
        }
    }
}
