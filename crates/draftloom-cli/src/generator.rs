//! Process-backed field generator
//!
//! Each call runs the configured command through `sh -c`, writes one JSON
//! message to its stdin and reads the reply from stdout:
//!
//! ```text
//! {"operation":"generate","request":{...GenerationRequest...}}
//!   → {"outcome":"completed","content":"..."}
//!   → {"outcome":"needs_clarification","clarification":{...}}
//!   → {"outcome":"failed","reason":"..."}
//!
//! {"operation":"clarify","field_id":"field_2","answer":"..."}
//!   → exit status 0 acknowledges; stdout is ignored
//! ```

use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use draftloom_core::{
    generator::{GenerationOutcome, GenerationRequest, GeneratorError},
    FieldGenerator, FieldId,
};
use log::debug;
use serde::Serialize;
use tokio::{io::AsyncWriteExt, process::Command};

/// Message written to the generator command's stdin.
#[derive(Debug, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
enum GeneratorMessage<'a> {
    Generate { request: &'a GenerationRequest },
    Clarify { field_id: &'a FieldId, answer: &'a str },
}

/// Runs an external command for every generation call.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: String,
    timeout: Duration,
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn build_command(&self, operation: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.command);
        cmd.env("DRAFTLOOM_OPERATION", operation);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        // Ctrl-C pauses the shell; the in-flight call must still finish.
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    /// Runs the command with `message` on stdin and returns its stdout.
    async fn exchange(&self, message: &GeneratorMessage<'_>) -> Result<String, GeneratorError> {
        let operation = match message {
            GeneratorMessage::Generate { .. } => "generate",
            GeneratorMessage::Clarify { .. } => "clarify",
        };
        let payload = serde_json::to_string(message).map_err(|e| GeneratorError::Transport {
            message: format!("Failed to serialize request: {e}"),
        })?;

        let mut child = self
            .build_command(operation)
            .spawn()
            .map_err(|e| GeneratorError::Transport {
                message: format!("Failed to start '{}': {e}", self.command),
            })?;

        // The stdin write is bounded by the timeout too.
        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                // Commands that ignore stdin may close it early.
                let _ = stdin.write_all(payload.as_bytes()).await;
                let _ = stdin.shutdown().await;
            }
        };
        let exchange = async move {
            let ((), output) = tokio::join!(write, child.wait_with_output());
            output
        };

        let output = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| GeneratorError::Timeout {
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| GeneratorError::Transport {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GeneratorError::Transport {
                message: format!(
                    "'{}' exited with {}: {}",
                    self.command,
                    output.status,
                    stderr.trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl FieldGenerator for CommandGenerator {
    async fn generate_field(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, GeneratorError> {
        debug!("Running generator for field {}", request.field_id);
        let stdout = self
            .exchange(&GeneratorMessage::Generate { request: &request })
            .await?;
        serde_json::from_str(stdout.trim()).map_err(|e| GeneratorError::InvalidResponse {
            message: format!("{e}; got '{}'", stdout.trim()),
        })
    }

    async fn submit_clarification(
        &self,
        field_id: &FieldId,
        answer: &str,
    ) -> Result<(), GeneratorError> {
        self.exchange(&GeneratorMessage::Clarify { field_id, answer })
            .await
            .map(|_| ())
    }
}

/// Generator used when no command is configured. Editing commands never call
/// it; generation commands fail with a hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl FieldGenerator for Unconfigured {
    async fn generate_field(
        &self,
        _request: GenerationRequest,
    ) -> Result<GenerationOutcome, GeneratorError> {
        Err(GeneratorError::Transport {
            message: "no generator configured; pass --generator or set DRAFTLOOM_GENERATOR"
                .to_string(),
        })
    }
}
