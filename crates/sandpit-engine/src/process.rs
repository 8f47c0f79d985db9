use std::process::Stdio;

use async_trait::async_trait;
use sandpit_core::{AnalysisOutcome, Definitions, FormatSettings, LinterSettings};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::{AnalysisEngine, EngineError};

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    code: &'a str,
    format_settings: Option<&'a FormatSettings>,
    linter_settings: &'a LinterSettings,
}

/// Runs an external engine binary once per call.
///
/// `<command> <args..> definitions` prints the definition list as JSON;
/// `<command> <args..> analyze` reads an analyze request on stdin and prints
/// the outcome as JSON.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    command: String,
    args: Vec<String>,
}

impl ProcessEngine {
    pub fn new(command: String, args: Vec<String>) -> Self {
        Self { command, args }
    }

    async fn run(&self, subcommand: &str, stdin: Option<Vec<u8>>) -> Result<Vec<u8>, EngineError> {
        let spawn_error = |source| EngineError::Spawn {
            command: self.command.clone(),
            source,
        };

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(subcommand)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        // Feed stdin while draining stdout and stderr, so neither side can
        // block on a full pipe.
        let pipe = child.stdin.take();
        let feed = async move {
            match (stdin, pipe) {
                (Some(input), Some(mut pipe)) => pipe.write_all(&input).await,
                _ => Ok(()),
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(spawn_error)?;
        if !output.status.success() {
            return Err(EngineError::Exit {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        match fed {
            // The engine answered without reading all of its input.
            Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
            other => other.map_err(spawn_error)?,
        }

        tracing::trace!(
            command = %self.command,
            subcommand,
            bytes = output.stdout.len(),
            "engine process finished"
        );
        Ok(output.stdout)
    }
}

#[async_trait]
impl AnalysisEngine for ProcessEngine {
    async fn definitions(&self) -> Result<Definitions, EngineError> {
        let stdout = self.run("definitions", None).await?;
        Ok(serde_json::from_slice(&stdout)?)
    }

    async fn analyze(
        &self,
        code: &str,
        format_settings: Option<&FormatSettings>,
        linter_settings: &LinterSettings,
    ) -> Result<AnalysisOutcome, EngineError> {
        let request = serde_json::to_vec(&AnalyzeRequest {
            code,
            format_settings,
            linter_settings,
        })?;
        let stdout = self.run("analyze", Some(request)).await?;
        Ok(serde_json::from_slice(&stdout)?)
    }
}
