use std::sync::Arc;

use async_trait::async_trait;
use sandpit_config::{EngineConfig, EngineProviderKind};
use sandpit_core::{AnalysisOutcome, Definitions, FormatSettings, LinterSettings};
use thiserror::Error;

mod mock;
mod process;

pub use mock::MockEngine;
pub use process::ProcessEngine;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine provider 'process' requires a command")]
    MissingCommand,
    #[error("failed to run engine command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("engine command '{command}' exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("engine response decoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// The external analysis engine: parser, semantic checker, linter and formatter.
///
/// Implementations are treated as non-preemptible: once `analyze` is called
/// the caller waits for it or ignores its result, but never cancels it.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    async fn definitions(&self) -> Result<Definitions, EngineError>;

    /// Must tolerate an empty plugin list; parse and semantic stages still run.
    async fn analyze(
        &self,
        code: &str,
        format_settings: Option<&FormatSettings>,
        linter_settings: &LinterSettings,
    ) -> Result<AnalysisOutcome, EngineError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineOverrides {
    pub provider: Option<EngineProviderKind>,
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
}

pub struct LoadedEngine {
    pub engine: Arc<dyn AnalysisEngine>,
    pub engine_name: String,
}

pub fn load_engine(
    config: &EngineConfig,
    overrides: EngineOverrides,
) -> Result<LoadedEngine, EngineError> {
    let selected_provider = overrides.provider.unwrap_or(config.provider);

    match selected_provider {
        EngineProviderKind::Mock => Ok(LoadedEngine {
            engine: Arc::new(MockEngine),
            engine_name: EngineProviderKind::Mock.as_str().to_owned(),
        }),
        EngineProviderKind::Process => {
            let command = first_non_empty(overrides.command, config.command.clone())
                .ok_or(EngineError::MissingCommand)?;
            let args = overrides.args.unwrap_or_else(|| config.args.clone());

            Ok(LoadedEngine {
                engine_name: format!("{}:{command}", EngineProviderKind::Process.as_str()),
                engine: Arc::new(ProcessEngine::new(command, args)),
            })
        }
    }
}

fn first_non_empty(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            fallback
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        })
}
