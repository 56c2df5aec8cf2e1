//! Shared types for the orchestration pipeline

pub mod error;

pub use error::{
    AcquireError, CatalogError, EngineError, ExecError, OutputError, ResolveError, RunnerError,
};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One run request: which model, against which host data directory, and how.
///
/// Transient per invocation; the core reads no ambient state beyond this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Model identifier (or display label) to look up in the registry.
    pub model: String,
    /// Host directory mounted as both the container input and output data
    /// directory. Must be exclusively owned by this request.
    pub data_dir: PathBuf,
    /// Request the GPU image variant and expose all accelerator devices.
    pub use_gpu: bool,
    /// Force a refresh of a locally present image.
    pub no_cache: bool,
    /// Prefer pulling a pre-built image over downloading the recipe and
    /// building locally, where the model allows both.
    pub prefer_pull: bool,
    /// Extra arguments appended verbatim after the container entrypoint.
    pub extra_args: Vec<String>,
}

impl ExecutionRequest {
    pub fn new(model: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            data_dir: data_dir.into(),
            use_gpu: false,
            no_cache: false,
            prefer_pull: false,
            extra_args: Vec::new(),
        }
    }
}

/// Outcome of one container execution, owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code of the container process.
    pub exit_code: i32,
    /// Bounded tail of the captured process output.
    pub log: Vec<String>,
    /// Directory the container wrote its outputs into.
    pub output_dir: PathBuf,
    /// Wall-clock duration of the container run in milliseconds.
    pub execution_time_ms: u64,
    /// Whether the container exited with status zero.
    pub success: bool,
}

/// Line-oriented diagnostic sink.
///
/// The engine calls `line` for every subprocess output line as it is
/// produced (before the blocking call returns) and `step` for high-level
/// step announcements ("Pulling image", "Build complete"). No formatting
/// requirements beyond line-oriented text.
pub trait LogSink: Send + Sync {
    fn line(&self, text: &str);

    fn step(&self, text: &str) {
        self.line(text);
    }
}

/// Adapter turning a plain closure into a [`LogSink`]; `step` lines go
/// through the same closure.
pub struct FnSink<F>(pub F);

impl<F> LogSink for FnSink<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn line(&self, text: &str) {
        (self.0)(text)
    }
}

/// Sink that forwards everything to `tracing` at info level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn line(&self, text: &str) {
        tracing::info!("{text}");
    }

    fn step(&self, text: &str) {
        tracing::info!(step = true, "{text}");
    }
}

/// Sink that records lines and steps in memory, for tests and embedders
/// that render the log after the fact.
#[derive(Debug, Default)]
pub struct CollectSink {
    lines: parking_lot::Mutex<Vec<String>>,
    steps: parking_lot::Mutex<Vec<String>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().clone()
    }
}

impl LogSink for CollectSink {
    fn line(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }

    fn step(&self, text: &str) {
        self.steps.lock().push(text.to_string());
    }
}
