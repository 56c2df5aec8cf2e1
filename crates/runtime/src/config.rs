//! Engine configuration
//!
//! All knobs the orchestration engine reads are collected here and passed
//! in explicitly; the engine never mutates process-wide state (notably, it
//! never edits `PATH` to locate the container binary).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Fixed container-side mount point the host data directory is bound to
/// for input data.
pub const INPUT_MOUNT: &str = "/app/data/input_data";

/// Fixed container-side mount point for output data. The contract is that
/// a model writes its outputs back into the same host directory it reads
/// input from.
pub const OUTPUT_MOUNT: &str = "/app/data/output_data";

/// Configuration for container engine discovery and invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Explicit engine binary path. When set, discovery is skipped entirely.
    pub binary: Option<PathBuf>,
    /// Engine binary name searched for when `binary` is not set.
    pub binary_name: String,
    /// Directories searched in addition to `PATH` on POSIX systems.
    /// Covers installs whose credential helpers live outside the default
    /// search path (Docker Desktop puts them in /usr/local/bin).
    pub search_dirs: Vec<PathBuf>,
    /// Target platform passed to every build for reproducibility.
    pub platform: String,
    /// Host user id pinned inside built images for permission parity.
    pub build_uid: u32,
    /// Host group id pinned inside built images.
    pub build_gid: u32,
    /// Container-side input data mount point.
    pub input_mount: String,
    /// Container-side output data mount point.
    pub output_mount: String,
    /// Interpreter for the in-image entrypoint script.
    pub entrypoint_interpreter: String,
    /// Entrypoint script path template; `{model}` is replaced with the
    /// lower-cased model identifier.
    pub entrypoint_template: String,
    /// Number of trailing output lines retained for error reports.
    pub log_tail_lines: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: None,
            binary_name: "docker".to_string(),
            search_dirs: vec![
                PathBuf::from("/usr/local/bin"),
                PathBuf::from("/opt/homebrew/bin"),
            ],
            platform: "linux/amd64".to_string(),
            build_uid: 1001,
            build_gid: 1001,
            input_mount: INPUT_MOUNT.to_string(),
            output_mount: OUTPUT_MOUNT.to_string(),
            entrypoint_interpreter: "python3".to_string(),
            entrypoint_template: "/app/models/{model}/scripts/run.py".to_string(),
            log_tail_lines: 50,
        }
    }
}

impl EngineConfig {
    /// Entrypoint script path for a model identifier.
    pub fn entrypoint_for(&self, model_name: &str) -> String {
        self.entrypoint_template
            .replace("{model}", &model_name.to_lowercase())
    }
}
