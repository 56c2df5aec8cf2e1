//! mrun model-to-container orchestration engine
//!
//! Maps a declarative model catalog to containerized executions: resolves
//! which image implements a model, ensures the image is present locally
//! (reuse, pull, or build from a downloaded recipe), runs it against a
//! host data directory while streaming its log, and maps the declared
//! output files into named, colored segment records.
//!
//! The crate is a library with no UI concerns; hosts drive it through
//! [`ModelRunner::process`] with an [`ExecutionRequest`] and observe
//! progress through a [`LogSink`].

pub mod catalog;
pub mod config;
pub mod engine;
pub mod output;
pub mod pipeline;
pub mod types;

pub use catalog::{resolver, DockerfileSpec, Model, OutputFile, OutputLabel, Registry, Segment};
pub use config::EngineConfig;
pub use engine::acquire::AcquireAction;
pub use engine::ContainerEngine;
pub use output::{ColorTable, ColorTableEntry, MappedOutput, MappedOutputs};
pub use pipeline::{ModelRunner, RunOutcome};
pub use types::{
    AcquireError, CatalogError, CollectSink, EngineError, ExecError, ExecutionRequest,
    ExecutionResult, FnSink, LogSink, OutputError, ResolveError, RunnerError, TracingSink,
};
