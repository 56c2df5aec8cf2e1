//! Orchestration pipeline
//!
//! Ties the registry, resolver, engine probe, acquisition, execution, and
//! output mapper into one strictly-sequential run: each step's
//! postcondition is the next step's precondition (image present →
//! container runnable → output directory populated), so no reordering is
//! permitted. The runner offers no internal parallelism; callers needing
//! responsiveness spawn `process` on a task and observe the sink.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::catalog::{resolver, Registry};
use crate::config::EngineConfig;
use crate::engine::{acquire, exec, ContainerEngine};
use crate::output::{self, MappedOutputs};
use crate::types::{
    AcquireError, EngineError, ExecutionRequest, ExecutionResult, LogSink, RunnerError,
};

/// Result of one full pipeline run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub result: ExecutionResult,
    pub outputs: MappedOutputs,
}

/// Model-to-container orchestration engine.
///
/// Owns the loaded registry and the engine handle; safe to share behind
/// an `Arc` across concurrent pipeline invocations. Requests targeting
/// the same image reference serialize their acquisition step, so two
/// runs of one model can never race a build or pull of the same tag.
pub struct ModelRunner {
    registry: Arc<Registry>,
    engine: ContainerEngine,
    image_locks: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ModelRunner {
    pub fn new(registry: Registry, config: EngineConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            engine: ContainerEngine::new(config),
            image_locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn engine(&self) -> &ContainerEngine {
        &self.engine
    }

    fn image_lock(&self, image_ref: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.image_locks
            .lock()
            .entry(image_ref.to_string())
            .or_default()
            .clone()
    }

    /// Run the full pipeline for one request.
    ///
    /// Registry lookup → image ref resolution → runtime probe →
    /// acquisition (under the per-imageRef lock) → container execution →
    /// output mapping. Blocks until the container has exited and its
    /// outputs are mapped; diagnostics stream to `sink` throughout.
    pub async fn process(
        &self,
        request: &ExecutionRequest,
        sink: &dyn LogSink,
    ) -> Result<RunOutcome, RunnerError> {
        let started = Instant::now();
        sink.line("Processing started");

        let model = self.registry.find(&request.model)?;
        let image_ref = resolver::image_ref(model, request.use_gpu)?;
        tracing::info!(model = %model.name, %image_ref, "pipeline started");

        if !self.engine.is_runtime_available(sink).await {
            return Err(RunnerError::Engine(EngineError::RuntimeUnavailable(
                "container engine not installed or not running".to_string(),
            )));
        }

        // Acquisition is serialized per image reference so concurrent
        // requests for the same model cannot race on one tag.
        {
            let lock = self.image_lock(&image_ref);
            let _guard = lock.lock().await;

            let present = self
                .engine
                .image_present(&image_ref)
                .await
                .map_err(RunnerError::Engine)?;

            // The pull preference only overrides a build when the model is
            // actually pullable.
            let spec = &model.dockerfile;
            let downloadable = spec.downloadable && !(request.prefer_pull && spec.pullable);

            match acquire::plan(present, request.no_cache, downloadable, spec.pullable) {
                Some(acquire::AcquireAction::Reuse) => {
                    sink.line(&format!("Image {image_ref} already present."));
                }
                Some(acquire::AcquireAction::Build) => {
                    acquire::build(&self.engine, model, request.use_gpu, request.no_cache, sink)
                        .await?;
                }
                Some(acquire::AcquireAction::Pull) => {
                    acquire::pull(&self.engine, model, request.use_gpu, sink).await?;
                }
                None => {
                    return Err(RunnerError::Acquire(AcquireError::ImageUnobtainable {
                        image_ref,
                    }));
                }
            }
        }

        let result = exec::run(
            &self.engine,
            model,
            &request.data_dir,
            request.use_gpu,
            &request.extra_args,
            sink,
        )
        .await?;

        sink.step("Importing outputs");
        let outputs = output::map_outputs(model, &result.output_dir)?;

        sink.step(&format!(
            "Processing completed in {:.2} seconds.",
            started.elapsed().as_secs_f64()
        ));
        Ok(RunOutcome { result, outputs })
    }
}
