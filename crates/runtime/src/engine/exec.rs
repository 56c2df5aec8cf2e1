//! Container execution
//!
//! Runs one container instance synchronously against a host data
//! directory. The same directory is mounted as both the input and output
//! data location: the contract is that the model writes its outputs back
//! into the directory it reads input from.

use std::path::Path;
use std::time::Instant;

use crate::catalog::{resolver, Model};
use crate::types::{ExecError, ExecutionResult, LogSink};

use super::ContainerEngine;

/// Run the model's container against `data_dir`, blocking until exit.
///
/// Every stdout line is forwarded to the sink as it is produced. A
/// non-zero exit is a fatal [`ExecError::Execution`] carrying the
/// captured log tail.
pub async fn run(
    engine: &ContainerEngine,
    model: &Model,
    data_dir: &Path,
    use_gpu: bool,
    extra_args: &[String],
    sink: &dyn LogSink,
) -> Result<ExecutionResult, ExecError> {
    let image_ref = resolver::image_ref(model, use_gpu)?;
    let config = engine.config();

    let mut args = vec![
        "run".to_string(),
        "--rm".to_string(),
        "--volume".to_string(),
        format!("{}:{}", data_dir.display(), config.input_mount),
        "--volume".to_string(),
        format!("{}:{}", data_dir.display(), config.output_mount),
    ];
    if use_gpu {
        args.push("--gpus".to_string());
        args.push("all".to_string());
    }
    args.push(image_ref.clone());
    args.push(config.entrypoint_interpreter.clone());
    args.push(config.entrypoint_for(&model.name));
    args.extend(extra_args.iter().cloned());

    sink.step(&format!("Running container ({})", args.join(" ")));
    let started = Instant::now();
    let output = engine.stream(&args, sink).await?;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if output.status != 0 {
        return Err(ExecError::Execution {
            image_ref,
            status: output.status,
            tail: output.tail_text(),
        });
    }

    Ok(ExecutionResult {
        exit_code: output.status,
        log: output.tail,
        output_dir: data_dir.to_path_buf(),
        execution_time_ms: elapsed_ms,
        success: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::types::CollectSink;
    use std::path::PathBuf;

    #[cfg(unix)]
    fn probed_fake_engine(dir: &Path, body: &str) -> ContainerEngine {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("docker");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        ContainerEngine::new(EngineConfig {
            binary: Some(path),
            ..EngineConfig::default()
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_streams_and_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let engine = probed_fake_engine(
            dir.path(),
            r#"case "$1" in
info) echo '{"ServerVersion":"24.0.5"}' ;;
run) echo "container says hi" ;;
esac"#,
        );
        let sink = CollectSink::new();
        assert!(engine.is_runtime_available(&sink).await);

        let registry = crate::catalog::Registry::from_json(
            r#"{ "models": [ {
                "name": "Thresholder", "label": "Thresholder",
                "dockerfile": { "repository": "mhubai", "image": "thresholder", "pullable": true }
            } ] }"#,
        )
        .unwrap();
        let model = registry.find("Thresholder").unwrap();

        let result = run(&engine, model, &PathBuf::from("/tmp/data"), false, &[], &sink)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output_dir, PathBuf::from("/tmp/data"));
        assert!(sink.lines().iter().any(|l| l == "container says hi"));

        // The announced command carries the mounts, image ref, and the
        // lower-cased entrypoint convention.
        let announced = sink.steps().join("\n");
        assert!(announced.contains("/tmp/data:/app/data/input_data"));
        assert!(announced.contains("/tmp/data:/app/data/output_data"));
        assert!(announced.contains("mhubai/thresholder:latest"));
        assert!(announced.contains("python3 /app/models/thresholder/scripts/run.py"));
        assert!(!announced.contains("--gpus"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_nonzero_exit_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = probed_fake_engine(
            dir.path(),
            r#"case "$1" in
info) echo '{"ServerVersion":"24.0.5"}' ;;
run) echo "model crashed" >&2; exit 7 ;;
esac"#,
        );
        let sink = CollectSink::new();
        assert!(engine.is_runtime_available(&sink).await);

        let registry = crate::catalog::Registry::from_json(
            r#"{ "models": [ {
                "name": "Thresholder", "label": "Thresholder",
                "dockerfile": { "repository": "mhubai", "image": "thresholder", "pullable": true }
            } ] }"#,
        )
        .unwrap();
        let model = registry.find("Thresholder").unwrap();

        let err = run(&engine, model, &PathBuf::from("/tmp/data"), false, &[], &sink)
            .await
            .unwrap_err();
        match err {
            ExecError::Execution { status, tail, .. } => {
                assert_eq!(status, 7);
                assert!(tail.contains("model crashed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
