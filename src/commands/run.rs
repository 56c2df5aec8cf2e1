use std::path::PathBuf;

use anyhow::Context;
use clap::ArgMatches;
use mrun_runtime::{EngineConfig, ExecutionRequest, FnSink, ModelRunner, Registry};

pub async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let catalog = matches.get_one::<String>("catalog").expect("required arg");
    let model = matches.get_one::<String>("model").expect("required arg");
    let data = matches.get_one::<String>("data").expect("required arg");

    let registry =
        Registry::load(catalog).with_context(|| format!("failed to load catalog {catalog}"))?;

    let mut config = EngineConfig::default();
    if let Some(binary) = matches.get_one::<String>("engine") {
        config.binary = Some(PathBuf::from(binary));
    }
    let runner = ModelRunner::new(registry, config);

    // Volume mounts need an absolute host path.
    let data_dir = std::fs::canonicalize(data)
        .with_context(|| format!("data directory {data} does not exist"))?;

    let mut request = ExecutionRequest::new(model.clone(), data_dir);
    request.use_gpu = matches.get_flag("gpu");
    request.no_cache = matches.get_flag("no-cache");
    request.prefer_pull = matches.get_flag("pull");
    request.extra_args = matches
        .get_many::<String>("args")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let sink = FnSink(|line: &str| println!("{line}"));
    let outcome = runner.process(&request, &sink).await?;

    println!("\nMapped outputs:");
    for output in &outcome.outputs.outputs {
        println!(
            "  {} label {} {} rgb({:.2}, {:.2}, {:.2})",
            output.file_path.display(),
            output.label_id,
            output.segment_name,
            output.color[0],
            output.color[1],
            output.color[2],
        );
    }
    for table in &outcome.outputs.color_tables {
        println!("  color table for {} ({} entries)", table.file, table.entries.len());
    }
    println!(
        "\n✓ Completed in {:.2}s (exit {})",
        outcome.result.execution_time_ms as f64 / 1000.0,
        outcome.result.exit_code,
    );
    Ok(())
}
