use std::path::PathBuf;

use anyhow::Context;
use clap::ArgMatches;
use mrun_runtime::{resolver, ContainerEngine, EngineConfig, FnSink, Registry};

pub async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    println!("🔍 Checking container engine...\n");

    let mut config = EngineConfig::default();
    if let Some(binary) = matches.get_one::<String>("engine") {
        config.binary = Some(PathBuf::from(binary));
    }
    let engine = ContainerEngine::new(config);

    print!("• Engine binary... ");
    match engine.binary() {
        Some(path) => println!("✓ {}", path.display()),
        None => println!("✗ not found"),
    }

    print!("• Engine daemon... ");
    let sink = FnSink(|line: &str| println!("  {line}"));
    if engine.is_runtime_available(&sink).await {
        println!("✓ responding");
    } else {
        println!("✗ not responding");
        std::process::exit(1);
    }

    if let Some(catalog) = matches.get_one::<String>("catalog") {
        let registry =
            Registry::load(catalog).with_context(|| format!("failed to load catalog {catalog}"))?;
        println!("\n📦 Local images:");
        for model in registry.models() {
            let image_ref = resolver::image_ref(model, false)
                .expect("CPU image ref is always resolvable");
            let present = engine.image_present(&image_ref).await?;
            if present {
                println!("  ✓ {} ({})", image_ref, model.label);
            } else {
                println!("  ○ {} ({}) not present", image_ref, model.label);
            }
        }
    }

    Ok(())
}
