use anyhow::Context;
use clap::ArgMatches;
use mrun_runtime::{resolver, Registry};

pub async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let catalog = matches.get_one::<String>("catalog").expect("required arg");
    let registry =
        Registry::load(catalog).with_context(|| format!("failed to load catalog {catalog}"))?;

    for model in registry.models() {
        let image_ref = resolver::image_ref(model, false)
            .expect("CPU image ref is always resolvable");
        println!("• {} [{}]", model.label, model.name);
        println!("    image: {}", image_ref);
        if model.dockerfile.gpu {
            let gpu_ref = resolver::image_ref(model, true).expect("model declares GPU support");
            println!("    gpu image: {}", gpu_ref);
        }
        println!(
            "    acquisition: {}{}",
            if model.dockerfile.downloadable {
                "build from recipe"
            } else if model.dockerfile.pullable {
                "pull"
            } else {
                "out-of-band image required"
            },
            if model.dockerfile.downloadable && model.dockerfile.pullable {
                " (pull available)"
            } else {
                ""
            },
        );
        for output_file in &model.output_files {
            println!(
                "    output: {} ({} label{})",
                output_file.file,
                output_file.labels.len(),
                if output_file.labels.len() == 1 { "" } else { "s" },
            );
        }
    }
    println!("\n{} model(s)", registry.models().len());
    Ok(())
}
