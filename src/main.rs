use clap::{Arg, ArgAction, Command};

mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let matches = Command::new("mrun")
        .version(VERSION)
        .about("Run containerized computational models against local data")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("models")
                .about("List the models a catalog defines")
                .arg(
                    Arg::new("catalog")
                        .short('c')
                        .long("catalog")
                        .value_name("FILE")
                        .help("Catalog JSON file")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("doctor")
                .about("Check the container engine and local image availability")
                .arg(
                    Arg::new("catalog")
                        .short('c')
                        .long("catalog")
                        .value_name("FILE")
                        .help("Also report which catalog images are present locally"),
                )
                .arg(
                    Arg::new("engine")
                        .long("engine")
                        .value_name("PATH")
                        .help("Explicit container engine binary"),
                ),
        )
        .subcommand(
            Command::new("run")
                .about("Run one model against a data directory")
                .arg(
                    Arg::new("catalog")
                        .short('c')
                        .long("catalog")
                        .value_name("FILE")
                        .required(true),
                )
                .arg(
                    Arg::new("model")
                        .short('m')
                        .long("model")
                        .value_name("NAME")
                        .help("Model identifier or display label")
                        .required(true),
                )
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .value_name("DIR")
                        .help("Host directory mounted as the container's input and output data")
                        .required(true),
                )
                .arg(
                    Arg::new("engine")
                        .long("engine")
                        .value_name("PATH")
                        .help("Explicit container engine binary"),
                )
                .arg(
                    Arg::new("gpu")
                        .long("gpu")
                        .action(ArgAction::SetTrue)
                        .help("Use the GPU image variant and expose all accelerators"),
                )
                .arg(
                    Arg::new("no-cache")
                        .long("no-cache")
                        .action(ArgAction::SetTrue)
                        .help("Force a refresh of a locally present image"),
                )
                .arg(
                    Arg::new("pull")
                        .long("pull")
                        .action(ArgAction::SetTrue)
                        .help("Prefer pulling the pre-built image over a local build"),
                )
                .arg(
                    Arg::new("args")
                        .value_name("ARGS")
                        .num_args(0..)
                        .last(true)
                        .help("Extra arguments appended after the container entrypoint"),
                ),
        )
        .get_matches();

    let result = match matches.subcommand() {
        Some(("models", sub_matches)) => commands::models::run(sub_matches).await,
        Some(("doctor", sub_matches)) => commands::doctor::run(sub_matches).await,
        Some(("run", sub_matches)) => commands::run::run(sub_matches).await,
        _ => unreachable!("subcommand is required"),
    };

    if let Err(error) = result {
        eprintln!("✗ {error:#}");
        std::process::exit(1);
    }
}
