//! Daedalus demo server - Entry point

use std::path::PathBuf;

use anyhow::Context as _;
use daedalus::prelude::*;
use tracing::{error, info};

use daedalus_demo::audit::register_providers;
use daedalus_demo::blueprint::register_routes;

/// Default configuration file, loaded when present.
const DEFAULT_CONFIG_FILE: &str = "daedalus.toml";

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
    /// Start from the development preset.
    dev: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;
        let mut dev = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--dev" | "-d" => dev = true,
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("daedalus-demo {}", daedalus_demo::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config, dev }
    }
}

fn print_help() {
    println!(
        r"Daedalus demo - Declarative pipeline server

USAGE:
    daedalus-demo [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to a TOML configuration file (default: ./daedalus.toml if present)
    -d, --dev              Start from the development preset (pretty logs, lenient resolution)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    DAEDALUS_SERVER_HTTP_ADDR             Listen address (default: 0.0.0.0:8080)
    DAEDALUS_SERVER_REQUEST_TIMEOUT_SECS  Request timeout in seconds (default: 30)
    DAEDALUS_LOG_LEVEL                    Log filter (default: info)
    DAEDALUS_LOG_FORMAT                   json, pretty or compact (default: json)
    DAEDALUS_PIPELINE_STRICT              Fail on unknown spec tokens (default: true)
    DAEDALUS_PIPELINE_DEFAULT_SPEC        Spec for routes registered with an empty spec

EXAMPLES:
    # Run with a configuration file
    daedalus-demo --config /etc/daedalus/demo.toml

    # Run on another port with readable logs
    DAEDALUS_SERVER_HTTP_ADDR=127.0.0.1:3000 daedalus-demo --dev
"
    );
}

fn load_config(args: &Args) -> anyhow::Result<DaedalusConfig> {
    let loader = if args.dev {
        ConfigLoader::new().with_development()
    } else {
        ConfigLoader::new()
    };
    let loader = match &args.config {
        Some(path) => loader
            .with_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => loader.with_optional_file(DEFAULT_CONFIG_FILE)?,
    };
    let config = loader.with_dotenv()?.with_env_prefix("DAEDALUS").load()?;
    Ok(config)
}

async fn run(config: DaedalusConfig) -> anyhow::Result<()> {
    register_providers(&ProviderRegistry::global()).context("registering providers")?;

    let mut registrar = Registrar::new()
        .with_default_spec(&config.pipeline.default_spec)
        .with_options(ChainOptions {
            strict: config.pipeline.strict_resolution,
            max_body_size: config.pipeline.max_body_size,
        });
    register_routes(&mut registrar).context("registering routes")?;
    info!(routes = registrar.routes().len(), "blueprint loaded");

    let server = Server::builder()
        .config(&config.server)
        .pipeline(&config.pipeline)
        .router(registrar.into_router())
        .build();
    info!(
        version = daedalus_demo::VERSION,
        addr = %server.http_addr(),
        timeout_secs = server.request_timeout().as_secs(),
        "starting daedalus demo"
    );
    server.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("daedalus-demo: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!("Server error: {e:#}");
        std::process::exit(1);
    }
}
