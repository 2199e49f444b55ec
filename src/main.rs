//! erpdash main entry point

use clap::Parser;
use erpdash_api::start_server;
use erpdash_client::HttpErpSource;
use erpdash_config::Config;
use erpdash_core::ErpService;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "erpdash")]
#[command(version = "0.1.0")]
#[command(about = "A lightweight dashboard server for ERP accounting and inventory APIs", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    // a missing default config file falls back to built-in defaults
    let (config, from_file) = if !args.config.exists() && args.config == Config::default_path() {
        (Config::default(), false)
    } else {
        let config = Config::load(&args.config).map_err(|e| {
            anyhow::anyhow!("Failed to load configuration from {}\n{}", args.config.display(), e.to_details())
        })?;
        (config, true)
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str()))
        .init();

    if from_file {
        log::info!("Config loaded from {}", args.config.display());
    } else {
        log::warn!("{} not found, using default configuration", args.config.display());
    }

    let source = HttpErpSource::from_config(&config)?;
    let service = ErpService::new(Arc::new(source));

    let rt = Runtime::new()?;
    rt.block_on(start_server(config, service))
}
