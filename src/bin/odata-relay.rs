use anyhow::Result;
use clap::arg;
use clap::command;
use clap::Parser;
use odata_relay::server;
use odata_relay::utils::config_loader;
use odata_relay::utils::logging;
use odata_relay::utils::logging::LogLevel;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "odata-relay.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read args
    // -------------------------------

    let args = Args::parse();

    // -------------------------------
    // 2. Load YAML config, start logging
    // -------------------------------

    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level).await?;

    // -------------------------------
    // 3. Serve until ctrl-c
    // -------------------------------

    info!(
        vendor = service_config.vendor.base_url.as_deref().unwrap_or("<unset>"),
        resources = service_config.resources.allow.len(),
        "relay starting..."
    );
    server::server::start(&service_config).await
}
