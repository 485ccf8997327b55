use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use controller::RunController;
use interrupts::{on_panic, on_shutdown_signal};
use logs::init_logs;
use metrics::init_metrics;
use rpc::get_rpc_client;
use server::start_server;
use sink::LogSink;
use std::sync::Arc;
use tracing::{error, info};

mod aggregator;
mod cache;
mod config;
mod controller;
mod errors;
mod gateway;
mod histogram;
mod interrupts;
mod logs;
mod metrics;
mod range;
mod rpc;
mod server;
mod sink;
mod stats;
#[cfg(test)]
mod testing;
mod types;
mod utils;

#[ntex::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Parse the configuration.
    let config = Config::parse();

    // Initialize tracing logger.
    init_logs(config.log_format);

    let settings = config
        .histogram_settings()
        .context("Invalid histogram settings")?;

    init_metrics("gas_stats").context("Initializing metrics")?;

    // log panics
    on_panic(|panic_info| error!(error = %panic_info, "Panic detected!!"));

    info!("Reading blocks from {}", config.rpc_url);
    let gateway = Arc::new(get_rpc_client(config.rpc_url.clone()));
    let sink = Arc::new(LogSink::new(settings.num_levels));
    let controller = Arc::new(RunController::new(gateway, sink, settings));

    if !config.no_autostart {
        let count = i64::try_from(config.block_count).context("Block count out of range")?;

        match config.start_block {
            Some(start) => {
                let start = i64::try_from(start).context("Start block out of range")?;
                controller.start(start, count).await?;
            }
            None => {
                controller.start_from_latest(count).await?;
            }
        }
    }

    // Stop at the next block boundary and let the in-flight block resolve
    let shutdown_controller = controller.clone();
    let shutdown_handler = on_shutdown_signal(move || async move {
        shutdown_controller.stop().await;
        shutdown_controller.wait().await;
    });

    info!("Starting server at {}", &config.server_address);
    start_server(&config.server_address, controller).await?;
    let _ = shutdown_handler.await;

    Ok(())
}
