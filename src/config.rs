use crate::histogram::HistogramSettings;
use anyhow::{anyhow, Result};
use clap::Parser;
use reqwest::Url;
use std::net::SocketAddr;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Parser, Clone, Debug)]
pub struct Config {
    #[arg(long, env = "SERVER_ADDRESS", default_value = "0.0.0.0:8080")]
    pub server_address: SocketAddr,

    // JSON-RPC endpoint of the ledger node to read blocks from
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Url,

    // Highest block of the initial run, defaults to the latest block
    #[arg(long, env = "START_BLOCK")]
    pub start_block: Option<u64>,

    #[arg(long, env = "BLOCK_COUNT", default_value_t = 10)]
    pub block_count: u64,

    #[arg(long, env = "NUM_BINS", default_value_t = crate::histogram::DEFAULT_NUM_BINS)]
    pub num_bins: usize,

    #[arg(long, env = "NUM_LEVELS", default_value_t = crate::histogram::DEFAULT_NUM_LEVELS)]
    pub num_levels: u8,

    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,

    // Only serve the control endpoints, wait for POST /run/start
    #[arg(long, env = "NO_AUTOSTART")]
    pub no_autostart: bool,
}

impl Config {
    pub fn histogram_settings(&self) -> Result<HistogramSettings> {
        if self.num_bins == 0 {
            return Err(anyhow!("num_bins must be at least 1"));
        }

        if !(2..=16).contains(&self.num_levels) {
            return Err(anyhow!(
                "num_levels must be between 2 and 16, got {}",
                self.num_levels
            ));
        }

        Ok(HistogramSettings {
            num_bins: self.num_bins,
            num_levels: self.num_levels,
        })
    }
}
