use crate::types::PriceRange;
use anyhow::{anyhow, Context, Result};
use opentelemetry::metrics::{Counter, Gauge, MeterProvider};
use opentelemetry::KeyValue;
use opentelemetry_sdk::{metrics::SdkMeterProvider, Resource};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::{Arc, OnceLock};

pub static METRICS: OnceLock<Arc<Metrics>> = OnceLock::new();

pub fn init_metrics(namespace: &str) -> Result<()> {
    let metrics = Arc::new(Metrics::new(namespace)?);

    METRICS
        .set(metrics)
        .map_err(|_| anyhow!("Metric client is already initialized"))?;

    Ok(())
}

/// `None` until [`init_metrics`] ran, which is the case in unit tests.
pub fn get_metrics() -> Option<Arc<Metrics>> {
    METRICS.get().cloned()
}

#[derive(Debug)]
pub struct Metrics {
    pub registry: Registry,
    pub range_min: Gauge<f64>,
    pub range_max: Gauge<f64>,
    pub blocks_processed: Counter<u64>,
    pub transactions_processed: Counter<u64>,
    pub rebin_sweeps: Counter<u64>,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
}

impl Metrics {
    pub fn new(service: &str) -> Result<Self> {
        let registry = Registry::new();

        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .context("Creating metrics exporter")?;

        let provider = SdkMeterProvider::builder()
            .with_reader(exporter)
            .with_resource(Resource::new(vec![KeyValue::new(
                "service.name",
                service.to_string(),
            )]))
            .build();

        let meter = provider.meter(service.to_string());

        Ok(Self {
            registry,
            provider,
            range_min: meter
                .f64_gauge("gas_stats_range_min_gwei")
                .with_description("Lowest gas price observed in the current run.")
                .init(),
            range_max: meter
                .f64_gauge("gas_stats_range_max_gwei")
                .with_description("Highest gas price observed in the current run.")
                .init(),
            blocks_processed: meter
                .u64_counter("gas_stats_blocks_processed")
                .with_description("Blocks fully fetched and cached.")
                .init(),
            transactions_processed: meter
                .u64_counter("gas_stats_transactions_processed")
                .with_description("Transactions fetched together with their receipts.")
                .init(),
            rebin_sweeps: meter
                .u64_counter("gas_stats_rebin_sweeps")
                .with_description("Times every cached block was re-binned after the range widened.")
                .init(),
        })
    }

    pub fn record_block(&self, transactions: usize, range: PriceRange) {
        self.blocks_processed.add(1, &[]);
        self.transactions_processed.add(transactions as u64, &[]);

        if !range.is_empty() {
            self.range_min.record(range.min, &[]);
            self.range_max.record(range.max, &[]);
        }
    }

    pub fn record_rebin_sweep(&self) {
        self.rebin_sweeps.add(1, &[]);
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .context("Encoding metrics")?;

        String::from_utf8(buffer).context("Metrics are not valid UTF-8")
    }
}
