use anyhow::Result;
use log::warn;
use prometheus::{histogram_opts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

#[derive(Debug)]
pub struct Metrics {
    // Execution client RPC
    pub eth1_api_request_times: HistogramVec,
    pub eth1_api_errors_count: IntCounterVec,

    // Deposit synchronization
    pub eth1_last_requested_block: IntGauge,
    pub eth1_processed_deposits: IntCounter,
    pub eth1_log_batch_size: IntGauge,
    pub eth1_header_cache_size: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            eth1_api_request_times: HistogramVec::new(
                histogram_opts!("ETH1_API_REQUEST_TIMES", "Times for execution client RPC calls"),
                &["method"],
            )?,

            eth1_api_errors_count: IntCounterVec::new(
                Opts::new("ETH1_API_ERRORS_COUNT", "Number of failed execution client RPC calls"),
                &["method"],
            )?,

            eth1_last_requested_block: IntGauge::new(
                "ETH1_LAST_REQUESTED_BLOCK",
                "Number of the last execution block scanned for deposits",
            )?,

            eth1_processed_deposits: IntCounter::new(
                "ETH1_PROCESSED_DEPOSITS",
                "Number of deposits inserted into the deposit tree",
            )?,

            eth1_log_batch_size: IntGauge::new(
                "ETH1_LOG_BATCH_SIZE",
                "Current width in blocks of deposit log queries",
            )?,

            eth1_header_cache_size: IntGauge::new(
                "ETH1_HEADER_CACHE_SIZE",
                "Number of execution block headers in the header cache",
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.eth1_api_request_times.clone()))?;
        registry.register(Box::new(self.eth1_api_errors_count.clone()))?;
        registry.register(Box::new(self.eth1_last_requested_block.clone()))?;
        registry.register(Box::new(self.eth1_processed_deposits.clone()))?;
        registry.register(Box::new(self.eth1_log_batch_size.clone()))?;
        registry.register(Box::new(self.eth1_header_cache_size.clone()))?;
        Ok(())
    }

    pub fn register_with_default_metrics(&self) -> Result<()> {
        self.register(prometheus::default_registry())
    }

    pub fn observe_eth1_api_error(&self, method: &str) {
        match self.eth1_api_errors_count.get_metric_with_label_values(&[method]) {
            Ok(counter) => counter.inc(),
            Err(error) => warn!("unable to observe error count for {method}: {error}"),
        }
    }

    pub fn set_eth1_last_requested_block(&self, block_number: u64) {
        self.eth1_last_requested_block
            .set(block_number.try_into().unwrap_or(i64::MAX));
    }

    pub fn set_eth1_log_batch_size(&self, batch_size: u64) {
        self.eth1_log_batch_size
            .set(batch_size.try_into().unwrap_or(i64::MAX));
    }

    pub fn set_eth1_header_cache_size(&self, size: usize) {
        self.eth1_header_cache_size
            .set(size.try_into().unwrap_or(i64::MAX));
    }
}
