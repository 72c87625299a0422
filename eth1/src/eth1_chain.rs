use core::{ops::Range, time::Duration};
use std::sync::Arc;

use anyhow::{Context as _, Error as AnyhowError, Result};
use arc_swap::ArcSwapOption;
use deposit_tree::DepositTreeSnapshot;
use eth1_api::{Auth, Eth1Api, HeaderInfo, HttpTransport, ServiceErrorKind, ServiceHealth};
use log::{error, info, warn};
use parking_lot::{Mutex, RwLock};
use prometheus_metrics::Metrics;
use reqwest::Client;
use tokio::{
    sync::oneshot::{self, Sender},
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use types::{
    config::Config as ChainConfig,
    phase0::{
        containers::Deposit,
        primitives::{DepositIndex, ExecutionBlockHash, ExecutionBlockNumber},
    },
};
use url::Url;

use crate::{
    batch_size::BatchSizeZero,
    deposit_cache::{DepositCache, DepositContainer, InMemoryDepositCache},
    download_manager::{self, DownloadManager, SyncState},
    header_cache::HeaderCache,
    log_processor::{self, LogProcessor},
    store::{ChainStartData, ExecutionChainStore, LatestEth1Data, StateAccess},
};

pub struct Eth1Config {
    pub eth1_auth: Arc<Auth>,
    pub eth1_rpc_url: Option<Url>,
    pub deposit_contract_starting_block: Option<ExecutionBlockNumber>,
    pub max_log_batch_size: u64,
    // Gap between the followed height and the cursor above which logs are requested in batches.
    pub catch_up_tolerance: u64,
    pub persistence_interval: u64,
    pub deposit_widening_threshold: u64,
    pub polling_interval: Duration,
    pub default_deposit_tree: Option<DepositTreeSnapshot>,
}

impl Default for Eth1Config {
    fn default() -> Self {
        Self {
            eth1_auth: Arc::default(),
            eth1_rpc_url: None,
            deposit_contract_starting_block: None,
            max_log_batch_size: 1000,
            catch_up_tolerance: 50,
            persistence_interval: 1000,
            deposit_widening_threshold: 10_000,
            polling_interval: Duration::from_secs(12),
            default_deposit_tree: None,
        }
    }
}

/// Execution layer view of the beacon node: deposits, chain start and execution headers.
pub struct Eth1Chain {
    state: SyncState,
    deposit_cache: Arc<dyn DepositCache>,
    header_cache: Arc<HeaderCache>,
    health: Arc<ServiceHealth>,
    eth1_api: Option<Arc<Eth1Api>>,
    sync_task: Mutex<Option<SyncTask>>,
}

struct SyncTask {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl Eth1Chain {
    /// Restores synchronization state from `store` and starts background tasks.
    ///
    /// Nothing is spawned if `eth1_config` has no RPC URL.
    pub fn new(
        chain_config: Arc<ChainConfig>,
        eth1_config: Arc<Eth1Config>,
        client: Client,
        store: Arc<dyn ExecutionChainStore>,
        state_access: Option<Arc<dyn StateAccess>>,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self> {
        let data = store
            .execution_chain_data()
            .context("failed to load execution chain data")?;

        let containers = data
            .as_ref()
            .map(|data| data.deposit_containers.clone())
            .unwrap_or_default();

        let deposit_cache: Arc<dyn DepositCache> = Arc::new(InMemoryDepositCache::new(containers));

        if let Err(error) = download_manager::prune_pending_deposits(
            store.as_ref(),
            state_access.as_deref(),
            deposit_cache.as_ref(),
        ) {
            warn!("failed to prune restored pending deposits: {error:?}");
        }

        let processor = LogProcessor::new(
            chain_config.clone(),
            eth1_config.persistence_interval,
            deposit_cache.clone(),
            log_processor::deposit_tree_finalizer(),
            metrics.clone(),
        )
        .restore(data.as_ref(), eth1_config.default_deposit_tree.as_ref())
        .context("failed to restore deposit tree")?;

        let latest_eth1_data = match data.as_ref() {
            Some(data) => data.latest_eth1_data,
            None => initial_eth1_data(&eth1_config),
        };

        let state = SyncState {
            latest_eth1_data: Arc::new(RwLock::new(latest_eth1_data)),
            chain_start_data: Arc::new(ArcSwapOption::from(
                processor.chain_start_data().map(Arc::new),
            )),
        };

        let header_cache = Arc::new(HeaderCache::new(
            chain_config.eth1_follow_distance,
            metrics.clone(),
        ));

        let health = Arc::new(ServiceHealth::default());

        let eth1_api = eth1_config.eth1_rpc_url.clone().map(|url| {
            let transport = HttpTransport::new(client, url, eth1_config.eth1_auth.clone());
            Arc::new(Eth1Api::new(chain_config.clone(), Arc::new(transport), metrics.clone()))
        });

        let mut sync_task = None;

        if let Some(eth1_api) = eth1_api.as_ref() {
            info!(
                "starting deposit synchronization from block {} (deposit contract {:?})",
                latest_eth1_data.last_requested_block + 1,
                chain_config.deposit_contract_address,
            );

            let polling_interval = eth1_config.polling_interval;

            let download_manager = DownloadManager::new(
                chain_config,
                eth1_config,
                eth1_api.clone(),
                header_cache.clone(),
                processor,
                state.clone(),
                store,
                deposit_cache.clone(),
                state_access,
                metrics,
            );

            sync_task = Some(spawn_sync_task(
                download_manager,
                health.clone(),
                polling_interval,
            ));

            eth1_api::spawn_transition_configuration_task(eth1_api.clone(), health.clone());
        }

        Ok(Self {
            state,
            deposit_cache,
            header_cache,
            health,
            eth1_api,
            sync_task: Mutex::new(sync_task),
        })
    }

    /// Stops deposit synchronization and persists its state.
    ///
    /// Waits for a synchronization pass in progress to finish.
    pub async fn stop(&self) -> Result<()> {
        let Some(SyncTask { stop_tx, handle }) = self.sync_task.lock().take() else {
            return Ok(());
        };

        if stop_tx.send(()).is_err() {
            warn!("deposit synchronization task stopped before it was asked to");
        }

        handle.await?;

        Ok(())
    }

    #[must_use]
    pub fn latest_eth1_data(&self) -> LatestEth1Data {
        *self.state.latest_eth1_data.read()
    }

    #[must_use]
    pub fn chain_start_data(&self) -> Option<ChainStartData> {
        self.state.chain_start_data.load_full().as_deref().copied()
    }

    #[must_use]
    pub fn deposits(&self, range: Range<DepositIndex>) -> Vec<Deposit> {
        self.deposit_cache.deposits(range)
    }

    #[must_use]
    pub fn pending_deposits(&self, up_to_block: Option<ExecutionBlockNumber>) -> Vec<DepositContainer> {
        self.deposit_cache.pending_deposits(up_to_block)
    }

    #[must_use]
    pub fn finalized_deposits(&self) -> DepositIndex {
        self.deposit_cache.finalized_deposits()
    }

    #[must_use]
    pub const fn health(&self) -> &Arc<ServiceHealth> {
        &self.health
    }

    #[must_use]
    pub const fn eth1_api(&self) -> Option<&Arc<Eth1Api>> {
        self.eth1_api.as_ref()
    }

    /// Looks up a header in the header cache and requests it on a miss.
    pub async fn header_by_hash(&self, block_hash: ExecutionBlockHash) -> Result<Option<HeaderInfo>> {
        if let Some(header) = self.header_cache.header_by_hash(block_hash) {
            return Ok(Some(header));
        }

        let Some(eth1_api) = self.eth1_api.as_ref() else {
            return Ok(None);
        };

        let header = eth1_api.header_by_hash(block_hash).await?;

        if let Some(header) = header {
            self.header_cache.add_header(header)?;
        }

        Ok(header)
    }

    /// Looks up a header in the header cache and requests it on a miss.
    pub async fn header_by_number(
        &self,
        block_number: ExecutionBlockNumber,
    ) -> Result<Option<HeaderInfo>> {
        if let Some(header) = self.header_cache.header_by_number(block_number) {
            return Ok(Some(header));
        }

        let Some(eth1_api) = self.eth1_api.as_ref() else {
            return Ok(None);
        };

        let header = eth1_api.header_by_number(block_number).await?;

        if let Some(header) = header {
            self.header_cache.add_header(header)?;
        }

        Ok(header)
    }
}

fn initial_eth1_data(eth1_config: &Eth1Config) -> LatestEth1Data {
    let last_requested_block = match eth1_config.default_deposit_tree.as_ref() {
        Some(snapshot) => snapshot.execution_block_height,
        None => eth1_config
            .deposit_contract_starting_block
            .unwrap_or_default()
            .saturating_sub(1),
    };

    LatestEth1Data {
        last_requested_block,
        ..LatestEth1Data::default()
    }
}

fn spawn_sync_task(
    mut download_manager: DownloadManager,
    health: Arc<ServiceHealth>,
    polling_interval: Duration,
) -> SyncTask {
    let (stop_tx, mut stop_rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let mut ticks = interval(polling_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticks.tick() => {}
                _ = &mut stop_rx => break,
            }

            match download_manager.sync_once().await {
                Ok(()) => health.clear_error(ServiceErrorKind::DepositSynchronization),
                Err(error) => handle_error(&error, &health),
            }
        }

        match download_manager.persist() {
            Ok(()) => info!("deposit synchronization stopped"),
            Err(error) => error!("failed to persist execution chain data on shutdown: {error:?}"),
        }
    });

    SyncTask { stop_tx, handle }
}

// Transport and protocol errors are retried on the next tick.
// Integrity errors are retried too but also reported through `health`.
fn handle_error(error: &AnyhowError, health: &ServiceHealth) {
    if is_integrity_error(error) {
        error!("deposit synchronization failed: {error:?}");
        health.set_error(ServiceErrorKind::DepositSynchronization, error.to_string());
    } else {
        warn!("deposit synchronization pass did not complete: {error:?}");
    }
}

fn is_integrity_error(error: &AnyhowError) -> bool {
    error.is::<log_processor::Error>()
        || error.is::<BatchSizeZero>()
        || error.is::<deposit_tree::Error>()
}
