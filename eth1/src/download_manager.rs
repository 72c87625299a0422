use core::ops::RangeInclusive;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use eth1_api::{Eth1Api, HeaderInfo, Log};
use itertools::Itertools as _;
use log::{info, warn};
use parking_lot::RwLock;
use prometheus_metrics::Metrics;
use thiserror::Error;
use types::{
    config::Config as ChainConfig,
    phase0::primitives::{DepositIndex, ExecutionBlockNumber},
};

use crate::{
    batch_size::LogBatchSize,
    deposit_cache::DepositCache,
    eth1_chain::Eth1Config,
    header_cache::HeaderCache,
    log_processor::{LogOutcome, LogProcessor},
    store::{ChainStartData, ExecutionChainStore, LatestEth1Data, StateAccess},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("execution client does not have block {number}")]
    MissingHeader { number: ExecutionBlockNumber },
}

/// Parts of the execution chain the synchronization engine reads.
#[async_trait]
pub trait ExecutionChainSource: Send + Sync {
    async fn current_head_number(&self) -> Result<ExecutionBlockNumber>;

    async fn header_by_number(&self, number: ExecutionBlockNumber) -> Result<Option<HeaderInfo>>;

    async fn get_logs(&self, range: RangeInclusive<ExecutionBlockNumber>) -> Result<Vec<Log>>;

    async fn deposit_count(&self, block_number: ExecutionBlockNumber) -> Result<DepositIndex>;
}

#[async_trait]
impl ExecutionChainSource for Eth1Api {
    async fn current_head_number(&self) -> Result<ExecutionBlockNumber> {
        self.current_head_number().await
    }

    async fn header_by_number(&self, number: ExecutionBlockNumber) -> Result<Option<HeaderInfo>> {
        self.header_by_number(number).await
    }

    async fn get_logs(&self, range: RangeInclusive<ExecutionBlockNumber>) -> Result<Vec<Log>> {
        self.get_logs(range).await
    }

    async fn deposit_count(&self, block_number: ExecutionBlockNumber) -> Result<DepositIndex> {
        self.deposit_count(block_number).await
    }
}

/// Shared synchronization state readable outside the synchronization task.
#[derive(Clone, Default)]
pub struct SyncState {
    pub latest_eth1_data: Arc<RwLock<LatestEth1Data>>,
    pub chain_start_data: Arc<ArcSwapOption<ChainStartData>>,
}

/// Drives deposit synchronization.
///
/// Only one `DownloadManager` may exist per deposit tree. It owns the [`LogProcessor`] and is
/// the only writer of `last_requested_block`. The cursor is advanced only after a range has been
/// fully processed, so a failed pass resumes from the last committed block.
pub struct DownloadManager {
    chain_config: Arc<ChainConfig>,
    eth1_config: Arc<Eth1Config>,
    source: Arc<dyn ExecutionChainSource>,
    header_cache: Arc<HeaderCache>,
    processor: LogProcessor,
    batch_size: LogBatchSize,
    state: SyncState,
    store: Arc<dyn ExecutionChainStore>,
    deposit_cache: Arc<dyn DepositCache>,
    state_access: Option<Arc<dyn StateAccess>>,
    metrics: Option<Arc<Metrics>>,
}

impl DownloadManager {
    #[expect(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        chain_config: Arc<ChainConfig>,
        eth1_config: Arc<Eth1Config>,
        source: Arc<dyn ExecutionChainSource>,
        header_cache: Arc<HeaderCache>,
        processor: LogProcessor,
        state: SyncState,
        store: Arc<dyn ExecutionChainStore>,
        deposit_cache: Arc<dyn DepositCache>,
        state_access: Option<Arc<dyn StateAccess>>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let batch_size = LogBatchSize::new(eth1_config.max_log_batch_size);

        Self {
            chain_config,
            eth1_config,
            source,
            header_cache,
            processor,
            batch_size,
            state,
            store,
            deposit_cache,
            state_access,
            metrics,
        }
    }

    #[must_use]
    pub const fn processor(&self) -> &LogProcessor {
        &self.processor
    }

    /// Runs one synchronization pass up to the current followed height.
    pub async fn sync_once(&mut self) -> Result<()> {
        let head = self.source.current_head_number().await?;
        let followed = head.saturating_sub(self.chain_config.eth1_follow_distance);
        let cursor = self.last_requested_block();

        if followed <= cursor {
            features::log!(
                DebugEth1,
                "deposits are up to date (cursor: {cursor}, followed height: {followed})",
            );

            return Ok(());
        }

        if followed - cursor > self.eth1_config.catch_up_tolerance {
            self.catch_up(cursor, followed).await
        } else {
            self.follow_tip(cursor, followed).await
        }
    }

    /// Writes the current synchronization state to the store.
    pub fn persist(&self) -> Result<()> {
        let latest_eth1_data = *self.state.latest_eth1_data.read();

        self.store
            .save_execution_chain_data(&self.processor.execution_chain_data(latest_eth1_data))?;

        features::log!(
            DebugEth1,
            "persisted execution chain data (cursor: {}, deposits: {})",
            latest_eth1_data.last_requested_block,
            self.processor.deposit_count(),
        );

        Ok(())
    }

    async fn follow_tip(
        &mut self,
        cursor: ExecutionBlockNumber,
        followed: ExecutionBlockNumber,
    ) -> Result<()> {
        for number in cursor + 1..=followed {
            let header = self.header(number).await?;
            let logs = self.source.get_logs(number..=number).await?;

            self.process_block_logs(logs, Some(header))?;
            self.commit(number, Some(header));
        }

        Ok(())
    }

    async fn catch_up(
        &mut self,
        cursor: ExecutionBlockNumber,
        followed: ExecutionBlockNumber,
    ) -> Result<()> {
        info!("catching up with deposits from block {} to block {followed}", cursor + 1);

        let mut start = cursor + 1;
        let mut widen = self.few_deposits_remain(followed).await?;

        while start <= followed {
            let end = if widen {
                features::log!(
                    DebugEth1,
                    "requesting all remaining deposit logs up to block {followed}",
                );

                followed
            } else {
                start
                    .saturating_add(self.batch_size.get() - 1)
                    .min(followed)
            };

            let logs = match self.source.get_logs(start..=end).await {
                Ok(logs) => logs,
                Err(error) if is_query_too_large(&error) => {
                    if widen {
                        widen = false;

                        warn!(
                            "execution client refused logs from block {start} to block {end}; \
                             falling back to batches of {} blocks",
                            self.batch_size.get(),
                        );

                        continue;
                    }

                    let batch_size = self.batch_size.decrease()?;

                    warn!(
                        "execution client refused logs from block {start} to block {end}; \
                         reducing batch size to {batch_size}",
                    );

                    self.observe_batch_size();

                    continue;
                }
                Err(error) => return Err(error),
            };

            self.process_range_logs(logs).await?;

            let header = self.header(end).await?;
            self.commit(end, Some(header));

            self.batch_size.increase();
            self.observe_batch_size();

            start = end + 1;
        }

        self.prune_pending_deposits()?;
        self.persist()?;

        info!(
            "caught up with deposits at block {followed} ({} deposits)",
            self.processor.deposit_count(),
        );

        Ok(())
    }

    async fn few_deposits_remain(&self, followed: ExecutionBlockNumber) -> Result<bool> {
        let remaining = self
            .source
            .deposit_count(followed)
            .await?
            .saturating_sub(self.processor.deposit_count());

        Ok(remaining < self.eth1_config.deposit_widening_threshold)
    }

    async fn process_range_logs(&mut self, logs: Vec<Log>) -> Result<()> {
        let blocks = logs
            .into_iter()
            .chunk_by(|log| log.block_number)
            .into_iter()
            .map(|(block_number, logs)| (block_number, logs.collect_vec()))
            .collect_vec();

        for (block_number, logs) in blocks {
            let header = match block_number {
                Some(number) if self.processor.chain_start_data().is_none() => {
                    Some(self.header(number).await?)
                }
                _ => None,
            };

            self.process_block_logs(logs, header)?;
        }

        Ok(())
    }

    // `header` must be the header of the block the logs were emitted in.
    fn process_block_logs(&mut self, logs: Vec<Log>, header: Option<HeaderInfo>) -> Result<()> {
        let mut inserted_any = false;
        let mut persist = false;

        for log in logs {
            if let LogOutcome::Inserted {
                persist: persist_now,
                ..
            } = self.processor.process_log(log)?
            {
                inserted_any = true;
                persist |= persist_now;
            }
        }

        if inserted_any {
            if let Some(header) = header {
                if let Some(chain_start_data) = self.processor.check_chain_start(&header) {
                    self.state
                        .chain_start_data
                        .store(Some(Arc::new(chain_start_data)));

                    persist = true;
                }
            }
        }

        if persist {
            self.persist()?;
        }

        Ok(())
    }

    async fn header(&self, number: ExecutionBlockNumber) -> Result<HeaderInfo> {
        if let Some(header) = self.header_cache.header_by_number(number) {
            return Ok(header);
        }

        let header = self
            .source
            .header_by_number(number)
            .await?
            .ok_or(Error::MissingHeader { number })?;

        self.header_cache.add_header(header)?;

        Ok(header)
    }

    fn commit(&self, block_number: ExecutionBlockNumber, header: Option<HeaderInfo>) {
        let mut latest_eth1_data = self.state.latest_eth1_data.write();

        latest_eth1_data.last_requested_block = block_number;

        if let Some(header) = header {
            latest_eth1_data.block_height = header.number;
            latest_eth1_data.block_timestamp = header.timestamp;
            latest_eth1_data.block_hash = header.hash;
        }

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.set_eth1_last_requested_block(block_number);
        }
    }

    fn prune_pending_deposits(&self) -> Result<()> {
        prune_pending_deposits(
            self.store.as_ref(),
            self.state_access.as_deref(),
            self.deposit_cache.as_ref(),
        )
    }

    fn last_requested_block(&self) -> ExecutionBlockNumber {
        self.state.latest_eth1_data.read().last_requested_block
    }

    fn observe_batch_size(&self) {
        if let Some(metrics) = self.metrics.as_ref() {
            metrics.set_eth1_log_batch_size(self.batch_size.get());
        }
    }
}

/// Removes pending deposits already processed by the finalized state.
///
/// Does nothing without state access or before the first finalized checkpoint.
pub(crate) fn prune_pending_deposits(
    store: &dyn ExecutionChainStore,
    state_access: Option<&dyn StateAccess>,
    deposit_cache: &dyn DepositCache,
) -> Result<()> {
    let Some(state_access) = state_access else {
        return Ok(());
    };

    let checkpoint = store.finalized_checkpoint()?;

    if checkpoint.root.is_zero() {
        return Ok(());
    }

    let state = match state_access.cached_finalized_state() {
        Some(state) if state.epoch == checkpoint.epoch => state,
        _ => state_access.state_by_root(checkpoint.root)?,
    };

    deposit_cache.prune_pending_deposits(state.eth1_deposit_index);

    features::log!(
        DebugEth1,
        "pruned pending deposits below index {} (finalized epoch {})",
        state.eth1_deposit_index,
        checkpoint.epoch,
    );

    Ok(())
}

fn is_query_too_large(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref(),
        Some(eth1_api::Error::LogQueryTooLarge),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use eth1_api::DepositEvent;
    use parking_lot::Mutex;
    use types::phase0::{
        consts::MAX_EFFECTIVE_BALANCE,
        containers::{Checkpoint, DepositData},
        primitives::{PublicKeyBytes, H256},
    };

    use crate::{
        batch_size::BatchSizeZero,
        deposit_cache::InMemoryDepositCache,
        log_processor::{Error as ProcessorError, NoopFinalizer},
        store::{FinalizedState, InMemoryStore},
    };

    use super::*;

    const FOLLOW_DISTANCE: u64 = 8;

    #[derive(Default)]
    struct FakeChain {
        head: ExecutionBlockNumber,
        logs: Vec<Log>,
        widest_accepted_range: Option<u64>,
        requested_ranges: Mutex<Vec<RangeInclusive<ExecutionBlockNumber>>>,
    }

    impl FakeChain {
        fn new(head: ExecutionBlockNumber, deposits: &[(DepositIndex, ExecutionBlockNumber)]) -> Self {
            let logs = deposits
                .iter()
                .map(|(index, block_number)| deposit_log(*index, *block_number))
                .collect();

            Self {
                head,
                logs,
                ..Self::default()
            }
        }

        fn requested_ranges(&self) -> Vec<RangeInclusive<ExecutionBlockNumber>> {
            self.requested_ranges.lock().clone()
        }
    }

    #[async_trait]
    impl ExecutionChainSource for FakeChain {
        async fn current_head_number(&self) -> Result<ExecutionBlockNumber> {
            Ok(self.head)
        }

        async fn header_by_number(
            &self,
            number: ExecutionBlockNumber,
        ) -> Result<Option<HeaderInfo>> {
            Ok((number <= self.head).then(|| header(number)))
        }

        async fn get_logs(&self, range: RangeInclusive<ExecutionBlockNumber>) -> Result<Vec<Log>> {
            self.requested_ranges.lock().push(range.clone());

            let width = range.end() - range.start() + 1;

            if self
                .widest_accepted_range
                .is_some_and(|widest| width > widest)
            {
                return Err(eth1_api::Error::LogQueryTooLarge.into());
            }

            Ok(self
                .logs
                .iter()
                .filter(|log| log.block_number.is_some_and(|number| range.contains(&number)))
                .cloned()
                .collect())
        }

        async fn deposit_count(&self, block_number: ExecutionBlockNumber) -> Result<DepositIndex> {
            let count = self
                .logs
                .iter()
                .filter(|log| log.block_number <= Some(block_number))
                .count();

            Ok(count.try_into()?)
        }
    }

    struct FakeStateAccess {
        cached: Option<FinalizedState>,
        states: HashMap<H256, FinalizedState>,
        state_by_root_calls: Mutex<usize>,
    }

    impl StateAccess for FakeStateAccess {
        fn cached_finalized_state(&self) -> Option<FinalizedState> {
            self.cached
        }

        fn state_by_root(&self, root: H256) -> Result<FinalizedState> {
            *self.state_by_root_calls.lock() += 1;

            self.states
                .get(&root)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no state with root {root:?}"))
        }
    }

    struct Harness {
        chain: Arc<FakeChain>,
        manager: DownloadManager,
        state: SyncState,
        store: Arc<InMemoryStore>,
        deposit_cache: Arc<InMemoryDepositCache>,
        header_cache: Arc<HeaderCache>,
    }

    impl Harness {
        fn new(chain: FakeChain, eth1_config: Eth1Config) -> Self {
            Self::with_state_access(chain, eth1_config, chain_config(), None)
        }

        fn with_state_access(
            chain: FakeChain,
            eth1_config: Eth1Config,
            chain_config: ChainConfig,
            state_access: Option<Arc<dyn StateAccess>>,
        ) -> Self {
            let chain_config = Arc::new(chain_config);
            let chain = Arc::new(chain);
            let state = SyncState::default();
            let store = Arc::new(InMemoryStore::default());
            let deposit_cache = Arc::new(InMemoryDepositCache::default());
            let header_cache = Arc::new(HeaderCache::new(FOLLOW_DISTANCE, None));

            let processor = LogProcessor::new(
                chain_config.clone(),
                eth1_config.persistence_interval,
                deposit_cache.clone(),
                Box::new(NoopFinalizer),
                None,
            );

            let manager = DownloadManager::new(
                chain_config,
                Arc::new(eth1_config),
                chain.clone(),
                header_cache.clone(),
                processor,
                state.clone(),
                store.clone(),
                deposit_cache.clone(),
                state_access,
                None,
            );

            Self {
                chain,
                manager,
                state,
                store,
                deposit_cache,
                header_cache,
            }
        }

        fn cursor(&self) -> ExecutionBlockNumber {
            self.state.latest_eth1_data.read().last_requested_block
        }
    }

    fn chain_config() -> ChainConfig {
        ChainConfig {
            eth1_follow_distance: FOLLOW_DISTANCE,
            min_genesis_active_validator_count: u64::MAX,
            ..ChainConfig::minimal()
        }
    }

    fn header(number: ExecutionBlockNumber) -> HeaderInfo {
        let mut hash = H256::zero();
        hash.0[..8].copy_from_slice(&(number + 1).to_be_bytes());

        HeaderInfo {
            hash,
            parent_hash: H256::zero(),
            number,
            timestamp: 1_600_000_000 + number * 12,
            total_difficulty: 0_u64.into(),
        }
    }

    fn deposit_log(index: DepositIndex, block_number: ExecutionBlockNumber) -> Log {
        let data = DepositData {
            pubkey: PublicKeyBytes::from_low_u64_be(index + 1),
            amount: MAX_EFFECTIVE_BALANCE,
            ..DepositData::default()
        };

        Log {
            topics: vec![DepositEvent::TOPIC],
            data: DepositEvent { data, index }.to_log_data(),
            block_number: Some(block_number),
            block_hash: Some(header(block_number).hash),
            ..Log::default()
        }
    }

    fn eth1_config() -> Eth1Config {
        Eth1Config {
            catch_up_tolerance: 16,
            deposit_widening_threshold: 0,
            ..Eth1Config::default()
        }
    }

    #[tokio::test]
    async fn tip_mode_processes_one_block_at_a_time() -> Result<()> {
        let chain = FakeChain::new(20, &[(0, 3), (1, 7), (2, 7), (3, 12)]);
        let mut harness = Harness::new(chain, eth1_config());

        harness.manager.sync_once().await?;

        assert_eq!(harness.cursor(), 12);
        assert_eq!(harness.manager.processor().deposit_count(), 4);
        assert_eq!(harness.header_cache.header_by_number(12), Some(header(12)));
        assert_eq!(harness.state.latest_eth1_data.read().block_hash, header(12).hash);

        assert!(harness
            .chain
            .requested_ranges()
            .iter()
            .all(|range| range.start() == range.end()));

        Ok(())
    }

    #[tokio::test]
    async fn catch_up_halves_batch_size_when_provider_refuses_query() -> Result<()> {
        let chain = FakeChain {
            widest_accepted_range: Some(300),
            ..FakeChain::new(10_000 + FOLLOW_DISTANCE, &[(0, 5), (1, 2_000), (2, 9_999)])
        };

        let mut harness = Harness::new(chain, eth1_config());

        harness.manager.sync_once().await?;

        let widths = harness
            .chain
            .requested_ranges()
            .iter()
            .map(|range| range.end() - range.start() + 1)
            .collect_vec();

        assert_eq!(widths[..4], [1000, 500, 250, 350]);
        assert_eq!(widths[4], 175);
        assert!(widths.iter().all(|width| *width <= 1000));

        assert_eq!(harness.cursor(), 10_000);
        assert_eq!(harness.manager.processor().deposit_count(), 3);
        assert!(harness.store.execution_chain_data()?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn catch_up_fails_when_batch_size_reaches_zero() {
        let chain = FakeChain {
            widest_accepted_range: Some(0),
            ..FakeChain::new(1_000, &[])
        };

        let mut harness = Harness::new(
            chain,
            Eth1Config {
                max_log_batch_size: 4,
                ..eth1_config()
            },
        );

        let error = harness
            .manager
            .sync_once()
            .await
            .expect_err("every query is refused");

        assert!(error.is::<BatchSizeZero>());
        assert_eq!(harness.cursor(), 0);
    }

    #[tokio::test]
    async fn gap_in_deposits_aborts_pass_without_advancing_cursor() -> Result<()> {
        let chain = FakeChain::new(500, &[(0, 10), (1, 20), (3, 30)]);
        let mut harness = Harness::new(chain, eth1_config());

        let error = harness
            .manager
            .sync_once()
            .await
            .expect_err("deposit 2 is missing");

        assert!(matches!(
            error.downcast_ref(),
            Some(ProcessorError::IncorrectMerkleIndex {
                expected: 2,
                received: 3,
            }),
        ));
        assert_eq!(harness.cursor(), 0);
        assert_eq!(harness.manager.processor().deposit_count(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn remaining_range_is_requested_at_once_when_few_deposits_remain() -> Result<()> {
        let head = 2_000 + FOLLOW_DISTANCE;
        let chain = FakeChain::new(head, &[(0, 50), (1, 1_500), (2, head)]);

        let mut harness = Harness::new(
            chain,
            Eth1Config {
                deposit_widening_threshold: 10,
                ..eth1_config()
            },
        );

        harness.manager.sync_once().await?;

        assert_eq!(harness.chain.requested_ranges(), [1..=2_000]);
        assert_eq!(harness.cursor(), 2_000);
        assert_eq!(harness.manager.processor().deposit_count(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn refused_widened_query_falls_back_to_batches() -> Result<()> {
        let chain = FakeChain {
            widest_accepted_range: Some(1_000),
            ..FakeChain::new(2_000 + FOLLOW_DISTANCE, &[(0, 50), (1, 1_500)])
        };

        let mut harness = Harness::new(
            chain,
            Eth1Config {
                deposit_widening_threshold: 10,
                ..eth1_config()
            },
        );

        harness.manager.sync_once().await?;

        assert_eq!(
            harness.chain.requested_ranges(),
            [1..=2_000, 1..=1_000, 1_001..=2_000],
        );
        assert_eq!(harness.cursor(), 2_000);
        assert_eq!(harness.manager.processor().deposit_count(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn chain_start_is_detected_while_catching_up() -> Result<()> {
        let chain = FakeChain::new(500, &[(0, 10), (1, 20), (2, 30)]);

        let chain_config = ChainConfig {
            min_genesis_active_validator_count: 2,
            min_genesis_time: 0,
            genesis_delay: 60,
            ..chain_config()
        };

        let mut harness = Harness::with_state_access(chain, eth1_config(), chain_config, None);

        harness.manager.sync_once().await?;

        let chain_start_data = harness
            .state
            .chain_start_data
            .load_full()
            .expect("two validators are enough");

        assert_eq!(chain_start_data.genesis_block_number, 20);
        assert_eq!(chain_start_data.genesis_time, header(20).timestamp + 60);
        assert_eq!(chain_start_data.eth1_data.deposit_count, 2);

        Ok(())
    }

    #[tokio::test]
    async fn pending_deposits_are_pruned_with_cached_finalized_state() -> Result<()> {
        let checkpoint = Checkpoint {
            epoch: 3,
            root: H256::repeat_byte(3),
        };

        let state_access = Arc::new(FakeStateAccess {
            cached: Some(FinalizedState {
                epoch: 3,
                eth1_deposit_index: 2,
            }),
            states: HashMap::new(),
            state_by_root_calls: Mutex::new(0),
        });

        let chain = FakeChain::new(500, &[(0, 10), (1, 20), (2, 30), (3, 40)]);

        let mut harness = Harness::with_state_access(
            chain,
            eth1_config(),
            chain_config(),
            Some(state_access.clone()),
        );

        harness.store.set_finalized_checkpoint(checkpoint);
        harness.manager.sync_once().await?;

        let pending_indices = harness
            .deposit_cache
            .pending_deposits(None)
            .into_iter()
            .map(|container| container.index)
            .collect_vec();

        assert_eq!(pending_indices, [2, 3]);
        assert_eq!(*state_access.state_by_root_calls.lock(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn finalized_state_is_loaded_when_cached_one_is_stale() -> Result<()> {
        let checkpoint = Checkpoint {
            epoch: 5,
            root: H256::repeat_byte(5),
        };

        let state_access = Arc::new(FakeStateAccess {
            cached: Some(FinalizedState {
                epoch: 4,
                eth1_deposit_index: 1,
            }),
            states: HashMap::from([(
                checkpoint.root,
                FinalizedState {
                    epoch: 5,
                    eth1_deposit_index: 3,
                },
            )]),
            state_by_root_calls: Mutex::new(0),
        });

        let chain = FakeChain::new(500, &[(0, 10), (1, 20), (2, 30), (3, 40)]);

        let mut harness = Harness::with_state_access(
            chain,
            eth1_config(),
            chain_config(),
            Some(state_access.clone()),
        );

        harness.store.set_finalized_checkpoint(checkpoint);
        harness.manager.sync_once().await?;

        assert_eq!(harness.deposit_cache.pending_deposits(None).len(), 1);
        assert_eq!(harness.deposit_cache.finalized_deposits(), 3);
        assert_eq!(*state_access.state_by_root_calls.lock(), 1);

        Ok(())
    }
}
