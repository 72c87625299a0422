use std::{collections::HashMap, sync::Arc};

use anyhow::{ensure, Result};
use deposit_tree::{DepositDataTree, DepositTreeSnapshot, FinalizedExecutionBlock};
use eth1_api::{DepositEvent, HeaderInfo, Log};
use features::Feature;
use log::{debug, info, warn};
use prometheus_metrics::Metrics;
use thiserror::Error;
use types::{
    config::Config,
    phase0::{
        consts::MAX_EFFECTIVE_BALANCE,
        containers::{Deposit, DepositData, Eth1Data},
        primitives::{DepositIndex, Gwei, PublicKeyBytes},
    },
};

use crate::{
    deposit_cache::{DepositCache, DepositContainer},
    store::{ChainStartData, ExecutionChainData, LatestEth1Data},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("incorrect merkle index: expected {expected}, received {received}")]
    IncorrectMerkleIndex {
        expected: DepositIndex,
        received: DepositIndex,
    },
    #[error("deposit tree contains {tree_size} deposits when inserting deposit {index}")]
    TrieSizeMismatch {
        tree_size: u64,
        index: DepositIndex,
    },
    #[error("deposit log does not identify its block: {log:?}")]
    MissingBlock { log: Box<Log> },
    #[error("restored deposit tree does not match deposit root recorded for deposit {index}")]
    RestoredTreeMismatch { index: DepositIndex },
}

/// What happened to a log passed to [`LogProcessor::process_log`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LogOutcome {
    Ignored,
    Duplicate,
    Inserted { index: DepositIndex, persist: bool },
}

pub trait DepositTreeFinalizer: Send + Sync {
    fn finalize(&self, deposit_tree: &mut DepositDataTree, block: FinalizedExecutionBlock)
        -> Result<()>;
}

pub struct NoopFinalizer;

impl DepositTreeFinalizer for NoopFinalizer {
    fn finalize(&self, _: &mut DepositDataTree, _: FinalizedExecutionBlock) -> Result<()> {
        Ok(())
    }
}

/// Prunes the deposit tree up to the last inserted deposit.
pub struct TreeFinalizer;

impl DepositTreeFinalizer for TreeFinalizer {
    fn finalize(
        &self,
        deposit_tree: &mut DepositDataTree,
        block: FinalizedExecutionBlock,
    ) -> Result<()> {
        deposit_tree.finalize(block)?;

        features::log!(
            DebugEth1,
            "finalized deposit tree up to deposit count {} (block {})",
            block.deposit_count,
            block.block_height,
        );

        Ok(())
    }
}

#[must_use]
pub fn deposit_tree_finalizer() -> Box<dyn DepositTreeFinalizer> {
    if Feature::FinalizeDepositTree.is_enabled() {
        Box::new(TreeFinalizer)
    } else {
        Box::new(NoopFinalizer)
    }
}

/// Turns deposit contract logs into deposit tree insertions.
///
/// Owned by a single synchronization task. Deposits must arrive in index order.
pub struct LogProcessor {
    config: Arc<Config>,
    persistence_interval: u64,
    deposit_tree: DepositDataTree,
    last_received_index: Option<DepositIndex>,
    deposit_cache: Arc<dyn DepositCache>,
    finalizer: Box<dyn DepositTreeFinalizer>,
    genesis_balances: HashMap<PublicKeyBytes, Gwei>,
    chain_start_data: Option<ChainStartData>,
    metrics: Option<Arc<Metrics>>,
}

impl LogProcessor {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        persistence_interval: u64,
        deposit_cache: Arc<dyn DepositCache>,
        finalizer: Box<dyn DepositTreeFinalizer>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            config,
            persistence_interval: persistence_interval.max(1),
            deposit_tree: DepositDataTree::default(),
            last_received_index: None,
            deposit_cache,
            finalizer,
            genesis_balances: HashMap::new(),
            chain_start_data: None,
            metrics,
        }
    }

    /// Restores the processor from persisted data or from a deposit tree snapshot.
    ///
    /// `deposit_cache` must already contain the persisted deposit containers.
    pub fn restore(
        mut self,
        data: Option<&ExecutionChainData>,
        default_snapshot: Option<&DepositTreeSnapshot>,
    ) -> Result<Self> {
        let snapshot = data
            .and_then(|data| data.deposit_snapshot.as_ref())
            .or(default_snapshot);

        if let Some(snapshot) = snapshot {
            self.deposit_tree = DepositDataTree::from_snapshot(snapshot)?;
        }

        self.chain_start_data = data.and_then(|data| data.chain_start_data);

        for container in self.deposit_cache.all_deposit_containers() {
            if self.chain_start_data.is_none() {
                self.track_genesis_deposit(container.deposit.data);
            }

            if container.index < self.deposit_tree.deposit_count() {
                continue;
            }

            self.deposit_tree
                .push(container.index, &container.deposit.data)?;

            ensure!(
                self.deposit_tree.root() == container.deposit_root,
                Error::RestoredTreeMismatch {
                    index: container.index,
                },
            );
        }

        self.last_received_index = self.deposit_tree.deposit_count().checked_sub(1);

        info!(
            "deposit tree restored with {} deposits (root: {:?})",
            self.deposit_tree.deposit_count(),
            self.deposit_tree.root(),
        );

        Ok(self)
    }

    #[must_use]
    pub const fn deposit_tree(&self) -> &DepositDataTree {
        &self.deposit_tree
    }

    #[must_use]
    pub const fn deposit_count(&self) -> u64 {
        self.deposit_tree.deposit_count()
    }

    #[must_use]
    pub const fn chain_start_data(&self) -> Option<ChainStartData> {
        self.chain_start_data
    }

    #[must_use]
    pub fn active_validator_count(&self) -> u64 {
        let count = self
            .genesis_balances
            .values()
            .filter(|balance| **balance >= MAX_EFFECTIVE_BALANCE)
            .count();

        u64::try_from(count).unwrap_or(u64::MAX)
    }

    pub fn process_log(&mut self, log: Log) -> Result<LogOutcome> {
        if log.topic() != Some(DepositEvent::TOPIC) {
            debug!(
                "ignoring log with topic {:?} emitted by deposit contract",
                log.topic(),
            );

            return Ok(LogOutcome::Ignored);
        }

        self.process_deposit_log(log)
    }

    fn process_deposit_log(&mut self, log: Log) -> Result<LogOutcome> {
        let (Some(block_number), Some(block_hash)) = (log.block_number, log.block_hash) else {
            return Err(Error::MissingBlock { log: Box::new(log) }.into());
        };

        let DepositEvent { data, index } = DepositEvent::try_from(log)?;

        if self.last_received_index.is_some_and(|last| index <= last) {
            features::log!(DebugEth1, "skipping deposit {index} received again");
            return Ok(LogOutcome::Duplicate);
        }

        let expected = self.last_received_index.map_or(0, |last| last + 1);

        ensure!(
            index == expected,
            Error::IncorrectMerkleIndex {
                expected,
                received: index,
            },
        );

        ensure!(
            self.deposit_tree.deposit_count() == index,
            Error::TrieSizeMismatch {
                tree_size: self.deposit_tree.deposit_count(),
                index,
            },
        );

        self.deposit_tree.push(index, &data)?;
        self.last_received_index = Some(index);

        let proof = self.deposit_tree.proof(index)?;
        let deposit_root = self.deposit_tree.root();

        let container = DepositContainer {
            deposit: Deposit { proof, data },
            index,
            block_number,
            deposit_root,
        };

        self.deposit_cache.insert_deposit(container.clone());
        self.deposit_cache.insert_pending_deposit(container);

        if self.chain_start_data.is_none() {
            self.track_genesis_deposit(data);
        }

        let finalized_block = FinalizedExecutionBlock {
            deposit_root,
            deposit_count: index + 1,
            block_hash,
            block_height: block_number,
        };

        // Finalization only prunes the tree. The deposit is already recorded.
        if let Err(error) = self.finalizer.finalize(&mut self.deposit_tree, finalized_block) {
            warn!("failed to finalize deposit tree after deposit {index}: {error:?}");
        }

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.eth1_processed_deposits.inc();
        }

        features::log!(
            DebugEth1,
            "inserted deposit {index} from block {block_number} (deposit root: {deposit_root:?})",
        );

        Ok(LogOutcome::Inserted {
            index,
            persist: (index + 1) % self.persistence_interval == 0,
        })
    }

    /// Checks whether deposits up to and including `header` trigger chain start.
    ///
    /// Chain start is only detected once.
    pub fn check_chain_start(&mut self, header: &HeaderInfo) -> Option<ChainStartData> {
        if self.chain_start_data.is_some() {
            return None;
        }

        let genesis_time = header.timestamp.saturating_add(self.config.genesis_delay);

        if genesis_time < self.config.min_genesis_time
            || self.active_validator_count() < self.config.min_genesis_active_validator_count
        {
            return None;
        }

        let chain_start_data = ChainStartData {
            genesis_time,
            genesis_block_hash: header.hash,
            genesis_block_number: header.number,
            eth1_data: Eth1Data {
                deposit_root: self.deposit_tree.root(),
                deposit_count: self.deposit_tree.deposit_count(),
                block_hash: header.hash,
            },
        };

        info!(
            "chain start triggered by execution block {} with {} validators (genesis time: {genesis_time})",
            header.number,
            self.active_validator_count(),
        );

        self.chain_start_data = Some(chain_start_data);
        self.genesis_balances.clear();

        Some(chain_start_data)
    }

    #[must_use]
    pub fn execution_chain_data(&self, latest_eth1_data: LatestEth1Data) -> ExecutionChainData {
        ExecutionChainData {
            latest_eth1_data,
            chain_start_data: self.chain_start_data,
            deposit_snapshot: self.deposit_tree.snapshot(),
            deposit_containers: self.deposit_cache.all_deposit_containers(),
        }
    }

    // Signatures are not verified. Invalid deposits only make chain start detection optimistic.
    fn track_genesis_deposit(&mut self, data: DepositData) {
        let balance = self.genesis_balances.entry(data.pubkey).or_default();
        *balance = balance.saturating_add(data.amount);
    }
}
