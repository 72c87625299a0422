use core::ops::Range;
use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use types::phase0::{
    containers::Deposit,
    primitives::{DepositIndex, ExecutionBlockNumber, H256},
};

/// Deposit as recorded by the deposit cache.
///
/// `deposit.proof` and `deposit_root` are taken from the deposit tree right after insertion.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct DepositContainer {
    pub deposit: Deposit,
    pub index: DepositIndex,
    pub block_number: ExecutionBlockNumber,
    pub deposit_root: H256,
}

/// Store of deposits processed by the synchronization engine.
///
/// Every deposit is recorded twice: permanently and as pending.
/// Pending deposits are removed once a finalized state includes them.
pub trait DepositCache: Send + Sync {
    fn insert_deposit(&self, container: DepositContainer);

    fn insert_pending_deposit(&self, container: DepositContainer);

    /// Returns pending deposits included in blocks up to `up_to_block`, ordered by index.
    fn pending_deposits(&self, up_to_block: Option<ExecutionBlockNumber>) -> Vec<DepositContainer>;

    /// Removes pending deposits with indices below `deposit_index`.
    fn prune_pending_deposits(&self, deposit_index: DepositIndex);

    fn all_deposit_containers(&self) -> Vec<DepositContainer>;

    /// Returns the number of deposits processed by finalized states.
    fn finalized_deposits(&self) -> DepositIndex;

    /// Returns deposits with proofs in `range`, ordered by index.
    ///
    /// Deposits missing from the cache are skipped.
    fn deposits(&self, range: Range<DepositIndex>) -> Vec<Deposit> {
        self.all_deposit_containers()
            .into_iter()
            .filter(|container| range.contains(&container.index))
            .map(|container| container.deposit)
            .collect()
    }
}

#[derive(Default)]
pub struct InMemoryDepositCache {
    deposits: RwLock<BTreeMap<DepositIndex, DepositContainer>>,
    pending_deposits: RwLock<BTreeMap<DepositIndex, DepositContainer>>,
    finalized_deposits: RwLock<DepositIndex>,
}

impl InMemoryDepositCache {
    /// Creates a cache from persisted deposits.
    ///
    /// Every deposit starts out pending until [`DepositCache::prune_pending_deposits`] is called.
    #[must_use]
    pub fn new(containers: impl IntoIterator<Item = DepositContainer>) -> Self {
        let deposits = containers
            .into_iter()
            .map(|container| (container.index, container))
            .collect::<BTreeMap<_, _>>();

        Self {
            pending_deposits: RwLock::new(deposits.clone()),
            deposits: RwLock::new(deposits),
            ..Self::default()
        }
    }
}

impl DepositCache for InMemoryDepositCache {
    fn insert_deposit(&self, container: DepositContainer) {
        self.deposits.write().insert(container.index, container);
    }

    fn insert_pending_deposit(&self, container: DepositContainer) {
        self.pending_deposits
            .write()
            .insert(container.index, container);
    }

    fn pending_deposits(&self, up_to_block: Option<ExecutionBlockNumber>) -> Vec<DepositContainer> {
        self.pending_deposits
            .read()
            .values()
            .filter(|container| up_to_block.is_none_or(|block| container.block_number <= block))
            .cloned()
            .collect()
    }

    fn prune_pending_deposits(&self, deposit_index: DepositIndex) {
        let mut pending_deposits = self.pending_deposits.write();
        *pending_deposits = pending_deposits.split_off(&deposit_index);

        let mut finalized_deposits = self.finalized_deposits.write();
        *finalized_deposits = (*finalized_deposits).max(deposit_index);
    }

    fn all_deposit_containers(&self) -> Vec<DepositContainer> {
        self.deposits.read().values().cloned().collect()
    }

    fn finalized_deposits(&self) -> DepositIndex {
        *self.finalized_deposits.read()
    }

    fn deposits(&self, range: Range<DepositIndex>) -> Vec<Deposit> {
        if range.is_empty() {
            return vec![];
        }

        self.deposits
            .read()
            .range(range)
            .map(|(_, container)| container.deposit.clone())
            .collect()
    }
}
