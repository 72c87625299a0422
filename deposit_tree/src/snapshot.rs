use hashing::{hash_256_256, uint_chunk, ZERO_HASHES};
use serde::{Deserialize, Serialize};
use types::phase0::{
    consts::DEPOSIT_CONTRACT_TREE_DEPTH,
    primitives::{ExecutionBlockHash, ExecutionBlockNumber, H256},
};

/// Execution block up to which the deposit tree has been finalized.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct FinalizedExecutionBlock {
    pub deposit_root: H256,
    pub deposit_count: u64,
    pub block_hash: ExecutionBlockHash,
    pub block_height: ExecutionBlockNumber,
}

/// Portable summary of a finalized deposit tree in the format defined by EIP-4881.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DepositTreeSnapshot {
    pub finalized: Vec<H256>,
    pub deposit_root: H256,
    pub deposit_count: u64,
    pub execution_block_hash: ExecutionBlockHash,
    pub execution_block_height: ExecutionBlockNumber,
}

impl DepositTreeSnapshot {
    /// Recomputes the deposit root from the finalized hashes.
    ///
    /// Returns [`None`] if there are fewer finalized hashes than the deposit count requires.
    #[must_use]
    pub fn calculate_root(&self) -> Option<H256> {
        let mut size = self.deposit_count;
        let mut index = self.finalized.len();
        let mut root = ZERO_HASHES[0];

        for zero_hash in ZERO_HASHES.iter().take(DEPOSIT_CONTRACT_TREE_DEPTH) {
            root = if size & 1 == 1 {
                index = index.checked_sub(1)?;
                hash_256_256(self.finalized[index], root)
            } else {
                hash_256_256(root, *zero_hash)
            };

            size >>= 1;
        }

        Some(hash_256_256(root, uint_chunk(self.deposit_count)))
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.calculate_root() == Some(self.deposit_root)
    }

    #[must_use]
    pub const fn finalized_execution_block(&self) -> FinalizedExecutionBlock {
        FinalizedExecutionBlock {
            deposit_root: self.deposit_root,
            deposit_count: self.deposit_count,
            block_hash: self.execution_block_hash,
            block_height: self.execution_block_height,
        }
    }
}
