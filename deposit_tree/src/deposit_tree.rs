use hashing::{hash_256_256, uint_chunk, SszHash as _};
use thiserror::Error;
use types::phase0::{
    consts::DEPOSIT_CONTRACT_TREE_DEPTH,
    containers::DepositData,
    primitives::{DepositIndex, H256},
};

use crate::{
    merkle_tree::{MerkleTree, MerkleTreeError},
    snapshot::{DepositTreeSnapshot, FinalizedExecutionBlock},
};

const MAX_DEPOSITS: u64 = 1 << DEPOSIT_CONTRACT_TREE_DEPTH;

/// Incremental Merkle tree mirroring the one maintained by the deposit contract.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DepositDataTree {
    tree: MerkleTree,
    deposit_count: u64,
    finalized_execution_block: Option<FinalizedExecutionBlock>,
}

impl Default for DepositDataTree {
    fn default() -> Self {
        Self {
            tree: MerkleTree::Zero(DEPOSIT_CONTRACT_TREE_DEPTH),
            deposit_count: 0,
            finalized_execution_block: None,
        }
    }
}

impl DepositDataTree {
    /// Root of the tree with the deposit count mixed in, as returned by `get_deposit_root()`.
    #[must_use]
    pub fn root(&self) -> H256 {
        hash_256_256(self.tree.hash(), uint_chunk(self.deposit_count))
    }

    #[must_use]
    pub const fn deposit_count(&self) -> u64 {
        self.deposit_count
    }

    #[must_use]
    pub const fn finalized_execution_block(&self) -> Option<FinalizedExecutionBlock> {
        self.finalized_execution_block
    }

    pub fn push(&mut self, index: DepositIndex, data: &DepositData) -> Result<(), Error> {
        self.validate_index(index)?;
        self.push_leaf(data.hash_tree_root())
    }

    pub fn push_leaf(&mut self, leaf: H256) -> Result<(), Error> {
        self.validate_index(self.deposit_count)?;
        self.tree.push_leaf(leaf, DEPOSIT_CONTRACT_TREE_DEPTH)?;
        self.deposit_count += 1;
        Ok(())
    }

    /// Returns a proof of the deposit at `index` against [`DepositDataTree::root`].
    ///
    /// The last element of the proof is the mixed in deposit count.
    pub fn proof(&self, index: DepositIndex) -> Result<Vec<H256>, Error> {
        if index >= self.deposit_count {
            return Err(Error::IndexOutOfRange {
                index,
                deposit_count: self.deposit_count,
            });
        }

        let (_, mut proof) = self
            .tree
            .generate_proof(index, DEPOSIT_CONTRACT_TREE_DEPTH)?;

        proof.push(uint_chunk(self.deposit_count));

        Ok(proof)
    }

    /// Prunes the tree up to `block.deposit_count`.
    ///
    /// Proofs can no longer be generated for finalized deposits.
    pub fn finalize(&mut self, block: FinalizedExecutionBlock) -> Result<(), Error> {
        let FinalizedExecutionBlock { deposit_count, .. } = block;

        if deposit_count > self.deposit_count {
            return Err(Error::FinalizedBeyondTree {
                finalized: deposit_count,
                deposit_count: self.deposit_count,
            });
        }

        if let Some(previous) = self.finalized_execution_block {
            if deposit_count < previous.deposit_count {
                return Ok(());
            }
        }

        self.tree
            .finalize(deposit_count, DEPOSIT_CONTRACT_TREE_DEPTH)?;

        self.finalized_execution_block = Some(block);

        Ok(())
    }

    /// Returns [`None`] if the tree has never been finalized.
    #[must_use]
    pub fn snapshot(&self) -> Option<DepositTreeSnapshot> {
        let block = self.finalized_execution_block?;

        Some(DepositTreeSnapshot {
            finalized: self.tree.finalized_hashes(),
            deposit_root: block.deposit_root,
            deposit_count: block.deposit_count,
            execution_block_hash: block.block_hash,
            execution_block_height: block.block_height,
        })
    }

    pub fn from_snapshot(snapshot: &DepositTreeSnapshot) -> Result<Self, Error> {
        if !snapshot.is_valid() {
            return Err(Error::InvalidSnapshot {
                deposit_root: snapshot.deposit_root,
            });
        }

        let tree = MerkleTree::from_finalized_hashes(
            &snapshot.finalized,
            snapshot.deposit_count,
            DEPOSIT_CONTRACT_TREE_DEPTH,
        )?;

        Ok(Self {
            tree,
            deposit_count: snapshot.deposit_count,
            finalized_execution_block: Some(snapshot.finalized_execution_block()),
        })
    }

    fn validate_index(&self, index: DepositIndex) -> Result<(), Error> {
        if index >= MAX_DEPOSITS {
            return Err(Error::Full { index });
        }

        if index != self.deposit_count {
            return Err(Error::UnexpectedIndex {
                expected: self.deposit_count,
                actual: index,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("attempted to add deposit with index {index} to full deposit tree")]
    Full { index: DepositIndex },
    #[error("attempted to add deposit with index {actual} when {expected} was expected")]
    UnexpectedIndex {
        expected: DepositIndex,
        actual: DepositIndex,
    },
    #[error("deposit index {index} is out of range (deposit count: {deposit_count})")]
    IndexOutOfRange {
        index: DepositIndex,
        deposit_count: u64,
    },
    #[error("cannot finalize {finalized} deposits in tree with {deposit_count}")]
    FinalizedBeyondTree { finalized: u64, deposit_count: u64 },
    #[error("snapshot does not hash to its deposit root {deposit_root:?}")]
    InvalidSnapshot { deposit_root: H256 },
    #[error(transparent)]
    MerkleTree(#[from] MerkleTreeError),
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use hashing::merkleize;
    use types::phase0::{
        consts::DEPOSIT_PROOF_LENGTH,
        primitives::{PublicKeyBytes, SignatureBytes},
    };

    use crate::merkle_tree::verify_merkle_proof;

    use super::*;

    fn deposit_data(seed: u8) -> DepositData {
        DepositData {
            pubkey: PublicKeyBytes::repeat_byte(seed),
            withdrawal_credentials: H256::repeat_byte(seed),
            amount: 32_000_000_000,
            signature: SignatureBytes::repeat_byte(seed),
        }
    }

    fn tree_with_deposits(count: u8) -> Result<DepositDataTree> {
        let mut tree = DepositDataTree::default();

        for seed in 0..count {
            tree.push(seed.into(), &deposit_data(seed))?;
        }

        Ok(tree)
    }

    #[test]
    fn empty_tree_root_is_zero_root_with_zero_count() {
        let tree = DepositDataTree::default();
        let expected = hash_256_256(
            merkleize(&[], DEPOSIT_CONTRACT_TREE_DEPTH),
            H256::zero(),
        );

        assert_eq!(tree.root(), expected);
        assert_eq!(tree.deposit_count(), 0);
    }

    #[test]
    fn root_matches_full_merkleization() -> Result<()> {
        let tree = tree_with_deposits(10)?;

        let leaves = (0..10)
            .map(|seed| deposit_data(seed).hash_tree_root())
            .collect::<Vec<_>>();

        let expected = hash_256_256(
            merkleize(&leaves, DEPOSIT_CONTRACT_TREE_DEPTH),
            uint_chunk(10),
        );

        assert_eq!(tree.root(), expected);
        assert_eq!(tree.deposit_count(), 10);

        Ok(())
    }

    #[test]
    fn proofs_verify_against_root() -> Result<()> {
        let tree = tree_with_deposits(10)?;

        for seed in 0..10 {
            let proof = tree.proof(seed.into())?;

            assert_eq!(proof.len(), DEPOSIT_PROOF_LENGTH);
            assert!(verify_merkle_proof(
                deposit_data(seed).hash_tree_root(),
                &proof,
                DEPOSIT_PROOF_LENGTH,
                seed.into(),
                tree.root(),
            ));
        }

        assert!(matches!(
            tree.proof(10),
            Err(Error::IndexOutOfRange { index: 10, deposit_count: 10 }),
        ));

        Ok(())
    }

    #[test]
    fn push_rejects_unexpected_index() -> Result<()> {
        let mut tree = tree_with_deposits(3)?;
        let root_before = tree.root();

        assert!(matches!(
            tree.push(5, &deposit_data(5)),
            Err(Error::UnexpectedIndex { expected: 3, actual: 5 }),
        ));
        assert_eq!(tree.root(), root_before);

        Ok(())
    }

    #[test]
    fn snapshot_restores_tree_that_continues_to_grow() -> Result<()> {
        let mut tree = tree_with_deposits(5)?;

        assert_eq!(tree.snapshot(), None);

        let block = FinalizedExecutionBlock {
            deposit_root: tree.root(),
            deposit_count: 5,
            block_hash: H256::repeat_byte(0xab),
            block_height: 100,
        };

        tree.finalize(block)?;

        let snapshot = tree.snapshot().expect("tree was finalized");

        assert!(snapshot.is_valid());
        assert_eq!(snapshot.finalized_execution_block(), block);

        let json = serde_json::to_string(&snapshot)?;
        let mut restored = DepositDataTree::from_snapshot(&serde_json::from_str(&json)?)?;

        assert_eq!(restored.root(), tree.root());

        let full = tree_with_deposits(8)?;

        for seed in 5..8 {
            restored.push(seed.into(), &deposit_data(seed))?;
        }

        assert_eq!(restored.root(), full.root());
        assert!(restored.proof(7).is_ok());
        assert!(restored.proof(0).is_err());

        Ok(())
    }

    #[test]
    fn snapshot_with_wrong_root_is_rejected() -> Result<()> {
        let mut tree = tree_with_deposits(4)?;

        tree.finalize(FinalizedExecutionBlock {
            deposit_root: tree.root(),
            deposit_count: 4,
            block_hash: H256::zero(),
            block_height: 1,
        })?;

        let mut snapshot = tree.snapshot().expect("tree was finalized");
        snapshot.deposit_root = H256::repeat_byte(1);

        assert!(matches!(
            DepositDataTree::from_snapshot(&snapshot),
            Err(Error::InvalidSnapshot { .. }),
        ));

        Ok(())
    }

    #[test]
    fn finalize_rejects_count_beyond_tree() -> Result<()> {
        let mut tree = tree_with_deposits(2)?;

        let result = tree.finalize(FinalizedExecutionBlock {
            deposit_count: 3,
            ..FinalizedExecutionBlock::default()
        });

        assert!(matches!(
            result,
            Err(Error::FinalizedBeyondTree { finalized: 3, deposit_count: 2 }),
        ));

        Ok(())
    }
}
