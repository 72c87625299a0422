use hashing::{hash_256_256, ZERO_HASHES};
use thiserror::Error;
use types::phase0::primitives::H256;

/// Right-sparse Merkle tree as described in [EIP-4881].
///
/// Only the leftmost leaves are populated. Subtrees to the right of them are all zeros and are
/// represented by a single [`MerkleTree::Zero`] node. Subtrees to the left can be collapsed into
/// [`MerkleTree::Finalized`] nodes once they will never be needed for proofs again.
///
/// [EIP-4881]: https://eips.ethereum.org/EIPS/eip-4881
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum MerkleTree {
    Zero(usize),
    Leaf(H256),
    Node(H256, Box<Self>, Box<Self>),
    Finalized(H256),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum MerkleTreeError {
    #[error("attempted to push into a leaf")]
    LeafReached,
    #[error("Merkle tree is full")]
    MerkleTreeFull,
    #[error("Merkle tree is malformed")]
    Invalid,
    #[error("depth is too small")]
    DepthTooSmall,
    #[error("attempted to finalize a zero subtree")]
    ZeroNodeFinalized,
    #[error("attempted to push into a finalized subtree")]
    FinalizedNodePushed,
    #[error("snapshot has no finalized hashes but {deposit_count} deposits")]
    EmptyBranchWithNonZeroDeposits { deposit_count: u64 },
    #[error("snapshot has more finalized deposits than fit in the tree")]
    SnapshotEndOfTree,
    #[error("proof path crosses a finalized subtree")]
    ProofEncounteredFinalizedNode,
    #[error("no leaf at requested index")]
    ProofEncounteredZeroNode,
}

impl MerkleTree {
    #[must_use]
    pub fn create(leaves: &[H256], depth: usize) -> Self {
        if leaves.is_empty() {
            return Self::Zero(depth);
        }

        if depth == 0 {
            debug_assert_eq!(leaves.len(), 1);
            return Self::Leaf(leaves[0]);
        }

        let capacity = 1 << (depth - 1);
        let (left_leaves, right_leaves) = leaves.split_at(leaves.len().min(capacity));
        let left = Self::create(left_leaves, depth - 1);
        let right = Self::create(right_leaves, depth - 1);

        Self::node(left, right)
    }

    pub fn push_leaf(&mut self, leaf: H256, depth: usize) -> Result<(), MerkleTreeError> {
        if depth == 0 {
            return Err(MerkleTreeError::DepthTooSmall);
        }

        match self {
            Self::Leaf(_) => return Err(MerkleTreeError::LeafReached),
            Self::Finalized(_) => return Err(MerkleTreeError::FinalizedNodePushed),
            Self::Zero(_) => *self = Self::create(&[leaf], depth),
            Self::Node(hash, left, right) => {
                match (&**left, &**right) {
                    (
                        Self::Leaf(_) | Self::Finalized(_),
                        Self::Leaf(_) | Self::Finalized(_),
                    ) => {
                        return Err(MerkleTreeError::MerkleTreeFull);
                    }
                    (Self::Node(..) | Self::Finalized(_), Self::Node(..)) => {
                        right.push_leaf(leaf, depth - 1)?;
                    }
                    (Self::Zero(_), Self::Zero(_)) => {
                        **left = Self::create(&[leaf], depth - 1);
                    }
                    (Self::Leaf(_) | Self::Finalized(_), Self::Zero(_)) => {
                        **right = Self::create(&[leaf], depth - 1);
                    }
                    (Self::Node(..), Self::Zero(_)) => match left.push_leaf(leaf, depth - 1) {
                        Ok(()) => {}
                        Err(MerkleTreeError::MerkleTreeFull) => {
                            **right = Self::create(&[leaf], depth - 1);
                        }
                        Err(error) => return Err(error),
                    },
                    _ => return Err(MerkleTreeError::Invalid),
                }

                *hash = hash_256_256(left.hash(), right.hash());
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn hash(&self) -> H256 {
        match *self {
            Self::Zero(depth) => ZERO_HASHES[depth],
            Self::Leaf(hash) | Self::Node(hash, _, _) | Self::Finalized(hash) => hash,
        }
    }

    /// Collapses the subtrees that contain only the first `deposit_count` leaves.
    pub fn finalize(&mut self, deposit_count: u64, level: usize) -> Result<(), MerkleTreeError> {
        if deposit_count == 0 {
            return Ok(());
        }

        match self {
            Self::Finalized(_) => Ok(()),
            Self::Zero(_) => Err(MerkleTreeError::ZeroNodeFinalized),
            Self::Leaf(hash) => {
                if level != 0 {
                    return Err(MerkleTreeError::Invalid);
                }

                *self = Self::Finalized(*hash);
                Ok(())
            }
            Self::Node(hash, left, right) => {
                if level == 0 {
                    return Err(MerkleTreeError::Invalid);
                }

                let capacity = 1_u64 << level;

                if capacity <= deposit_count {
                    *self = Self::Finalized(*hash);
                    return Ok(());
                }

                left.finalize(deposit_count, level - 1)?;

                if deposit_count > capacity / 2 {
                    right.finalize(deposit_count - capacity / 2, level - 1)?;
                }

                Ok(())
            }
        }
    }

    /// Hashes of finalized subtrees from left to right.
    #[must_use]
    pub fn finalized_hashes(&self) -> Vec<H256> {
        let mut hashes = vec![];
        self.collect_finalized_hashes(&mut hashes);
        hashes
    }

    fn collect_finalized_hashes(&self, hashes: &mut Vec<H256>) {
        match self {
            Self::Zero(_) | Self::Leaf(_) => {}
            Self::Finalized(hash) => hashes.push(*hash),
            Self::Node(_, left, right) => {
                left.collect_finalized_hashes(hashes);
                right.collect_finalized_hashes(hashes);
            }
        }
    }

    pub fn from_finalized_hashes(
        finalized: &[H256],
        deposit_count: u64,
        level: usize,
    ) -> Result<Self, MerkleTreeError> {
        if deposit_count == 0 {
            return Ok(Self::Zero(level));
        }

        let Some((first, rest)) = finalized.split_first() else {
            return Err(MerkleTreeError::EmptyBranchWithNonZeroDeposits { deposit_count });
        };

        if deposit_count == 1 << level {
            return Ok(Self::Finalized(*first));
        }

        if level == 0 {
            return Err(MerkleTreeError::SnapshotEndOfTree);
        }

        let half = 1_u64 << (level - 1);

        let (left, right) = if deposit_count <= half {
            (
                Self::from_finalized_hashes(finalized, deposit_count, level - 1)?,
                Self::Zero(level - 1),
            )
        } else {
            (
                Self::Finalized(*first),
                Self::from_finalized_hashes(rest, deposit_count - half, level - 1)?,
            )
        };

        Ok(Self::node(left, right))
    }

    /// Returns the leaf at `index` and its branch in bottom-up order.
    pub fn generate_proof(
        &self,
        index: u64,
        depth: usize,
    ) -> Result<(H256, Vec<H256>), MerkleTreeError> {
        let mut proof = Vec::with_capacity(depth);
        let mut node = self;

        for level in (0..depth).rev() {
            let (left, right) = match node {
                Self::Node(_, left, right) => (left, right),
                Self::Finalized(_) => return Err(MerkleTreeError::ProofEncounteredFinalizedNode),
                Self::Zero(_) => return Err(MerkleTreeError::ProofEncounteredZeroNode),
                Self::Leaf(_) => return Err(MerkleTreeError::Invalid),
            };

            if (index >> level) & 1 == 1 {
                proof.push(left.hash());
                node = right;
            } else {
                proof.push(right.hash());
                node = left;
            }
        }

        let Self::Leaf(leaf) = *node else {
            return Err(MerkleTreeError::ProofEncounteredZeroNode);
        };

        proof.reverse();

        Ok((leaf, proof))
    }

    fn node(left: Self, right: Self) -> Self {
        let hash = hash_256_256(left.hash(), right.hash());
        Self::Node(hash, Box::new(left), Box::new(right))
    }
}

/// Checks that `leaf` is at `index` in a tree rooted at `root`.
#[must_use]
pub fn verify_merkle_proof(leaf: H256, branch: &[H256], depth: usize, index: u64, root: H256) -> bool {
    branch.len() == depth && merkle_root_from_branch(leaf, branch, index) == root
}

#[must_use]
pub fn merkle_root_from_branch(leaf: H256, branch: &[H256], index: u64) -> H256 {
    branch
        .iter()
        .enumerate()
        .fold(leaf, |node, (height, sibling)| {
            if (index >> height) & 1 == 1 {
                hash_256_256(*sibling, node)
            } else {
                hash_256_256(node, *sibling)
            }
        })
}
