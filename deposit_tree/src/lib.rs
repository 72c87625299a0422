pub use crate::{
    deposit_tree::{DepositDataTree, Error},
    merkle_tree::{merkle_root_from_branch, verify_merkle_proof, MerkleTree, MerkleTreeError},
    snapshot::{DepositTreeSnapshot, FinalizedExecutionBlock},
};

mod deposit_tree;
mod merkle_tree;
mod snapshot;
