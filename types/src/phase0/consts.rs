use crate::phase0::primitives::{Epoch, Gwei};

pub const DEPOSIT_CONTRACT_TREE_DEPTH: usize = 32;
pub const FAR_FUTURE_EPOCH: Epoch = Epoch::MAX;
pub const GENESIS_EPOCH: Epoch = 0;
pub const MAX_EFFECTIVE_BALANCE: Gwei = 32_000_000_000;

// `Deposit.proof` has one extra element for the mixed in deposit count.
pub const DEPOSIT_PROOF_LENGTH: usize = DEPOSIT_CONTRACT_TREE_DEPTH + 1;
