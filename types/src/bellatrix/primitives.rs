use hashing::SszHash;
use serde::{Deserialize, Serialize};

use crate::{
    bellatrix::consts::{
        MAX_BYTES_PER_TRANSACTION, MAX_EXTRA_DATA_BYTES, MAX_TRANSACTIONS_PER_PAYLOAD,
    },
    phase0::primitives::{Bloom, H256, U256},
};

pub type Difficulty = U256;
pub type Gas = u64;
pub type Wei = U256;

/// Opaque transaction as encoded by the execution layer.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Transaction(#[serde(with = "serde_utils::prefixed_hex_bytes")] pub Vec<u8>);

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ExtraData(#[serde(with = "serde_utils::prefixed_hex_bytes")] pub Vec<u8>);

impl SszHash for Transaction {
    fn hash_tree_root(&self) -> H256 {
        hashing::byte_list_root(&self.0, MAX_BYTES_PER_TRANSACTION)
    }
}

impl SszHash for ExtraData {
    fn hash_tree_root(&self) -> H256 {
        hashing::byte_list_root(&self.0, MAX_EXTRA_DATA_BYTES)
    }
}

#[must_use]
pub fn transactions_root(transactions: &[Transaction]) -> H256 {
    hashing::list_root(transactions, MAX_TRANSACTIONS_PER_PAYLOAD)
}

#[must_use]
pub fn logs_bloom_root(logs_bloom: &Bloom) -> H256 {
    hashing::byte_vector_root(logs_bloom.as_bytes())
}
