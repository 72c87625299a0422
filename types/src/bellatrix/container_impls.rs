use hashing::SszHash;

use crate::{
    bellatrix::{
        containers::{ExecutionPayload, ExecutionPayloadHeader},
        primitives::{logs_bloom_root, transactions_root, Transaction},
    },
    phase0::primitives::H256,
};

impl SszHash for ExecutionPayload {
    fn hash_tree_root(&self) -> H256 {
        hashing::container_root(&[
            self.parent_hash,
            self.fee_recipient.hash_tree_root(),
            self.state_root,
            self.receipts_root,
            logs_bloom_root(&self.logs_bloom),
            self.prev_randao,
            self.block_number.hash_tree_root(),
            self.gas_limit.hash_tree_root(),
            self.gas_used.hash_tree_root(),
            self.timestamp.hash_tree_root(),
            self.extra_data.hash_tree_root(),
            self.base_fee_per_gas.hash_tree_root(),
            self.block_hash,
            transactions_root(&self.transactions),
        ])
    }
}

impl SszHash for ExecutionPayloadHeader {
    fn hash_tree_root(&self) -> H256 {
        hashing::container_root(&[
            self.parent_hash,
            self.fee_recipient.hash_tree_root(),
            self.state_root,
            self.receipts_root,
            logs_bloom_root(&self.logs_bloom),
            self.prev_randao,
            self.block_number.hash_tree_root(),
            self.gas_limit.hash_tree_root(),
            self.gas_used.hash_tree_root(),
            self.timestamp.hash_tree_root(),
            self.extra_data.hash_tree_root(),
            self.base_fee_per_gas.hash_tree_root(),
            self.block_hash,
            self.transactions_root,
        ])
    }
}

impl From<&ExecutionPayload> for ExecutionPayloadHeader {
    fn from(payload: &ExecutionPayload) -> Self {
        let ExecutionPayload {
            parent_hash,
            fee_recipient,
            state_root,
            receipts_root,
            logs_bloom,
            prev_randao,
            block_number,
            gas_limit,
            gas_used,
            timestamp,
            ref extra_data,
            base_fee_per_gas,
            block_hash,
            ref transactions,
        } = *payload;

        Self {
            parent_hash,
            fee_recipient,
            state_root,
            receipts_root,
            logs_bloom,
            prev_randao,
            block_number,
            gas_limit,
            gas_used,
            timestamp,
            extra_data: extra_data.clone(),
            base_fee_per_gas,
            block_hash,
            transactions_root: transactions_root(transactions),
        }
    }
}

impl ExecutionPayloadHeader {
    #[must_use]
    pub fn with_transactions(&self, transactions: Vec<Transaction>) -> ExecutionPayload {
        let Self {
            parent_hash,
            fee_recipient,
            state_root,
            receipts_root,
            logs_bloom,
            prev_randao,
            block_number,
            gas_limit,
            gas_used,
            timestamp,
            ref extra_data,
            base_fee_per_gas,
            block_hash,
            transactions_root: _,
        } = *self;

        ExecutionPayload {
            parent_hash,
            fee_recipient,
            state_root,
            receipts_root,
            logs_bloom,
            prev_randao,
            block_number,
            gas_limit,
            gas_used,
            timestamp,
            extra_data: extra_data.clone(),
            base_fee_per_gas,
            block_hash,
            transactions,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::bellatrix::primitives::ExtraData;

    use super::*;

    #[test]
    fn payload_and_header_have_same_root() {
        let payload = ExecutionPayload {
            block_number: 15_537_394,
            gas_limit: 30_000_000,
            extra_data: ExtraData(b"merge".to_vec()),
            base_fee_per_gas: 7.into(),
            block_hash: H256::repeat_byte(0xbb),
            transactions: vec![Transaction(vec![1, 2, 3]), Transaction(vec![0xff; 100])],
            ..ExecutionPayload::default()
        };

        let header = ExecutionPayloadHeader::from(&payload);

        assert_eq!(payload.hash_tree_root(), header.hash_tree_root());
        assert_eq!(header.with_transactions(payload.transactions.clone()), payload);
    }

    #[test]
    fn transactions_change_root() {
        let empty = ExecutionPayload::default();
        let nonempty = ExecutionPayload {
            transactions: vec![Transaction(vec![0])],
            ..ExecutionPayload::default()
        };

        assert_ne!(empty.hash_tree_root(), nonempty.hash_tree_root());
    }
}
