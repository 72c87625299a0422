use hashing::SszHash;

use crate::{
    bellatrix::primitives::{logs_bloom_root, transactions_root, Transaction},
    capella::containers::{withdrawals_root, Withdrawal},
    deneb::containers::{ExecutionPayload, ExecutionPayloadHeader},
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
            withdrawals_root(&self.withdrawals),
            self.blob_gas_used.hash_tree_root(),
            self.excess_blob_gas.hash_tree_root(),
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
            self.withdrawals_root,
            self.blob_gas_used.hash_tree_root(),
            self.excess_blob_gas.hash_tree_root(),
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
            ref withdrawals,
            blob_gas_used,
            excess_blob_gas,
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
            withdrawals_root: withdrawals_root(withdrawals),
            blob_gas_used,
            excess_blob_gas,
        }
    }
}

impl ExecutionPayloadHeader {
    #[must_use]
    pub fn with_body(
        &self,
        transactions: Vec<Transaction>,
        withdrawals: Vec<Withdrawal>,
    ) -> ExecutionPayload {
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
            withdrawals_root: _,
            blob_gas_used,
            excess_blob_gas,
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
            withdrawals,
            blob_gas_used,
            excess_blob_gas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_and_header_have_same_root() {
        let payload = ExecutionPayload {
            block_number: 19_426_587,
            transactions: vec![Transaction(vec![0x03; 33])],
            blob_gas_used: 131_072,
            excess_blob_gas: 262_144,
            ..ExecutionPayload::default()
        };

        let header = ExecutionPayloadHeader::from(&payload);

        assert_eq!(payload.hash_tree_root(), header.hash_tree_root());
        assert_eq!(
            header.with_body(payload.transactions.clone(), vec![]),
            payload,
        );
    }
}
