use hashing::SszHash;

use crate::phase0::{
    containers::DepositData,
    primitives::H256,
};

impl SszHash for DepositData {
    fn hash_tree_root(&self) -> H256 {
        hashing::container_root(&[
            hashing::byte_vector_root(self.pubkey.as_bytes()),
            self.withdrawal_credentials,
            self.amount.hash_tree_root(),
            hashing::byte_vector_root(self.signature.as_bytes()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use hashing::{hash_256_256, ZERO_HASHES};

    use super::*;

    #[test]
    fn zero_deposit_data_root_is_built_from_zero_subtrees() {
        // pubkey: 2 chunks, signature: 3 chunks padded to 4.
        let expected = hash_256_256(
            hash_256_256(ZERO_HASHES[1], H256::zero()),
            hash_256_256(H256::zero(), ZERO_HASHES[2]),
        );

        assert_eq!(DepositData::default().hash_tree_root(), expected);
    }

    #[test]
    fn deposit_data_root_depends_on_amount() {
        let deposit_data = DepositData {
            amount: 32_000_000_000,
            ..DepositData::default()
        };

        assert_ne!(
            deposit_data.hash_tree_root(),
            DepositData::default().hash_tree_root(),
        );
    }
}
