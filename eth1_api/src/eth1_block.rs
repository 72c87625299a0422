use execution_engine::WithdrawalV1;
use serde::{Deserialize, Serialize};
use types::{
    bellatrix::primitives::Difficulty,
    phase0::primitives::{ExecutionBlockHash, ExecutionBlockNumber, UnixSeconds, H256},
};

/// Block as returned by `eth_getBlockByHash` and `eth_getBlockByNumber` without full transactions.
///
/// Only the fields needed for deposit processing and payload reconstruction are deserialized.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionBlock {
    pub hash: ExecutionBlockHash,
    pub parent_hash: ExecutionBlockHash,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub number: ExecutionBlockNumber,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub timestamp: UnixSeconds,
    // Some execution clients stopped reporting total difficulty after the Merge.
    #[serde(default, with = "serde_utils::prefixed_hex_quantity::option")]
    pub total_difficulty: Option<Difficulty>,
    #[serde(default)]
    pub transactions: Vec<H256>,
    #[serde(default)]
    pub withdrawals: Option<Vec<WithdrawalV1>>,
}

/// Header fields of an execution block kept in the header cache.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct HeaderInfo {
    pub hash: ExecutionBlockHash,
    pub parent_hash: ExecutionBlockHash,
    pub number: ExecutionBlockNumber,
    pub timestamp: UnixSeconds,
    pub total_difficulty: Difficulty,
}

impl From<&ExecutionBlock> for HeaderInfo {
    fn from(block: &ExecutionBlock) -> Self {
        Self {
            hash: block.hash,
            parent_hash: block.parent_hash,
            number: block.number,
            timestamp: block.timestamp,
            total_difficulty: block.total_difficulty.unwrap_or_default(),
        }
    }
}

impl From<ExecutionBlock> for HeaderInfo {
    fn from(block: ExecutionBlock) -> Self {
        Self::from(&block)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use serde_json::json;

    use super::*;

    #[test]
    fn block_without_total_difficulty_is_accepted() -> serde_json::Result<()> {
        let block = serde_json::from_value::<ExecutionBlock>(json!({
            "hash": "0x49a38631ab242befe4d9fbb1a49c7059c21363a534542f8bcf419a82b92a229b",
            "parentHash": "0x128133536f44733af5e59ba865744690498529592c1e85655348ec6bb559c658",
            "number": "0x29",
            "timestamp": "0x671214b3",
            "miner": "0x8943545177806ed17b9f23f0a21ee5948ecaa776",
            "transactions": [],
        }))?;

        let header = HeaderInfo::from(block);

        assert_eq!(
            header.hash,
            H256(hex!(
                "49a38631ab242befe4d9fbb1a49c7059c21363a534542f8bcf419a82b92a229b"
            )),
        );
        assert_eq!(header.number, 41);
        assert_eq!(header.timestamp, 1_729_238_195);
        assert_eq!(header.total_difficulty, Difficulty::zero());

        Ok(())
    }

    #[test]
    fn block_with_transactions_and_withdrawals_is_accepted() -> serde_json::Result<()> {
        let block = serde_json::from_value::<ExecutionBlock>(json!({
            "hash": H256::repeat_byte(1),
            "parentHash": H256::repeat_byte(2),
            "number": "0x1b4",
            "timestamp": "0x55ba467c",
            "totalDifficulty": "0xc70d815d562d3cfa955",
            "transactions": [H256::repeat_byte(3), H256::repeat_byte(4)],
            "withdrawals": [{
                "index": "0xbb",
                "validatorIndex": "0xd1",
                "address": "0x65d08a056c17ae13370565b04cf77d2afa1cb9fa",
                "amount": "0x51f0",
            }],
        }))?;

        assert_eq!(block.number, 436);
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.withdrawals.map(|withdrawals| withdrawals.len()), Some(1));
        assert_eq!(
            block.total_difficulty,
            Some(Difficulty::from_str_radix("c70d815d562d3cfa955", 16).unwrap_or_default()),
        );

        Ok(())
    }
}
