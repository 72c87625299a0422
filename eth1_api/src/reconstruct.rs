use anyhow::{ensure, Result};
use async_trait::async_trait;
use features::Feature;
use log::debug;
use types::{
    combined::{SignedBeaconBlock, SignedBlindedBeaconBlock, SignedBlock},
    nonstandard::ExecutionPayloadBody,
    phase0::primitives::ExecutionBlockHash,
};

use crate::{error::Error, eth1_api::Eth1Api};

/// Body of an execution block along with the hash the execution client reported for it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RetrievedBody {
    pub block_hash: ExecutionBlockHash,
    pub body: ExecutionPayloadBody,
}

/// Way of retrieving transactions and withdrawals of execution blocks.
#[async_trait]
pub trait PayloadBodySource: Send + Sync {
    /// Returns one body per element of `block_hashes`, in the same order.
    async fn payload_bodies(
        &self,
        eth1_api: &Eth1Api,
        block_hashes: &[ExecutionBlockHash],
    ) -> Result<Vec<RetrievedBody>>;
}

/// Retrieves bodies with a single `engine_getPayloadBodiesByHashV1` call.
pub struct BulkPayloadBodies;

#[async_trait]
impl PayloadBodySource for BulkPayloadBodies {
    async fn payload_bodies(
        &self,
        eth1_api: &Eth1Api,
        block_hashes: &[ExecutionBlockHash],
    ) -> Result<Vec<RetrievedBody>> {
        let bodies = eth1_api.get_payload_bodies_by_hash(block_hashes).await?;

        ensure!(
            bodies.len() == block_hashes.len(),
            Error::InvalidResponse {
                message: format!(
                    "requested {} payload bodies but received {}",
                    block_hashes.len(),
                    bodies.len(),
                ),
            },
        );

        // The method does not echo block hashes back.
        Ok(block_hashes
            .iter()
            .copied()
            .zip(bodies)
            .map(|(block_hash, body)| RetrievedBody { block_hash, body })
            .collect())
    }
}

/// Retrieves each block with `eth_getBlockByHash` and its transactions with
/// `eth_getRawTransactionByHash`.
pub struct PerHashPayloadBodies;

#[async_trait]
impl PayloadBodySource for PerHashPayloadBodies {
    async fn payload_bodies(
        &self,
        eth1_api: &Eth1Api,
        block_hashes: &[ExecutionBlockHash],
    ) -> Result<Vec<RetrievedBody>> {
        let blocks = eth1_api.execution_blocks_by_hashes(block_hashes).await?;
        let mut retrieved = Vec::with_capacity(blocks.len());

        for (block, requested_hash) in blocks.into_iter().zip(block_hashes.iter().copied()) {
            let block = block?.ok_or(Error::MissingExecutionBlock {
                block_hash: requested_hash,
            })?;

            let transactions = eth1_api
                .raw_transactions_by_hashes(&block.transactions)
                .await?;

            let withdrawals = block
                .withdrawals
                .map(|withdrawals| withdrawals.into_iter().map(Into::into).collect());

            retrieved.push(RetrievedBody {
                block_hash: block.hash,
                body: ExecutionPayloadBody {
                    transactions,
                    withdrawals,
                },
            });
        }

        Ok(retrieved)
    }
}

#[must_use]
pub fn payload_body_source() -> Box<dyn PayloadBodySource> {
    if Feature::EngineApiPayloadBodies.is_enabled() {
        Box::new(BulkPayloadBodies)
    } else {
        Box::new(PerHashPayloadBodies)
    }
}

impl Eth1Api {
    pub async fn reconstruct_full_block(&self, block: SignedBlock) -> Result<SignedBeaconBlock> {
        let mut full_blocks = self.reconstruct_full_blocks(vec![block]).await?;

        full_blocks.pop().ok_or_else(|| {
            Error::InvalidResponse {
                message: "no block was reconstructed".to_owned(),
            }
            .into()
        })
    }

    /// Replaces execution payload headers of blinded blocks with full payloads.
    ///
    /// All inputs are checked before any request is made.
    /// Every payload is verified against the header it replaces.
    pub async fn reconstruct_full_blocks(
        &self,
        blocks: Vec<SignedBlock>,
    ) -> Result<Vec<SignedBeaconBlock>> {
        let blinded_blocks = blocks
            .into_iter()
            .map(|block| match block {
                SignedBlock::Full(_) => Err(Error::AlreadyFull),
                SignedBlock::Blinded(block) => {
                    if block.execution_payload_header().block_hash().is_zero() {
                        Err(Error::ZeroBlockHash)
                    } else {
                        Ok(*block)
                    }
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if blinded_blocks.is_empty() {
            return Ok(vec![]);
        }

        let block_hashes = blinded_blocks
            .iter()
            .map(|block| block.execution_payload_header().block_hash())
            .collect::<Vec<_>>();

        let retrieved = self
            .payload_body_source()
            .payload_bodies(self, &block_hashes)
            .await?;

        ensure!(
            retrieved.len() == blinded_blocks.len(),
            Error::InvalidResponse {
                message: format!(
                    "retrieved {} payload bodies for {} blocks",
                    retrieved.len(),
                    blinded_blocks.len(),
                ),
            },
        );

        blinded_blocks
            .into_iter()
            .zip(retrieved)
            .map(|(block, retrieved)| unblind(block, retrieved))
            .collect()
    }
}

fn unblind(block: SignedBlindedBeaconBlock, retrieved: RetrievedBody) -> Result<SignedBeaconBlock> {
    let RetrievedBody { block_hash, body } = retrieved;
    let header = block.execution_payload_header();
    let payload = header.with_body(body)?;

    ensure!(
        payload.block_hash() == block_hash,
        Error::BlockHashMismatch {
            expected: block_hash,
            actual: payload.block_hash(),
        },
    );

    ensure!(
        payload.to_header() == *header,
        Error::ReconstructedPayloadMismatch { block_hash },
    );

    debug!(
        "reconstructed execution payload of block at slot {} (block hash: {block_hash:?})",
        block.message.slot,
    );

    Ok(block.with_execution_payload(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use httpmock::{Method, MockServer};
    use reqwest::Client;
    use serde_json::{json, Value};
    use types::{
        bellatrix::primitives::Transaction,
        capella::containers::{ExecutionPayload as CapellaExecutionPayload, Withdrawal},
        combined::{BlindedBeaconBlock, BlindedBeaconBlockBody, ExecutionPayload},
        config::Config,
        phase0::{
            containers::Eth1Data,
            primitives::{SignatureBytes, H256},
        },
    };

    use crate::transport::HttpTransport;

    use super::*;

    const BLOCK_HASH: H256 = H256::repeat_byte(0xbb);
    const TRANSACTION_HASH: H256 = H256::repeat_byte(0x77);

    fn payload() -> ExecutionPayload {
        ExecutionPayload::Capella(CapellaExecutionPayload {
            block_number: 17_034_870,
            block_hash: BLOCK_HASH,
            transactions: vec![Transaction(vec![0x02, 0xf8, 0x73])],
            withdrawals: vec![Withdrawal {
                index: 1,
                validator_index: 2,
                amount: 3,
                ..Withdrawal::default()
            }],
            ..CapellaExecutionPayload::default()
        })
    }

    fn withdrawals_json() -> Value {
        json!([{
            "index": "0x1",
            "validatorIndex": "0x2",
            "address": "0x0000000000000000000000000000000000000000",
            "amount": "0x3",
        }])
    }

    fn blinded_block() -> SignedBlindedBeaconBlock {
        SignedBlindedBeaconBlock {
            message: BlindedBeaconBlock {
                slot: 6_209_536,
                proposer_index: 0,
                parent_root: H256::zero(),
                state_root: H256::zero(),
                body: BlindedBeaconBlockBody {
                    randao_reveal: SignatureBytes::zero(),
                    eth1_data: Eth1Data::default(),
                    graffiti: H256::zero(),
                    execution_payload_header: payload().to_header(),
                },
            },
            signature: SignatureBytes::zero(),
        }
    }

    fn eth1_api(server: &MockServer, source: Box<dyn PayloadBodySource>) -> Result<Eth1Api> {
        let transport = HttpTransport::new(Client::new(), server.url("/").parse()?, Arc::default());

        Ok(
            Eth1Api::new(Arc::new(Config::mainnet()), Arc::new(transport), None)
                .with_payload_body_source(source),
        )
    }

    fn mock_per_hash_responses(server: &MockServer, returned_hash: H256) {
        server.mock(|when, then| {
            when.method(Method::POST)
                .path("/")
                .body_contains("eth_getBlockByHash");
            then.status(200).json_body(json!([{
                "jsonrpc": "2.0",
                "id": 0,
                "result": {
                    "hash": returned_hash,
                    "parentHash": H256::zero(),
                    "number": "0x103ed76",
                    "timestamp": "0x0",
                    "transactions": [TRANSACTION_HASH],
                    "withdrawals": withdrawals_json(),
                },
            }]));
        });

        server.mock(|when, then| {
            when.method(Method::POST)
                .path("/")
                .body_contains("eth_getRawTransactionByHash");
            then.status(200).json_body(json!([{
                "jsonrpc": "2.0",
                "id": 0,
                "result": "0x02f873",
            }]));
        });
    }

    #[tokio::test]
    async fn full_blocks_are_rejected_without_requests() -> Result<()> {
        let server = MockServer::start();

        let mock = server.mock(|when, then| {
            when.method(Method::POST).path("/");
            then.status(200).json_body(json!({"jsonrpc": "2.0", "id": 1, "result": null}));
        });

        let full_block = blinded_block().with_execution_payload(payload());

        let error = eth1_api(&server, Box::new(PerHashPayloadBodies))?
            .reconstruct_full_block(SignedBlock::Full(Box::new(full_block)))
            .await
            .expect_err("block is already full");

        assert_eq!(error.downcast_ref(), Some(&Error::AlreadyFull));
        assert_eq!(mock.hits(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn blocks_with_zero_block_hash_are_rejected() -> Result<()> {
        let server = MockServer::start();

        let mut block = blinded_block();
        block.message.body.execution_payload_header = ExecutionPayload::Capella(
            CapellaExecutionPayload::default(),
        )
        .to_header();

        let error = eth1_api(&server, Box::new(PerHashPayloadBodies))?
            .reconstruct_full_block(SignedBlock::Blinded(Box::new(block)))
            .await
            .expect_err("block hash is zero");

        assert_eq!(error.downcast_ref(), Some(&Error::ZeroBlockHash));

        Ok(())
    }

    #[tokio::test]
    async fn blocks_are_reconstructed_from_blocks_and_raw_transactions() -> Result<()> {
        let server = MockServer::start();

        mock_per_hash_responses(&server, BLOCK_HASH);

        let full_block = eth1_api(&server, Box::new(PerHashPayloadBodies))?
            .reconstruct_full_block(SignedBlock::Blinded(Box::new(blinded_block())))
            .await?;

        assert_eq!(full_block.message.body.execution_payload, payload());
        assert_eq!(full_block.message.slot, 6_209_536);

        Ok(())
    }

    #[tokio::test]
    async fn block_hash_returned_by_execution_client_must_match() -> Result<()> {
        let server = MockServer::start();

        mock_per_hash_responses(&server, H256::repeat_byte(0xcc));

        let error = eth1_api(&server, Box::new(PerHashPayloadBodies))?
            .reconstruct_full_block(SignedBlock::Blinded(Box::new(blinded_block())))
            .await
            .expect_err("execution client returned a different block");

        assert_eq!(
            error.downcast_ref(),
            Some(&Error::BlockHashMismatch {
                expected: H256::repeat_byte(0xcc),
                actual: BLOCK_HASH,
            }),
        );

        Ok(())
    }

    #[tokio::test]
    async fn blocks_are_reconstructed_from_payload_bodies() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::POST)
                .path("/")
                .body_contains("engine_getPayloadBodiesByHashV1");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": [
                    {"transactions": ["0x02f873"], "withdrawals": withdrawals_json()},
                    {"transactions": ["0x02f873"], "withdrawals": withdrawals_json()},
                ],
            }));
        });

        let blocks = vec![
            SignedBlock::Blinded(Box::new(blinded_block())),
            SignedBlock::Blinded(Box::new(blinded_block())),
        ];

        let full_blocks = eth1_api(&server, Box::new(BulkPayloadBodies))?
            .reconstruct_full_blocks(blocks)
            .await?;

        assert_eq!(full_blocks.len(), 2);

        for full_block in full_blocks {
            assert_eq!(full_block.message.body.execution_payload, payload());
        }

        Ok(())
    }

    #[tokio::test]
    async fn missing_payload_body_fails_reconstruction() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::POST).path("/");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": [null],
            }));
        });

        // The empty body has no withdrawals, which a Capella header requires.
        eth1_api(&server, Box::new(BulkPayloadBodies))?
            .reconstruct_full_block(SignedBlock::Blinded(Box::new(blinded_block())))
            .await
            .expect_err("execution client does not have the block");

        Ok(())
    }

    #[tokio::test]
    async fn payload_body_with_wrong_transactions_is_rejected() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::POST).path("/");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": [{"transactions": [], "withdrawals": withdrawals_json()}],
            }));
        });

        let error = eth1_api(&server, Box::new(BulkPayloadBodies))?
            .reconstruct_full_block(SignedBlock::Blinded(Box::new(blinded_block())))
            .await
            .expect_err("transactions do not match the header");

        assert_eq!(
            error.downcast_ref(),
            Some(&Error::ReconstructedPayloadMismatch {
                block_hash: BLOCK_HASH,
            }),
        );

        Ok(())
    }
}
