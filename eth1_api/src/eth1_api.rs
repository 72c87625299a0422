use core::{ops::RangeInclusive, time::Duration};
use std::sync::Arc;

use anyhow::{ensure, Result};
use async_trait::async_trait;
use either::Either;
use execution_engine::{
    EngineGetPayloadV1Response, EngineGetPayloadV2Response, EngineGetPayloadV3Response,
    EngineGetPayloadV4Response, ExecutionEngine, ExecutionPayloadBodyV1, ExecutionPayloadV1,
    ExecutionPayloadV2, ExecutionPayloadV3, ForkChoiceStateV1, ForkChoiceUpdatedResponse,
    PayloadAttributes, PayloadId, PayloadStatusV1, PayloadValidationStatus,
    TransitionConfigurationV1,
};
use log::warn;
use prometheus_metrics::Metrics;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use types::{
    bellatrix::primitives::Transaction,
    combined::{ExecutionPayload, ExecutionPayloadParams},
    config::Config,
    nonstandard::{ExecutionPayloadBody, Phase, WithBlobsAndValue},
    phase0::primitives::{
        DepositIndex, ExecutionBlockHash, ExecutionBlockNumber, Slot, H256,
    },
};

use crate::{
    deposit_event::Log,
    error::Error,
    eth1_block::{ExecutionBlock, HeaderInfo},
    reconstruct::{self, PayloadBodySource},
    transport::Transport,
};

const ENGINE_EXCHANGE_TRANSITION_CONFIGURATION_TIMEOUT: Duration = Duration::from_secs(1);
const ENGINE_GET_PAYLOAD_TIMEOUT: Duration = Duration::from_secs(1);
const ENGINE_GET_PAYLOAD_BODIES_TIMEOUT: Duration = Duration::from_secs(10);
const ETH_BLOCK_TIMEOUT: Duration = Duration::from_secs(1);
const ETH_CALL_TIMEOUT: Duration = Duration::from_secs(5);
const ETH_LOGS_TIMEOUT: Duration = Duration::from_secs(60);
const ETH_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

// `get_deposit_count()` selector of the deposit contract.
const GET_DEPOSIT_COUNT_CALL_DATA: &str = "0x621fd130";

/// Client for the Engine API and the parts of the Ethereum JSON-RPC API the bridge needs.
///
/// Holds no state between calls apart from metrics, so it may be shared freely between tasks.
pub struct Eth1Api {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    payload_bodies: Box<dyn PayloadBodySource>,
    metrics: Option<Arc<Metrics>>,
}

impl Eth1Api {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        transport: Arc<dyn Transport>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            config,
            transport,
            payload_bodies: reconstruct::payload_body_source(),
            metrics,
        }
    }

    #[must_use]
    pub fn with_payload_body_source(self, payload_bodies: Box<dyn PayloadBodySource>) -> Self {
        Self {
            payload_bodies,
            ..self
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub(crate) fn payload_body_source(&self) -> &dyn PayloadBodySource {
        self.payload_bodies.as_ref()
    }

    pub async fn current_head_number(&self) -> Result<ExecutionBlockNumber> {
        let Quantity(number) = self
            .execute("eth_blockNumber", json!([]), ETH_BLOCK_TIMEOUT)
            .await?;

        Ok(number)
    }

    pub async fn execution_block_by_hash(
        &self,
        block_hash: ExecutionBlockHash,
    ) -> Result<Option<ExecutionBlock>> {
        self.execute(
            "eth_getBlockByHash",
            json!([block_hash, false]),
            ETH_BLOCK_TIMEOUT,
        )
        .await
    }

    pub async fn execution_block_by_number(
        &self,
        block_number: ExecutionBlockNumber,
    ) -> Result<Option<ExecutionBlock>> {
        self.execute(
            "eth_getBlockByNumber",
            json!([quantity(block_number), false]),
            ETH_BLOCK_TIMEOUT,
        )
        .await
    }

    pub async fn latest_execution_block(&self) -> Result<ExecutionBlock> {
        let block = self
            .execute::<Option<ExecutionBlock>>(
                "eth_getBlockByNumber",
                json!(["latest", false]),
                ETH_BLOCK_TIMEOUT,
            )
            .await?;

        block.ok_or_else(|| {
            Error::InvalidResponse {
                message: "execution client returned no latest block".to_owned(),
            }
            .into()
        })
    }

    /// Fetches blocks in a single batch.
    ///
    /// Fails as a whole only if the batch itself fails.
    /// Each element reports the outcome for the corresponding hash.
    pub async fn execution_blocks_by_hashes(
        &self,
        block_hashes: &[ExecutionBlockHash],
    ) -> Result<Vec<Result<Option<ExecutionBlock>>>> {
        let params = block_hashes
            .iter()
            .map(|block_hash| json!([block_hash, false]))
            .collect();

        self.execute_batch("eth_getBlockByHash", params, ETH_BLOCK_TIMEOUT)
            .await
    }

    pub async fn header_by_hash(&self, block_hash: ExecutionBlockHash) -> Result<Option<HeaderInfo>> {
        Ok(self
            .execution_block_by_hash(block_hash)
            .await?
            .map(HeaderInfo::from))
    }

    pub async fn header_by_number(
        &self,
        block_number: ExecutionBlockNumber,
    ) -> Result<Option<HeaderInfo>> {
        Ok(self
            .execution_block_by_number(block_number)
            .await?
            .map(HeaderInfo::from))
    }

    /// Fetches transactions in their original encoding using one batched request.
    pub async fn raw_transactions_by_hashes(
        &self,
        transaction_hashes: &[H256],
    ) -> Result<Vec<Transaction>> {
        let params = transaction_hashes
            .iter()
            .map(|transaction_hash| json!([transaction_hash]))
            .collect();

        self.execute_batch::<Option<Transaction>>(
            "eth_getRawTransactionByHash",
            params,
            ETH_TRANSACTION_TIMEOUT,
        )
        .await?
        .into_iter()
        .zip(transaction_hashes.iter().copied())
        .map(|(result, transaction_hash)| -> Result<Transaction> {
            result?.ok_or_else(|| Error::MissingTransaction { transaction_hash }.into())
        })
        .collect()
    }

    /// Fetches all logs emitted by the deposit contract in `block_number_range`.
    ///
    /// Logs are not filtered by topic. Some testnets use contracts that emit other events.
    pub async fn get_logs(
        &self,
        block_number_range: RangeInclusive<ExecutionBlockNumber>,
    ) -> Result<Vec<Log>> {
        let filter = json!({
            "fromBlock": quantity(*block_number_range.start()),
            "toBlock": quantity(*block_number_range.end()),
            "address": self.config.deposit_contract_address,
        });

        self.execute("eth_getLogs", json!([filter]), ETH_LOGS_TIMEOUT)
            .await
    }

    /// Reads the number of deposits recorded by the deposit contract as of `block_number`.
    pub async fn deposit_count(&self, block_number: ExecutionBlockNumber) -> Result<DepositIndex> {
        let call = json!({
            "to": self.config.deposit_contract_address,
            "data": GET_DEPOSIT_COUNT_CALL_DATA,
        });

        let Bytes(output) = self
            .execute("eth_call", json!([call, quantity(block_number)]), ETH_CALL_TIMEOUT)
            .await?;

        // The result is ABI-encoded `bytes`: offset, length and 8 bytes of little-endian data.
        let count_bytes = output
            .get(64..72)
            .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
            .ok_or_else(|| Error::InvalidResponse {
                message: format!("get_deposit_count returned {} bytes", output.len()),
            })?;

        Ok(DepositIndex::from_le_bytes(count_bytes))
    }

    /// Calls [`engine_newPayloadV1`] or [`engine_newPayloadV2`] or [`engine_newPayloadV3`] or [`engine_newPayloadV4`] depending on `payload` and `params`.
    ///
    /// [`engine_newPayloadV1`]: https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#engine_newpayloadv1
    /// [`engine_newPayloadV2`]: https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/shanghai.md#engine_newpayloadv2
    /// [`engine_newPayloadV3`]: https://github.com/ethereum/execution-apis/blob/a0d03086564ab1838b462befbc083f873dcf0c0f/src/engine/cancun.md#engine_newpayloadv3
    /// [`engine_newPayloadV4`]: https://github.com/ethereum/execution-apis/blob/4140e528360fea53c34a766d86a000c6c039100e/src/engine/prague.md#engine_newpayloadv4
    pub async fn new_payload(
        &self,
        payload: ExecutionPayload,
        params: Option<ExecutionPayloadParams>,
    ) -> Result<PayloadStatusV1> {
        let timeout = self.config.engine_timeout;

        match (payload, params) {
            (ExecutionPayload::Bellatrix(payload), None) => {
                let payload_v1 = ExecutionPayloadV1::from(payload);
                self.execute("engine_newPayloadV1", json!([payload_v1]), timeout)
                    .await
            }
            (ExecutionPayload::Capella(payload), None) => {
                let payload_v2 = ExecutionPayloadV2::from(payload);
                self.execute("engine_newPayloadV2", json!([payload_v2]), timeout)
                    .await
            }
            (
                ExecutionPayload::Deneb(payload),
                Some(ExecutionPayloadParams::Deneb {
                    versioned_hashes,
                    parent_beacon_block_root,
                }),
            ) => {
                let payload_v3 = ExecutionPayloadV3::from(payload);
                let params = json!([payload_v3, versioned_hashes, parent_beacon_block_root]);
                self.execute("engine_newPayloadV3", params, timeout).await
            }
            (
                ExecutionPayload::Deneb(payload),
                Some(ExecutionPayloadParams::Electra {
                    versioned_hashes,
                    parent_beacon_block_root,
                    execution_requests,
                }),
            ) => {
                let payload_v3 = ExecutionPayloadV3::from(payload);
                let params = json!([
                    payload_v3,
                    versioned_hashes,
                    parent_beacon_block_root,
                    execution_requests,
                ]);
                self.execute("engine_newPayloadV4", params, timeout).await
            }
            (payload, params) => {
                let phase = match params {
                    Some(ExecutionPayloadParams::Electra { .. }) => Phase::Electra,
                    Some(ExecutionPayloadParams::Deneb { .. }) | None => payload.phase(),
                };

                Err(Error::UnsupportedPhase {
                    method: "engine_newPayload",
                    phase,
                }
                .into())
            }
        }
    }

    /// Calls [`engine_forkchoiceUpdatedV1`] or [`engine_forkchoiceUpdatedV2`] or [`engine_forkchoiceUpdatedV3`].
    ///
    /// The version is determined by the phase of `payload_attributes`.
    ///
    /// [`engine_forkchoiceUpdatedV1`]: https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#engine_forkchoiceupdatedv1
    /// [`engine_forkchoiceUpdatedV2`]: https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/shanghai.md#engine_forkchoiceupdatedv2
    /// [`engine_forkchoiceUpdatedV3`]: https://github.com/ethereum/execution-apis/blob/a0d03086564ab1838b462befbc083f873dcf0c0f/src/engine/cancun.md#engine_forkchoiceupdatedv3
    pub async fn forkchoice_updated(
        &self,
        fork_choice_state: ForkChoiceStateV1,
        payload_attributes: Either<Phase, PayloadAttributes>,
    ) -> Result<ForkChoiceUpdatedResponse> {
        let phase = payload_attributes
            .as_ref()
            .either(|phase| *phase, PayloadAttributes::phase);

        let method = match phase {
            Phase::Bellatrix => "engine_forkchoiceUpdatedV1",
            Phase::Capella => "engine_forkchoiceUpdatedV2",
            Phase::Deneb | Phase::Electra => "engine_forkchoiceUpdatedV3",
            Phase::Phase0 | Phase::Altair => {
                return Err(Error::UnsupportedPhase {
                    method: "engine_forkchoiceUpdated",
                    phase,
                }
                .into())
            }
        };

        let params = json!([fork_choice_state, payload_attributes.right()]);

        self.execute(method, params, self.config.engine_timeout)
            .await
    }

    /// Calls [`engine_getPayloadV1`] or [`engine_getPayloadV2`] or [`engine_getPayloadV3`] or [`engine_getPayloadV4`] depending on the phase at `slot`.
    ///
    /// [`engine_getPayloadV1`]: https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#engine_getpayloadv1
    /// [`engine_getPayloadV2`]: https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/shanghai.md#engine_getpayloadv2
    /// [`engine_getPayloadV3`]: https://github.com/ethereum/execution-apis/blob/a0d03086564ab1838b462befbc083f873dcf0c0f/src/engine/cancun.md#engine_getpayloadv3
    /// [`engine_getPayloadV4`]: https://github.com/ethereum/execution-apis/blob/4140e528360fea53c34a766d86a000c6c039100e/src/engine/prague.md#engine_getpayloadv4
    pub async fn get_payload(
        &self,
        payload_id: PayloadId,
        slot: Slot,
    ) -> Result<WithBlobsAndValue<ExecutionPayload>> {
        let params = json!([payload_id]);

        let payload = match self.config.phase_at_slot(slot) {
            Phase::Bellatrix => self
                .execute::<EngineGetPayloadV1Response>(
                    "engine_getPayloadV1",
                    params,
                    ENGINE_GET_PAYLOAD_TIMEOUT,
                )
                .await?
                .try_into()?,
            Phase::Capella => self
                .execute::<EngineGetPayloadV2Response>(
                    "engine_getPayloadV2",
                    params,
                    ENGINE_GET_PAYLOAD_TIMEOUT,
                )
                .await?
                .try_into()?,
            Phase::Deneb => self
                .execute::<EngineGetPayloadV3Response>(
                    "engine_getPayloadV3",
                    params,
                    ENGINE_GET_PAYLOAD_TIMEOUT,
                )
                .await?
                .try_into()?,
            Phase::Electra => self
                .execute::<EngineGetPayloadV4Response>(
                    "engine_getPayloadV4",
                    params,
                    ENGINE_GET_PAYLOAD_TIMEOUT,
                )
                .await?
                .try_into()?,
            phase @ (Phase::Phase0 | Phase::Altair) => {
                return Err(Error::UnsupportedPhase {
                    method: "engine_getPayload",
                    phase,
                }
                .into())
            }
        };

        Ok(payload)
    }

    /// Calls [`engine_getPayloadBodiesByHashV1`].
    ///
    /// Bodies the execution client does not have are returned as empty bodies.
    ///
    /// [`engine_getPayloadBodiesByHashV1`]: https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/shanghai.md#engine_getpayloadbodiesbyhashv1
    pub async fn get_payload_bodies_by_hash(
        &self,
        block_hashes: &[ExecutionBlockHash],
    ) -> Result<Vec<ExecutionPayloadBody>> {
        let bodies = self
            .execute::<Vec<Option<ExecutionPayloadBodyV1>>>(
                "engine_getPayloadBodiesByHashV1",
                json!([block_hashes]),
                ENGINE_GET_PAYLOAD_BODIES_TIMEOUT,
            )
            .await?;

        Ok(normalize_bodies(bodies))
    }

    /// Calls [`engine_getPayloadBodiesByRangeV1`].
    ///
    /// Bodies the execution client does not have are returned as empty bodies.
    ///
    /// [`engine_getPayloadBodiesByRangeV1`]: https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/shanghai.md#engine_getpayloadbodiesbyrangev1
    pub async fn get_payload_bodies_by_range(
        &self,
        start: ExecutionBlockNumber,
        count: u64,
    ) -> Result<Vec<ExecutionPayloadBody>> {
        let bodies = self
            .execute::<Vec<Option<ExecutionPayloadBodyV1>>>(
                "engine_getPayloadBodiesByRangeV1",
                json!([quantity(start), quantity(count)]),
                ENGINE_GET_PAYLOAD_BODIES_TIMEOUT,
            )
            .await?;

        Ok(normalize_bodies(bodies))
    }

    /// Calls [`engine_exchangeTransitionConfigurationV1`] and compares the result with the local
    /// configuration.
    ///
    /// [`engine_exchangeTransitionConfigurationV1`]: https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#engine_exchangetransitionconfigurationv1
    pub async fn exchange_transition_configuration(&self) -> Result<()> {
        let local = TransitionConfigurationV1 {
            terminal_total_difficulty: self.config.terminal_total_difficulty,
            terminal_block_hash: self.config.terminal_block_hash,
            terminal_block_number: 0,
        };

        let remote = self
            .execute::<TransitionConfigurationV1>(
                "engine_exchangeTransitionConfigurationV1",
                json!([local]),
                ENGINE_EXCHANGE_TRANSITION_CONFIGURATION_TIMEOUT,
            )
            .await?;

        ensure!(
            remote.terminal_total_difficulty == local.terminal_total_difficulty
                && remote.terminal_block_hash == local.terminal_block_hash,
            Error::ConfigurationMismatch { local, remote },
        );

        Ok(())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
        timeout: Duration,
    ) -> Result<T> {
        let timer = self.metrics.as_ref().and_then(|metrics| {
            prometheus_metrics::start_timer_vec(&metrics.eth1_api_request_times, method)
        });

        match self.transport.request(method, params, timeout).await {
            Ok(result) => {
                prometheus_metrics::stop_and_record(timer);
                decode(result)
            }
            Err(error) => {
                prometheus_metrics::stop_and_discard(timer);
                self.observe_error(method);
                Err(error.into())
            }
        }
    }

    async fn execute_batch<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<Vec<Result<T>>> {
        let timer = self.metrics.as_ref().and_then(|metrics| {
            prometheus_metrics::start_timer_vec(&metrics.eth1_api_request_times, method)
        });

        match self.transport.batch_request(method, params, timeout).await {
            Ok(results) => {
                prometheus_metrics::stop_and_record(timer);

                Ok(results
                    .into_iter()
                    .map(|result| match result {
                        Ok(value) => decode(value),
                        Err(error) => {
                            self.observe_error(method);
                            Err(error.into())
                        }
                    })
                    .collect())
            }
            Err(error) => {
                prometheus_metrics::stop_and_discard(timer);
                self.observe_error(method);
                Err(error.into())
            }
        }
    }

    fn observe_error(&self, method: &str) {
        if let Some(metrics) = self.metrics.as_ref() {
            metrics.observe_eth1_api_error(method);
        }
    }
}

#[async_trait]
impl ExecutionEngine for Eth1Api {
    async fn notify_new_payload(
        &self,
        payload: ExecutionPayload,
        params: Option<ExecutionPayloadParams>,
    ) -> Result<Option<ExecutionBlockHash>> {
        let status = self.new_payload(payload, params).await?;
        Ok(new_payload_result(status)?)
    }

    async fn notify_forkchoice_updated(
        &self,
        fork_choice_state: ForkChoiceStateV1,
        payload_attributes: Either<Phase, PayloadAttributes>,
    ) -> Result<(Option<PayloadId>, Option<ExecutionBlockHash>)> {
        let response = self
            .forkchoice_updated(fork_choice_state, payload_attributes)
            .await?;

        Ok(forkchoice_updated_result(response)?)
    }

    async fn get_payload(
        &self,
        payload_id: PayloadId,
        slot: Slot,
    ) -> Result<WithBlobsAndValue<ExecutionPayload>> {
        self.get_payload(payload_id, slot).await
    }
}

fn new_payload_result(status: PayloadStatusV1) -> Result<Option<ExecutionBlockHash>, Error> {
    let PayloadStatusV1 {
        status,
        latest_valid_hash,
        validation_error,
    } = status;

    if let Some(validation_error) = validation_error.filter(|error| !error.is_empty()) {
        warn!("execution client reported payload status {status:?}: {validation_error}");
    }

    match status {
        PayloadValidationStatus::Valid => Ok(latest_valid_hash),
        PayloadValidationStatus::Invalid => Err(Error::InvalidPayloadStatus { latest_valid_hash }),
        PayloadValidationStatus::InvalidBlockHash => Err(Error::InvalidBlockHashPayloadStatus),
        PayloadValidationStatus::Syncing | PayloadValidationStatus::Accepted => {
            Err(Error::AcceptedSyncingPayloadStatus)
        }
        PayloadValidationStatus::Unknown => Err(Error::UnknownPayloadStatus),
    }
}

fn forkchoice_updated_result(
    response: ForkChoiceUpdatedResponse,
) -> Result<(Option<PayloadId>, Option<ExecutionBlockHash>), Error> {
    let ForkChoiceUpdatedResponse {
        payload_status,
        payload_id,
    } = response;

    let PayloadStatusV1 {
        status,
        latest_valid_hash,
        validation_error,
    } = payload_status.ok_or(Error::NilPayloadStatus)?;

    if let Some(validation_error) = validation_error.filter(|error| !error.is_empty()) {
        warn!("execution client reported fork choice status {status:?}: {validation_error}");
    }

    match status {
        PayloadValidationStatus::Valid => Ok((payload_id, latest_valid_hash)),
        PayloadValidationStatus::Invalid => Err(Error::InvalidPayloadStatus { latest_valid_hash }),
        PayloadValidationStatus::Syncing => Err(Error::AcceptedSyncingPayloadStatus),
        PayloadValidationStatus::Accepted
        | PayloadValidationStatus::InvalidBlockHash
        | PayloadValidationStatus::Unknown => Err(Error::UnknownPayloadStatus),
    }
}

fn normalize_bodies(bodies: Vec<Option<ExecutionPayloadBodyV1>>) -> Vec<ExecutionPayloadBody> {
    bodies
        .into_iter()
        .map(|body| body.map(Into::into).unwrap_or_default())
        .collect()
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|error| {
        Error::InvalidResponse {
            message: error.to_string(),
        }
        .into()
    })
}

fn quantity(number: u64) -> String {
    format!("{number:#x}")
}

#[derive(Deserialize)]
#[serde(transparent)]
struct Quantity(#[serde(with = "serde_utils::prefixed_hex_quantity")] u64);

#[derive(Deserialize)]
#[serde(transparent)]
struct Bytes(#[serde(with = "serde_utils::prefixed_hex_bytes")] Vec<u8>);
