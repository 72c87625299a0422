use ethereum_types::H64;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use thiserror::Error;
use types::{
    bellatrix::{
        consts::{MAX_EXTRA_DATA_BYTES, MAX_TRANSACTIONS_PER_PAYLOAD},
        containers::ExecutionPayload as BellatrixExecutionPayload,
        primitives::{Difficulty, ExtraData, Gas, Transaction, Wei},
    },
    capella::{
        consts::MAX_WITHDRAWALS_PER_PAYLOAD,
        containers::{ExecutionPayload as CapellaExecutionPayload, Withdrawal},
    },
    combined::ExecutionPayload,
    deneb::{
        containers::{BlobsBundle, ExecutionPayload as DenebExecutionPayload},
        primitives::{Blob, KzgCommitment, KzgProof},
    },
    nonstandard::{ExecutionPayloadBody, ExecutionRequest, Phase, WithBlobsAndValue},
    phase0::primitives::{
        Bloom, ExecutionAddress, ExecutionBlockHash, ExecutionBlockNumber, Gwei, UnixSeconds,
        ValidatorIndex, H256,
    },
};

pub type PayloadId = H64;

/// [`ExecutionPayloadV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#executionpayloadv1)
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadV1 {
    pub parent_hash: ExecutionBlockHash,
    pub fee_recipient: ExecutionAddress,
    pub state_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bloom,
    pub prev_randao: H256,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub block_number: ExecutionBlockNumber,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub gas_limit: Gas,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub gas_used: Gas,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub timestamp: UnixSeconds,
    pub extra_data: ExtraData,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub base_fee_per_gas: Wei,
    pub block_hash: ExecutionBlockHash,
    pub transactions: Vec<Transaction>,
}

impl From<BellatrixExecutionPayload> for ExecutionPayloadV1 {
    fn from(payload: BellatrixExecutionPayload) -> Self {
        let BellatrixExecutionPayload {
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
            extra_data,
            base_fee_per_gas,
            block_hash,
            transactions,
        } = payload;

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
            extra_data,
            base_fee_per_gas,
            block_hash,
            transactions,
        }
    }
}

impl TryFrom<ExecutionPayloadV1> for BellatrixExecutionPayload {
    type Error = Error;

    fn try_from(payload: ExecutionPayloadV1) -> Result<Self, Self::Error> {
        let ExecutionPayloadV1 {
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
            extra_data,
            base_fee_per_gas,
            block_hash,
            transactions,
        } = payload;

        validate_common_limits(&extra_data, &transactions)?;

        Ok(Self {
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
            extra_data,
            base_fee_per_gas,
            block_hash,
            transactions,
        })
    }
}

/// [`ExecutionPayloadV2`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/shanghai.md#executionpayloadv2)
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadV2 {
    pub parent_hash: ExecutionBlockHash,
    pub fee_recipient: ExecutionAddress,
    pub state_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bloom,
    pub prev_randao: H256,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub block_number: ExecutionBlockNumber,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub gas_limit: Gas,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub gas_used: Gas,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub timestamp: UnixSeconds,
    pub extra_data: ExtraData,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub base_fee_per_gas: Wei,
    pub block_hash: ExecutionBlockHash,
    pub transactions: Vec<Transaction>,
    pub withdrawals: Vec<WithdrawalV1>,
}

impl From<CapellaExecutionPayload> for ExecutionPayloadV2 {
    fn from(payload: CapellaExecutionPayload) -> Self {
        let CapellaExecutionPayload {
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
            extra_data,
            base_fee_per_gas,
            block_hash,
            transactions,
            withdrawals,
        } = payload;

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
            extra_data,
            base_fee_per_gas,
            block_hash,
            transactions,
            withdrawals: withdrawals.into_iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<ExecutionPayloadV2> for CapellaExecutionPayload {
    type Error = Error;

    fn try_from(payload: ExecutionPayloadV2) -> Result<Self, Self::Error> {
        let ExecutionPayloadV2 {
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
            extra_data,
            base_fee_per_gas,
            block_hash,
            transactions,
            withdrawals,
        } = payload;

        validate_common_limits(&extra_data, &transactions)?;

        Ok(Self {
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
            extra_data,
            base_fee_per_gas,
            block_hash,
            transactions,
            withdrawals: convert_withdrawals(withdrawals)?,
        })
    }
}

/// [`ExecutionPayloadV3`](https://github.com/ethereum/execution-apis/blob/fe8e13c288c592ec154ce25c534e26cb7ce0530d/src/engine/cancun.md#executionpayloadv3)
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadV3 {
    pub parent_hash: ExecutionBlockHash,
    pub fee_recipient: ExecutionAddress,
    pub state_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bloom,
    pub prev_randao: H256,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub block_number: ExecutionBlockNumber,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub gas_limit: Gas,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub gas_used: Gas,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub timestamp: UnixSeconds,
    pub extra_data: ExtraData,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub base_fee_per_gas: Wei,
    pub block_hash: ExecutionBlockHash,
    pub transactions: Vec<Transaction>,
    pub withdrawals: Vec<WithdrawalV1>,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub blob_gas_used: Gas,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub excess_blob_gas: Gas,
}

impl From<DenebExecutionPayload> for ExecutionPayloadV3 {
    fn from(payload: DenebExecutionPayload) -> Self {
        let DenebExecutionPayload {
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
            extra_data,
            base_fee_per_gas,
            block_hash,
            transactions,
            withdrawals,
            blob_gas_used,
            excess_blob_gas,
        } = payload;

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
            extra_data,
            base_fee_per_gas,
            block_hash,
            transactions,
            withdrawals: withdrawals.into_iter().map(Into::into).collect(),
            blob_gas_used,
            excess_blob_gas,
        }
    }
}

impl TryFrom<ExecutionPayloadV3> for DenebExecutionPayload {
    type Error = Error;

    fn try_from(payload: ExecutionPayloadV3) -> Result<Self, Self::Error> {
        let ExecutionPayloadV3 {
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
            extra_data,
            base_fee_per_gas,
            block_hash,
            transactions,
            withdrawals,
            blob_gas_used,
            excess_blob_gas,
        } = payload;

        validate_common_limits(&extra_data, &transactions)?;

        Ok(Self {
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
            extra_data,
            base_fee_per_gas,
            block_hash,
            transactions,
            withdrawals: convert_withdrawals(withdrawals)?,
            blob_gas_used,
            excess_blob_gas,
        })
    }
}

/// [`WithdrawalV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/shanghai.md#withdrawalv1)
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalV1 {
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub index: u64,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub validator_index: ValidatorIndex,
    pub address: ExecutionAddress,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub amount: Gwei,
}

impl From<Withdrawal> for WithdrawalV1 {
    fn from(withdrawal: Withdrawal) -> Self {
        let Withdrawal {
            index,
            validator_index,
            address,
            amount,
        } = withdrawal;

        Self {
            index,
            validator_index,
            address,
            amount,
        }
    }
}

impl From<WithdrawalV1> for Withdrawal {
    fn from(withdrawal: WithdrawalV1) -> Self {
        let WithdrawalV1 {
            index,
            validator_index,
            address,
            amount,
        } = withdrawal;

        Self {
            index,
            validator_index,
            address,
            amount,
        }
    }
}

/// [`BlobsBundleV1`](https://github.com/ethereum/execution-apis/blob/fe8e13c288c592ec154ce25c534e26cb7ce0530d/src/engine/cancun.md#blobsbundlev1)
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobsBundleV1 {
    pub commitments: Vec<KzgCommitment>,
    pub proofs: Vec<KzgProof>,
    pub blobs: Vec<Blob>,
}

impl TryFrom<BlobsBundleV1> for BlobsBundle {
    type Error = Error;

    fn try_from(bundle: BlobsBundleV1) -> Result<Self, Self::Error> {
        let BlobsBundleV1 {
            commitments,
            proofs,
            blobs,
        } = bundle;

        if commitments.len() != proofs.len() || commitments.len() != blobs.len() {
            return Err(Error::BlobsBundleLengthMismatch {
                commitments: commitments.len(),
                proofs: proofs.len(),
                blobs: blobs.len(),
            });
        }

        Ok(Self {
            commitments,
            proofs,
            blobs,
        })
    }
}

/// [`ForkChoiceStateV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#forkchoicestatev1)
#[expect(clippy::struct_field_names)]
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkChoiceStateV1 {
    pub head_block_hash: ExecutionBlockHash,
    pub safe_block_hash: ExecutionBlockHash,
    pub finalized_block_hash: ExecutionBlockHash,
}

/// [`PayloadAttributesV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#payloadattributesv1)
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadAttributesV1 {
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub timestamp: UnixSeconds,
    pub prev_randao: H256,
    pub suggested_fee_recipient: ExecutionAddress,
}

/// [`PayloadAttributesV2`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/shanghai.md#payloadattributesv2)
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadAttributesV2 {
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub timestamp: UnixSeconds,
    pub prev_randao: H256,
    pub suggested_fee_recipient: ExecutionAddress,
    pub withdrawals: Vec<WithdrawalV1>,
}

/// [`PayloadAttributesV3`](https://github.com/ethereum/execution-apis/blob/fe8e13c288c592ec154ce25c534e26cb7ce0530d/src/engine/cancun.md#payloadattributesv3)
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadAttributesV3 {
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub timestamp: UnixSeconds,
    pub prev_randao: H256,
    pub suggested_fee_recipient: ExecutionAddress,
    pub withdrawals: Vec<WithdrawalV1>,
    pub parent_beacon_block_root: H256,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(untagged)]
pub enum PayloadAttributes {
    Bellatrix(PayloadAttributesV1),
    Capella(PayloadAttributesV2),
    Deneb(PayloadAttributesV3),
    Electra(PayloadAttributesV3),
}

impl PayloadAttributes {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Bellatrix(_) => Phase::Bellatrix,
            Self::Capella(_) => Phase::Capella,
            Self::Deneb(_) => Phase::Deneb,
            Self::Electra(_) => Phase::Electra,
        }
    }
}

/// [`engine_getPayloadV1` response](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#response-2).
pub type EngineGetPayloadV1Response = ExecutionPayloadV1;

impl TryFrom<EngineGetPayloadV1Response> for WithBlobsAndValue<ExecutionPayload> {
    type Error = Error;

    fn try_from(response: EngineGetPayloadV1Response) -> Result<Self, Self::Error> {
        let payload = ExecutionPayload::Bellatrix(response.try_into()?);
        Ok(without_blobs(payload, Wei::zero(), false))
    }
}

/// [`engine_getPayloadV2` response] specialized for Capella.
///
/// [`engine_getPayloadV2` response]: https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/shanghai.md#response-2
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineGetPayloadV2Response {
    pub execution_payload: ExecutionPayloadV2,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub block_value: Wei,
}

impl TryFrom<EngineGetPayloadV2Response> for WithBlobsAndValue<ExecutionPayload> {
    type Error = Error;

    fn try_from(response: EngineGetPayloadV2Response) -> Result<Self, Self::Error> {
        let EngineGetPayloadV2Response {
            execution_payload,
            block_value,
        } = response;

        let payload = ExecutionPayload::Capella(execution_payload.try_into()?);

        Ok(without_blobs(payload, block_value, false))
    }
}

/// [`engine_getPayloadV3` response](https://github.com/ethereum/execution-apis/blob/fe8e13c288c592ec154ce25c534e26cb7ce0530d/src/engine/cancun.md#response-2)
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineGetPayloadV3Response {
    pub execution_payload: ExecutionPayloadV3,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub block_value: Wei,
    pub blobs_bundle: BlobsBundleV1,
    pub should_override_builder: bool,
}

impl TryFrom<EngineGetPayloadV3Response> for WithBlobsAndValue<ExecutionPayload> {
    type Error = Error;

    fn try_from(response: EngineGetPayloadV3Response) -> Result<Self, Self::Error> {
        let EngineGetPayloadV3Response {
            execution_payload,
            block_value,
            blobs_bundle,
            should_override_builder,
        } = response;

        Ok(Self {
            value: ExecutionPayload::Deneb(execution_payload.try_into()?),
            blobs_bundle: Some(blobs_bundle.try_into()?),
            execution_requests: None,
            block_value,
            should_override_builder,
        })
    }
}

/// [`engine_getPayloadV4` response](https://github.com/ethereum/execution-apis/blob/4140e528360fea53c34a766d86a000c6c039100e/src/engine/prague.md#response-1)
///
/// The payload itself is unchanged since Deneb.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineGetPayloadV4Response {
    pub execution_payload: ExecutionPayloadV3,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub block_value: Wei,
    pub blobs_bundle: BlobsBundleV1,
    pub should_override_builder: bool,
    #[serde(deserialize_with = "deserialize_execution_requests")]
    pub execution_requests: Vec<ExecutionRequest>,
}

impl TryFrom<EngineGetPayloadV4Response> for WithBlobsAndValue<ExecutionPayload> {
    type Error = Error;

    fn try_from(response: EngineGetPayloadV4Response) -> Result<Self, Self::Error> {
        let EngineGetPayloadV4Response {
            execution_payload,
            block_value,
            blobs_bundle,
            should_override_builder,
            execution_requests,
        } = response;

        Ok(Self {
            value: ExecutionPayload::Deneb(execution_payload.try_into()?),
            blobs_bundle: Some(blobs_bundle.try_into()?),
            execution_requests: Some(execution_requests),
            block_value,
            should_override_builder,
        })
    }
}

/// [`PayloadStatusV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#payloadstatusv1)
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(Serialize))]
pub struct PayloadStatusV1 {
    pub status: PayloadValidationStatus,
    pub latest_valid_hash: Option<ExecutionBlockHash>,
    pub validation_error: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(test, derive(Serialize))]
pub enum PayloadValidationStatus {
    Valid,
    Invalid,
    Syncing,
    Accepted,
    InvalidBlockHash,
    // Any status not defined by the Engine API. Callers report it as an error.
    #[serde(other)]
    Unknown,
}

impl PayloadValidationStatus {
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub const fn is_invalid(self) -> bool {
        matches!(self, Self::Invalid | Self::InvalidBlockHash)
    }

    #[must_use]
    pub const fn is_syncing(self) -> bool {
        matches!(self, Self::Syncing | Self::Accepted)
    }
}

/// [`engine_forkchoiceUpdated` response](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#response-1)
///
/// `payload_status` is optional here so that a response without one can be reported precisely.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkChoiceUpdatedResponse {
    #[serde(default)]
    pub payload_status: Option<PayloadStatusV1>,
    pub payload_id: Option<PayloadId>,
}

/// [`TransitionConfigurationV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#transitionconfigurationv1)
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionConfigurationV1 {
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub terminal_total_difficulty: Difficulty,
    pub terminal_block_hash: ExecutionBlockHash,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub terminal_block_number: ExecutionBlockNumber,
}

/// [`ExecutionPayloadBodyV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/shanghai.md#executionpayloadbodyv1)
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadBodyV1 {
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub withdrawals: Option<Vec<WithdrawalV1>>,
}

impl From<ExecutionPayloadBodyV1> for ExecutionPayloadBody {
    fn from(body: ExecutionPayloadBodyV1) -> Self {
        let ExecutionPayloadBodyV1 {
            transactions,
            withdrawals,
        } = body;

        Self {
            transactions,
            withdrawals: withdrawals
                .map(|withdrawals| withdrawals.into_iter().map(Into::into).collect()),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{field} has {length} elements, more than the limit of {limit}")]
    LimitExceeded {
        field: &'static str,
        length: usize,
        limit: usize,
    },
    #[error(
        "blobs bundle lengths differ \
         (commitments: {commitments}, proofs: {proofs}, blobs: {blobs})"
    )]
    BlobsBundleLengthMismatch {
        commitments: usize,
        proofs: usize,
        blobs: usize,
    },
}

fn ensure_within_limit(field: &'static str, length: usize, limit: usize) -> Result<(), Error> {
    if length > limit {
        return Err(Error::LimitExceeded {
            field,
            length,
            limit,
        });
    }

    Ok(())
}

fn validate_common_limits(extra_data: &ExtraData, transactions: &[Transaction]) -> Result<(), Error> {
    ensure_within_limit("extra_data", extra_data.0.len(), MAX_EXTRA_DATA_BYTES)?;
    ensure_within_limit(
        "transactions",
        transactions.len(),
        MAX_TRANSACTIONS_PER_PAYLOAD,
    )
}

fn convert_withdrawals(withdrawals: Vec<WithdrawalV1>) -> Result<Vec<Withdrawal>, Error> {
    ensure_within_limit(
        "withdrawals",
        withdrawals.len(),
        MAX_WITHDRAWALS_PER_PAYLOAD,
    )?;

    Ok(withdrawals.into_iter().map(Into::into).collect())
}

fn without_blobs(
    value: ExecutionPayload,
    block_value: Wei,
    should_override_builder: bool,
) -> WithBlobsAndValue<ExecutionPayload> {
    WithBlobsAndValue {
        value,
        blobs_bundle: None,
        execution_requests: None,
        block_value,
        should_override_builder,
    }
}

// Execution requests are prefixed with their type.
// Each type may appear at most once and must be omitted if it has no requests.
fn deserialize_execution_requests<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<ExecutionRequest>, D::Error> {
    let requests = Vec::<ExecutionRequest>::deserialize(deserializer)?;
    let mut previous_type = None;

    for ExecutionRequest(bytes) in &requests {
        let Some((request_type, data)) = bytes.split_first() else {
            return Err(D::Error::custom("execution request has no type prefix"));
        };

        if data.is_empty() {
            return Err(D::Error::custom(format_args!(
                "execution requests of type {request_type} are empty \
                 and should have been excluded from the response",
            )));
        }

        if previous_type.is_some_and(|previous| previous >= *request_type) {
            return Err(D::Error::custom(
                "execution request types are not unique and in ascending order",
            ));
        }

        previous_type = Some(*request_type);
    }

    Ok(requests)
}
