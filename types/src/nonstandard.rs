use enum_iterator::Sequence;
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::{
    bellatrix::primitives::{Transaction, Wei},
    capella::containers::Withdrawal,
    deneb::containers::BlobsBundle,
};

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Display,
    FromStr,
    Sequence,
    Deserialize,
    Serialize,
)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Phase0,
    Altair,
    Bellatrix,
    Capella,
    Deneb,
    Electra,
}

/// Transactions and withdrawals of an execution block without its header.
///
/// `withdrawals` is `None` for blocks produced before Capella.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct ExecutionPayloadBody {
    pub transactions: Vec<Transaction>,
    pub withdrawals: Option<Vec<Withdrawal>>,
}

/// Execution layer request list item as passed to `engine_newPayloadV4`.
///
/// The first byte is the request type.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ExecutionRequest(#[serde(with = "serde_utils::prefixed_hex_bytes")] pub Vec<u8>);

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WithBlobsAndValue<T> {
    pub value: T,
    pub blobs_bundle: Option<BlobsBundle>,
    pub execution_requests: Option<Vec<ExecutionRequest>>,
    pub block_value: Wei,
    pub should_override_builder: bool,
}
