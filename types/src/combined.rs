use anyhow::{bail, Result};
use hashing::SszHash;
use thiserror::Error;

use crate::{
    bellatrix::containers::{
        ExecutionPayload as BellatrixExecutionPayload,
        ExecutionPayloadHeader as BellatrixExecutionPayloadHeader,
    },
    capella::containers::{
        ExecutionPayload as CapellaExecutionPayload,
        ExecutionPayloadHeader as CapellaExecutionPayloadHeader,
    },
    deneb::{
        containers::{
            ExecutionPayload as DenebExecutionPayload,
            ExecutionPayloadHeader as DenebExecutionPayloadHeader,
        },
        primitives::VersionedHash,
    },
    nonstandard::{ExecutionPayloadBody, ExecutionRequest, Phase},
    phase0::{
        containers::Eth1Data,
        primitives::{
            ExecutionBlockHash, ExecutionBlockNumber, SignatureBytes, Slot, UnixSeconds,
            ValidatorIndex, H256,
        },
    },
};

/// Execution payload of any fork since Bellatrix.
///
/// Electra did not change the payload, so Electra blocks carry the `Deneb` variant.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ExecutionPayload {
    Bellatrix(BellatrixExecutionPayload),
    Capella(CapellaExecutionPayload),
    Deneb(DenebExecutionPayload),
}

impl SszHash for ExecutionPayload {
    fn hash_tree_root(&self) -> H256 {
        match self {
            Self::Bellatrix(payload) => payload.hash_tree_root(),
            Self::Capella(payload) => payload.hash_tree_root(),
            Self::Deneb(payload) => payload.hash_tree_root(),
        }
    }
}

impl ExecutionPayload {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Bellatrix(_) => Phase::Bellatrix,
            Self::Capella(_) => Phase::Capella,
            Self::Deneb(_) => Phase::Deneb,
        }
    }

    #[must_use]
    pub const fn block_hash(&self) -> ExecutionBlockHash {
        match self {
            Self::Bellatrix(payload) => payload.block_hash,
            Self::Capella(payload) => payload.block_hash,
            Self::Deneb(payload) => payload.block_hash,
        }
    }

    #[must_use]
    pub const fn block_number(&self) -> ExecutionBlockNumber {
        match self {
            Self::Bellatrix(payload) => payload.block_number,
            Self::Capella(payload) => payload.block_number,
            Self::Deneb(payload) => payload.block_number,
        }
    }

    #[must_use]
    pub fn to_header(&self) -> ExecutionPayloadHeader {
        match self {
            Self::Bellatrix(payload) => ExecutionPayloadHeader::Bellatrix(payload.into()),
            Self::Capella(payload) => ExecutionPayloadHeader::Capella(payload.into()),
            Self::Deneb(payload) => ExecutionPayloadHeader::Deneb(payload.into()),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ExecutionPayloadHeader {
    Bellatrix(BellatrixExecutionPayloadHeader),
    Capella(CapellaExecutionPayloadHeader),
    Deneb(DenebExecutionPayloadHeader),
}

impl SszHash for ExecutionPayloadHeader {
    fn hash_tree_root(&self) -> H256 {
        match self {
            Self::Bellatrix(header) => header.hash_tree_root(),
            Self::Capella(header) => header.hash_tree_root(),
            Self::Deneb(header) => header.hash_tree_root(),
        }
    }
}

impl ExecutionPayloadHeader {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Bellatrix(_) => Phase::Bellatrix,
            Self::Capella(_) => Phase::Capella,
            Self::Deneb(_) => Phase::Deneb,
        }
    }

    #[must_use]
    pub const fn block_hash(&self) -> ExecutionBlockHash {
        match self {
            Self::Bellatrix(header) => header.block_hash,
            Self::Capella(header) => header.block_hash,
            Self::Deneb(header) => header.block_hash,
        }
    }

    #[must_use]
    pub const fn block_number(&self) -> ExecutionBlockNumber {
        match self {
            Self::Bellatrix(header) => header.block_number,
            Self::Capella(header) => header.block_number,
            Self::Deneb(header) => header.block_number,
        }
    }

    #[must_use]
    pub const fn timestamp(&self) -> UnixSeconds {
        match self {
            Self::Bellatrix(header) => header.timestamp,
            Self::Capella(header) => header.timestamp,
            Self::Deneb(header) => header.timestamp,
        }
    }

    /// Combines the header with a body retrieved from the execution layer.
    ///
    /// The result is not checked against the header.
    /// Callers must compare [`ExecutionPayload::to_header`] with `self` to detect a wrong body.
    pub fn with_body(&self, body: ExecutionPayloadBody) -> Result<ExecutionPayload> {
        let ExecutionPayloadBody {
            transactions,
            withdrawals,
        } = body;

        let payload = match (self, withdrawals) {
            (Self::Bellatrix(header), None) => {
                ExecutionPayload::Bellatrix(header.with_transactions(transactions))
            }
            (Self::Capella(header), Some(withdrawals)) => {
                ExecutionPayload::Capella(header.with_body(transactions, withdrawals))
            }
            (Self::Deneb(header), Some(withdrawals)) => {
                ExecutionPayload::Deneb(header.with_body(transactions, withdrawals))
            }
            (Self::Bellatrix(_), Some(_)) => bail!(Error::UnexpectedWithdrawals),
            (Self::Capella(_) | Self::Deneb(_), None) => bail!(Error::MissingWithdrawals {
                phase: self.phase(),
            }),
        };

        Ok(payload)
    }
}

/// Fork-specific parameters of `engine_newPayload` that are not part of the payload.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ExecutionPayloadParams {
    Deneb {
        versioned_hashes: Vec<VersionedHash>,
        parent_beacon_block_root: H256,
    },
    Electra {
        versioned_hashes: Vec<VersionedHash>,
        parent_beacon_block_root: H256,
        execution_requests: Vec<ExecutionRequest>,
    },
}

// Beacon blocks are reduced to the fields this workspace reads.
// Operations and sync aggregates are handled by the consensus side and are not represented here.

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BeaconBlockBody {
    pub randao_reveal: SignatureBytes,
    pub eth1_data: Eth1Data,
    pub graffiti: H256,
    pub execution_payload: ExecutionPayload,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BlindedBeaconBlockBody {
    pub randao_reveal: SignatureBytes,
    pub eth1_data: Eth1Data,
    pub graffiti: H256,
    pub execution_payload_header: ExecutionPayloadHeader,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body: BeaconBlockBody,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BlindedBeaconBlock {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body: BlindedBeaconBlockBody,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: SignatureBytes,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignedBlindedBeaconBlock {
    pub message: BlindedBeaconBlock,
    pub signature: SignatureBytes,
}

impl SignedBlindedBeaconBlock {
    #[must_use]
    pub const fn execution_payload_header(&self) -> &ExecutionPayloadHeader {
        &self.message.body.execution_payload_header
    }

    #[must_use]
    pub fn with_execution_payload(self, execution_payload: ExecutionPayload) -> SignedBeaconBlock {
        let Self { message, signature } = self;

        let BlindedBeaconBlock {
            slot,
            proposer_index,
            parent_root,
            state_root,
            body,
        } = message;

        let BlindedBeaconBlockBody {
            randao_reveal,
            eth1_data,
            graffiti,
            execution_payload_header: _,
        } = body;

        SignedBeaconBlock {
            message: BeaconBlock {
                slot,
                proposer_index,
                parent_root,
                state_root,
                body: BeaconBlockBody {
                    randao_reveal,
                    eth1_data,
                    graffiti,
                    execution_payload,
                },
            },
            signature,
        }
    }
}

/// A block as received from peers or the builder, before or after unblinding.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SignedBlock {
    Full(Box<SignedBeaconBlock>),
    Blinded(Box<SignedBlindedBeaconBlock>),
}

impl SignedBlock {
    #[must_use]
    pub const fn slot(&self) -> Slot {
        match self {
            Self::Full(block) => block.message.slot,
            Self::Blinded(block) => block.message.slot,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("execution payload body for {phase} block has no withdrawals")]
    MissingWithdrawals { phase: Phase },
    #[error("execution payload body for Bellatrix block has withdrawals")]
    UnexpectedWithdrawals,
}
