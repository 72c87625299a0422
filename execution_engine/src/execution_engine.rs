#![expect(clippy::module_name_repetitions)]

use std::{collections::HashMap, sync::Arc};

use anyhow::{ensure, Result};
use async_trait::async_trait;
use either::Either;
use parking_lot::Mutex;
use thiserror::Error;
use types::{
    combined::{ExecutionPayload, ExecutionPayloadParams},
    nonstandard::{Phase, WithBlobsAndValue},
    phase0::primitives::{ExecutionBlockHash, Slot},
};

use crate::types::{ForkChoiceStateV1, PayloadAttributes, PayloadId};

#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// [`notify_new_payload`](https://github.com/ethereum/consensus-specs/blob/1bfefe301da592375e2e02f65849a96aadec1936/specs/bellatrix/beacon-chain.md#notify_new_payload)
    ///
    /// Returns the latest valid hash reported by the execution client.
    async fn notify_new_payload(
        &self,
        payload: ExecutionPayload,
        params: Option<ExecutionPayloadParams>,
    ) -> Result<Option<ExecutionBlockHash>>;

    /// [`notify_forkchoice_updated`](https://github.com/ethereum/consensus-specs/blob/1bfefe301da592375e2e02f65849a96aadec1936/specs/bellatrix/fork-choice.md#notify_forkchoice_updated)
    ///
    /// `payload_attributes` is [`Either::Left`] when no payload should be built.
    /// The [`Phase`] in that case selects the method version.
    async fn notify_forkchoice_updated(
        &self,
        fork_choice_state: ForkChoiceStateV1,
        payload_attributes: Either<Phase, PayloadAttributes>,
    ) -> Result<(Option<PayloadId>, Option<ExecutionBlockHash>)>;

    async fn get_payload(
        &self,
        payload_id: PayloadId,
        slot: Slot,
    ) -> Result<WithBlobsAndValue<ExecutionPayload>>;
}

#[async_trait]
impl<E: ExecutionEngine + ?Sized> ExecutionEngine for Arc<E> {
    async fn notify_new_payload(
        &self,
        payload: ExecutionPayload,
        params: Option<ExecutionPayloadParams>,
    ) -> Result<Option<ExecutionBlockHash>> {
        self.as_ref().notify_new_payload(payload, params).await
    }

    async fn notify_forkchoice_updated(
        &self,
        fork_choice_state: ForkChoiceStateV1,
        payload_attributes: Either<Phase, PayloadAttributes>,
    ) -> Result<(Option<PayloadId>, Option<ExecutionBlockHash>)> {
        self.as_ref()
            .notify_forkchoice_updated(fork_choice_state, payload_attributes)
            .await
    }

    async fn get_payload(
        &self,
        payload_id: PayloadId,
        slot: Slot,
    ) -> Result<WithBlobsAndValue<ExecutionPayload>> {
        self.as_ref().get_payload(payload_id, slot).await
    }
}

/// Used when no execution client is configured. Every payload is treated as optimistic.
#[derive(Clone, Copy)]
pub struct NullExecutionEngine;

#[async_trait]
impl ExecutionEngine for NullExecutionEngine {
    async fn notify_new_payload(
        &self,
        _payload: ExecutionPayload,
        _params: Option<ExecutionPayloadParams>,
    ) -> Result<Option<ExecutionBlockHash>> {
        Ok(None)
    }

    async fn notify_forkchoice_updated(
        &self,
        _fork_choice_state: ForkChoiceStateV1,
        _payload_attributes: Either<Phase, PayloadAttributes>,
    ) -> Result<(Option<PayloadId>, Option<ExecutionBlockHash>)> {
        Ok((None, None))
    }

    async fn get_payload(
        &self,
        payload_id: PayloadId,
        _slot: Slot,
    ) -> Result<WithBlobsAndValue<ExecutionPayload>> {
        Err(Error::PayloadNotFound { payload_id }.into())
    }
}

/// In-memory engine for tests of code that drives an [`ExecutionEngine`].
#[derive(Default)]
pub struct MockExecutionEngine {
    execution_valid: bool,
    payloads: Mutex<HashMap<PayloadId, WithBlobsAndValue<ExecutionPayload>>>,
    fork_choice_states: Mutex<Vec<ForkChoiceStateV1>>,
    next_payload_id: Mutex<u64>,
}

#[async_trait]
impl ExecutionEngine for MockExecutionEngine {
    async fn notify_new_payload(
        &self,
        payload: ExecutionPayload,
        _params: Option<ExecutionPayloadParams>,
    ) -> Result<Option<ExecutionBlockHash>> {
        ensure!(self.execution_valid, Error::PayloadNotValid);
        Ok(Some(payload.block_hash()))
    }

    async fn notify_forkchoice_updated(
        &self,
        fork_choice_state: ForkChoiceStateV1,
        payload_attributes: Either<Phase, PayloadAttributes>,
    ) -> Result<(Option<PayloadId>, Option<ExecutionBlockHash>)> {
        self.fork_choice_states.lock().push(fork_choice_state);

        let payload_id = payload_attributes.right().map(|_| {
            let mut next_payload_id = self.next_payload_id.lock();
            *next_payload_id += 1;
            PayloadId::from_low_u64_be(*next_payload_id)
        });

        Ok((payload_id, Some(fork_choice_state.head_block_hash)))
    }

    async fn get_payload(
        &self,
        payload_id: PayloadId,
        _slot: Slot,
    ) -> Result<WithBlobsAndValue<ExecutionPayload>> {
        self.payloads
            .lock()
            .remove(&payload_id)
            .ok_or_else(|| Error::PayloadNotFound { payload_id }.into())
    }
}

impl MockExecutionEngine {
    #[must_use]
    pub fn new(execution_valid: bool) -> Self {
        Self {
            execution_valid,
            ..Self::default()
        }
    }

    pub fn insert_payload(
        &self,
        payload_id: PayloadId,
        payload: WithBlobsAndValue<ExecutionPayload>,
    ) {
        self.payloads.lock().insert(payload_id, payload);
    }

    #[must_use]
    pub fn fork_choice_states(&self) -> Vec<ForkChoiceStateV1> {
        self.fork_choice_states.lock().clone()
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error("execution payload not valid")]
    PayloadNotValid,
    #[error("no payload is being built with ID {payload_id:?}")]
    PayloadNotFound { payload_id: PayloadId },
}
