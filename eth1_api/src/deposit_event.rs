// This is how `DepositEvent` logs are laid out (each line is an EVM word in hexadecimal):
// ```text
// 00000000000000000000000000000000000000000000000000000000000000a0 pubkey                 offset
// 0000000000000000000000000000000000000000000000000000000000000100 withdrawal_credentials offset
// 0000000000000000000000000000000000000000000000000000000000000140 amount                 offset
// 0000000000000000000000000000000000000000000000000000000000000180 signature              offset
// 0000000000000000000000000000000000000000000000000000000000000200 index                  offset
// 0000000000000000000000000000000000000000000000000000000000000030 pubkey                 length
// ................................................................ pubkey
// ................................00000000000000000000000000000000 pubkey
// 0000000000000000000000000000000000000000000000000000000000000020 withdrawal_credentials length
// ................................................................ withdrawal_credentials
// 0000000000000000000000000000000000000000000000000000000000000008 amount                 length
// ................000000000000000000000000000000000000000000000000 amount
// 0000000000000000000000000000000000000000000000000000000000000060 signature              length
// ................................................................ signature
// ................................................................ signature
// ................................................................ signature
// 0000000000000000000000000000000000000000000000000000000000000008 index                  length
// ................000000000000000000000000000000000000000000000000 index
// ```
//
// The deposit contract encodes all values as dynamic arrays (`bytes`) even though they are fixed
// in size. Amount and index are little-endian, unlike ordinary ABI integers.
//
// See:
// - <https://github.com/ethereum/consensus-specs/blob/fab27d17f0dd289a6abbb99acae39387ac2320cf/solidity_deposit_contract/deposit_contract.sol>
// - <https://docs.soliditylang.org/en/v0.8.2/abi-spec.html>

use core::ops::Range;

use anyhow::{ensure, Error as AnyhowError};
use hex_literal::hex;
use memoffset::span_of;
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;
use thiserror::Error;
use types::phase0::{
    containers::DepositData,
    primitives::{
        DepositIndex, ExecutionAddress, ExecutionBlockHash, ExecutionBlockNumber, Gwei,
        PublicKeyBytes, SignatureBytes, H256,
    },
};

#[derive(Debug, Error)]
enum Error {
    #[error("log has unexpected topics: {log:?}")]
    UnexpectedTopics { log: Box<Log> },
    #[error("log has been removed: {log:?}")]
    Removed { log: Box<Log> },
    #[error("log data has the wrong length: {log:?}")]
    WrongLength { log: Box<Log> },
}

/// Contract log as returned by `eth_getLogs`.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: ExecutionAddress,
    pub topics: Vec<H256>,
    #[serde(with = "serde_utils::prefixed_hex_bytes")]
    pub data: Vec<u8>,
    #[serde(default, with = "serde_utils::prefixed_hex_quantity::option")]
    pub block_number: Option<ExecutionBlockNumber>,
    #[serde(default)]
    pub block_hash: Option<ExecutionBlockHash>,
    #[serde(default)]
    pub removed: bool,
}

impl Log {
    #[must_use]
    pub fn topic(&self) -> Option<H256> {
        self.topics.first().copied()
    }
}

type EvmWord = [u8; 32];

#[repr(C)]
struct RawDepositEvent {
    _pubkey_offset: EvmWord,
    _withdrawal_credentials_offset: EvmWord,
    _amount_offset: EvmWord,
    _signature_offset: EvmWord,
    _index_offset: EvmWord,
    _pubkey_length: EvmWord,
    pubkey: PublicKeyBytes,
    _pubkey_padding: [u8; 16],
    _withdrawal_credentials_length: EvmWord,
    withdrawal_credentials: H256,
    _amount_length: EvmWord,
    amount: Gwei,
    _amount_padding: [u8; 24],
    _signature_length: EvmWord,
    signature: SignatureBytes,
    _index_length: EvmWord,
    index: DepositIndex,
    _index_padding: [u8; 24],
}

assert_eq_size!(RawDepositEvent, [EvmWord; 18]);

/// Deposit decoded from a `DepositEvent` log of the deposit contract.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct DepositEvent {
    pub data: DepositData,
    pub index: DepositIndex,
}

impl TryFrom<Log> for DepositEvent {
    type Error = AnyhowError;

    fn try_from(log: Log) -> Result<Self, Self::Error> {
        ensure!(
            log.topics == [Self::TOPIC],
            Error::UnexpectedTopics { log: Box::new(log) },
        );

        ensure!(!log.removed, Error::Removed { log: Box::new(log) });

        ensure!(
            log.data.len() == Self::LENGTH,
            Error::WrongLength { log: Box::new(log) },
        );

        let log_data = log.data.as_slice();

        // There is no equivalent to `memoffset::span_of!` in the standard library.
        let pubkey = PublicKeyBytes::from_slice(&log_data[span_of!(RawDepositEvent, pubkey)]);

        let withdrawal_credentials =
            H256::from_slice(&log_data[span_of!(RawDepositEvent, withdrawal_credentials)]);

        let amount = read_u64_le(log_data, span_of!(RawDepositEvent, amount));

        let signature =
            SignatureBytes::from_slice(&log_data[span_of!(RawDepositEvent, signature)]);

        let index = read_u64_le(log_data, span_of!(RawDepositEvent, index));

        Ok(Self {
            data: DepositData {
                pubkey,
                withdrawal_credentials,
                amount,
                signature,
            },
            index,
        })
    }
}

impl DepositEvent {
    /// Keccak-256 hash of `DepositEvent(bytes,bytes,bytes,bytes,bytes)`.
    pub const TOPIC: H256 = H256(hex!(
        "649bbc62d0e31342afea4e5cd82d4049e7e1ee912fc0889aa790803be39038c5"
    ));

    pub const LENGTH: usize = size_of::<RawDepositEvent>();

    /// Encodes the event the way the deposit contract does.
    #[must_use]
    pub fn to_log_data(&self) -> Vec<u8> {
        let mut data = vec![0; Self::LENGTH];

        let mut write = |range: Range<usize>, bytes: &[u8]| data[range].copy_from_slice(bytes);

        // Offsets of the dynamic arrays followed by their lengths, all big-endian.
        for (word, value) in [
            (0, 0xa0),
            (1, 0x100),
            (2, 0x140),
            (3, 0x180),
            (4, 0x200),
            (5, 0x30),
            (8, 0x20),
            (10, 0x08),
            (12, 0x60),
            (16, 0x08),
        ] {
            let end = (word + 1) * size_of::<EvmWord>();
            write(end - size_of::<u64>()..end, &u64::to_be_bytes(value));
        }

        write(span_of!(RawDepositEvent, pubkey), self.data.pubkey.as_bytes());
        write(
            span_of!(RawDepositEvent, withdrawal_credentials),
            self.data.withdrawal_credentials.as_bytes(),
        );
        write(
            span_of!(RawDepositEvent, amount),
            &self.data.amount.to_le_bytes(),
        );
        write(
            span_of!(RawDepositEvent, signature),
            self.data.signature.as_bytes(),
        );
        write(span_of!(RawDepositEvent, index), &self.index.to_le_bytes());

        data
    }
}

fn read_u64_le(data: &[u8], range: Range<usize>) -> u64 {
    let mut bytes = [0; size_of::<u64>()];
    bytes.copy_from_slice(&data[range]);
    u64::from_le_bytes(bytes)
}
