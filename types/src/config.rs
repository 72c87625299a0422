use core::time::Duration;
use std::borrow::Cow;

use hex_literal::hex;
use serde::{Deserialize, Serialize};
use serde_with::{As, DurationMilliSeconds};

use crate::{
    bellatrix::primitives::Difficulty,
    nonstandard::Phase,
    phase0::{
        consts::{FAR_FUTURE_EPOCH, GENESIS_EPOCH},
        primitives::{
            ChainId, Epoch, ExecutionAddress, ExecutionBlockHash, Slot, UnixSeconds, H160,
        },
    },
};

/// Chain parameters the execution layer bridge depends on.
///
/// Field names match the standard configuration files in `consensus-specs`.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,

    // Genesis
    pub genesis_delay: u64,
    pub min_genesis_active_validator_count: u64,
    pub min_genesis_time: UnixSeconds,

    // Forking
    pub altair_fork_epoch: Epoch,
    pub bellatrix_fork_epoch: Epoch,
    pub capella_fork_epoch: Epoch,
    pub deneb_fork_epoch: Epoch,
    pub electra_fork_epoch: Epoch,

    // Time parameters
    pub eth1_follow_distance: u64,
    pub seconds_per_eth1_block: u64,
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,

    // Deposit contract
    pub deposit_chain_id: ChainId,
    pub deposit_contract_address: ExecutionAddress,

    // Transition
    pub terminal_block_hash: ExecutionBlockHash,
    pub terminal_block_hash_activation_epoch: Epoch,
    pub terminal_total_difficulty: Difficulty,

    // Engine API
    #[serde(with = "As::<DurationMilliSeconds>")]
    pub engine_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Use `default` so that custom networks are not mistaken for mainnet.
            config_name: Cow::Borrowed("default"),

            // Genesis
            genesis_delay: 604_800,
            min_genesis_active_validator_count: 1 << 14,
            min_genesis_time: 0,

            // Forking
            altair_fork_epoch: FAR_FUTURE_EPOCH,
            bellatrix_fork_epoch: FAR_FUTURE_EPOCH,
            capella_fork_epoch: FAR_FUTURE_EPOCH,
            deneb_fork_epoch: FAR_FUTURE_EPOCH,
            electra_fork_epoch: FAR_FUTURE_EPOCH,

            // Time parameters
            eth1_follow_distance: 2048,
            seconds_per_eth1_block: 14,
            seconds_per_slot: 12,
            slots_per_epoch: 32,

            // Deposit contract
            deposit_chain_id: 0,
            deposit_contract_address: ExecutionAddress::zero(),

            // Transition
            terminal_block_hash: ExecutionBlockHash::zero(),
            terminal_block_hash_activation_epoch: FAR_FUTURE_EPOCH,
            terminal_total_difficulty: Difficulty::from_big_endian(&hex!(
                "fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffc00"
            )),

            engine_timeout: Duration::from_secs(8),
        }
    }
}

impl Config {
    /// [Mainnet configuration](https://github.com/eth-clients/mainnet/blob/main/metadata/config.yaml).
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),

            min_genesis_time: 1_606_824_000,

            altair_fork_epoch: 74_240,
            bellatrix_fork_epoch: 144_896,
            capella_fork_epoch: 194_048,
            deneb_fork_epoch: 269_568,
            electra_fork_epoch: 364_032,

            deposit_chain_id: 1,
            deposit_contract_address: H160(hex!("00000000219ab540356cBB839Cbe05303d7705Fa")),

            terminal_total_difficulty: Difficulty::from(58_750_000_000_000_000_000_000_u128),

            ..Self::default()
        }
    }

    /// [Minimal configuration](https://github.com/ethereum/consensus-specs/blob/dev/configs/minimal.yaml).
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            config_name: Cow::Borrowed("minimal"),

            genesis_delay: 300,
            min_genesis_active_validator_count: 64,
            min_genesis_time: 1_578_009_600,

            eth1_follow_distance: 16,
            seconds_per_slot: 6,
            slots_per_epoch: 8,

            deposit_chain_id: 5,
            deposit_contract_address: H160(hex!("1234567890123456789012345678901234567890")),

            ..Self::default()
        }
    }

    #[must_use]
    pub const fn fork_epoch(&self, phase: Phase) -> Epoch {
        match phase {
            Phase::Phase0 => GENESIS_EPOCH,
            Phase::Altair => self.altair_fork_epoch,
            Phase::Bellatrix => self.bellatrix_fork_epoch,
            Phase::Capella => self.capella_fork_epoch,
            Phase::Deneb => self.deneb_fork_epoch,
            Phase::Electra => self.electra_fork_epoch,
        }
    }

    #[must_use]
    pub fn phase_at_epoch(&self, epoch: Epoch) -> Phase {
        enum_iterator::all::<Phase>()
            .take_while(|phase| self.fork_epoch(*phase) <= epoch)
            .last()
            .unwrap_or(Phase::Phase0)
    }

    #[must_use]
    pub fn phase_at_slot(&self, slot: Slot) -> Phase {
        self.phase_at_epoch(self.epoch_at_slot(slot))
    }

    #[must_use]
    pub const fn epoch_at_slot(&self, slot: Slot) -> Epoch {
        slot / self.slots_per_epoch
    }
}
