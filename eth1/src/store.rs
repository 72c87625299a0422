use std::path::PathBuf;

use anyhow::Result;
use deposit_tree::DepositTreeSnapshot;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use types::phase0::{
    containers::{Checkpoint, Eth1Data},
    primitives::{
        DepositIndex, Epoch, ExecutionBlockHash, ExecutionBlockNumber, UnixSeconds, H256,
    },
};

use crate::deposit_cache::DepositContainer;

const EXECUTION_CHAIN_DATA_FILE_NAME: &str = "execution_chain_data.json";

/// Progress of deposit synchronization.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct LatestEth1Data {
    pub block_height: ExecutionBlockNumber,
    pub block_timestamp: UnixSeconds,
    pub block_hash: ExecutionBlockHash,
    pub last_requested_block: ExecutionBlockNumber,
}

/// Facts about the execution block that triggered chain start.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct ChainStartData {
    pub genesis_time: UnixSeconds,
    pub genesis_block_hash: ExecutionBlockHash,
    pub genesis_block_number: ExecutionBlockNumber,
    pub eth1_data: Eth1Data,
}

/// Everything needed to resume deposit synchronization after a restart.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct ExecutionChainData {
    pub latest_eth1_data: LatestEth1Data,
    pub chain_start_data: Option<ChainStartData>,
    pub deposit_snapshot: Option<DepositTreeSnapshot>,
    pub deposit_containers: Vec<DepositContainer>,
}

pub trait ExecutionChainStore: Send + Sync {
    fn save_execution_chain_data(&self, data: &ExecutionChainData) -> Result<()>;

    fn execution_chain_data(&self) -> Result<Option<ExecutionChainData>>;

    fn finalized_checkpoint(&self) -> Result<Checkpoint>;
}

/// Part of a beacon state needed to prune pending deposits.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FinalizedState {
    pub epoch: Epoch,
    pub eth1_deposit_index: DepositIndex,
}

pub trait StateAccess: Send + Sync {
    /// Returns the most recent finalized state if one is cached.
    fn cached_finalized_state(&self) -> Option<FinalizedState>;

    fn state_by_root(&self, root: H256) -> Result<FinalizedState>;
}

#[derive(Default)]
pub struct InMemoryStore {
    data: Mutex<Option<ExecutionChainData>>,
    finalized_checkpoint: Mutex<Checkpoint>,
}

impl InMemoryStore {
    pub fn set_finalized_checkpoint(&self, checkpoint: Checkpoint) {
        *self.finalized_checkpoint.lock() = checkpoint;
    }
}

impl ExecutionChainStore for InMemoryStore {
    fn save_execution_chain_data(&self, data: &ExecutionChainData) -> Result<()> {
        *self.data.lock() = Some(data.clone());
        Ok(())
    }

    fn execution_chain_data(&self) -> Result<Option<ExecutionChainData>> {
        Ok(self.data.lock().clone())
    }

    fn finalized_checkpoint(&self) -> Result<Checkpoint> {
        Ok(*self.finalized_checkpoint.lock())
    }
}

/// Keeps execution chain data in a JSON file.
///
/// The finalized checkpoint is owned by the consensus side and only kept in memory.
pub struct FileStore {
    directory: PathBuf,
    finalized_checkpoint: Mutex<Checkpoint>,
}

impl FileStore {
    #[must_use]
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            finalized_checkpoint: Mutex::default(),
        }
    }

    pub fn set_finalized_checkpoint(&self, checkpoint: Checkpoint) {
        *self.finalized_checkpoint.lock() = checkpoint;
    }

    fn path(&self) -> PathBuf {
        self.directory.join(EXECUTION_CHAIN_DATA_FILE_NAME)
    }
}

impl ExecutionChainStore for FileStore {
    fn save_execution_chain_data(&self, data: &ExecutionChainData) -> Result<()> {
        fs_err::create_dir_all(&self.directory)?;

        // Replace the file atomically.
        let temporary_path = self.path().with_extension("json.tmp");
        fs_err::write(&temporary_path, serde_json::to_vec(data)?)?;
        fs_err::rename(temporary_path, self.path())?;

        Ok(())
    }

    fn execution_chain_data(&self) -> Result<Option<ExecutionChainData>> {
        let path = self.path();

        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs_err::read(path)?;

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn finalized_checkpoint(&self) -> Result<Checkpoint> {
        Ok(*self.finalized_checkpoint.lock())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use types::phase0::containers::{Deposit, DepositData};

    use super::*;

    fn execution_chain_data() -> ExecutionChainData {
        ExecutionChainData {
            latest_eth1_data: LatestEth1Data {
                block_height: 1_000,
                block_timestamp: 1_606_824_023,
                block_hash: H256::repeat_byte(1),
                last_requested_block: 1_000,
            },
            chain_start_data: Some(ChainStartData {
                genesis_time: 1_606_824_023,
                genesis_block_hash: H256::repeat_byte(2),
                genesis_block_number: 11_320_899,
                eth1_data: Eth1Data::default(),
            }),
            deposit_snapshot: None,
            deposit_containers: vec![DepositContainer {
                deposit: Deposit {
                    proof: vec![H256::repeat_byte(3); 33],
                    data: DepositData::default(),
                },
                index: 0,
                block_number: 999,
                deposit_root: H256::repeat_byte(4),
            }],
        }
    }

    #[test]
    fn file_store_starts_empty() -> Result<()> {
        let directory = TempDir::new()?;
        let store = FileStore::new(directory.path().to_owned());

        assert_eq!(store.execution_chain_data()?, None);

        Ok(())
    }

    #[test]
    fn file_store_returns_saved_data() -> Result<()> {
        let directory = TempDir::new()?;
        let store = FileStore::new(directory.path().join("eth1"));

        store.save_execution_chain_data(&ExecutionChainData::default())?;
        store.save_execution_chain_data(&execution_chain_data())?;

        let reopened = FileStore::new(directory.path().join("eth1"));

        assert_eq!(
            reopened.execution_chain_data()?,
            Some(execution_chain_data()),
        );

        Ok(())
    }

    #[test]
    fn file_store_rejects_corrupted_file() -> Result<()> {
        let directory = TempDir::new()?;
        let store = FileStore::new(directory.path().to_owned());

        fs_err::write(store.path(), "{")?;

        store
            .execution_chain_data()
            .expect_err("file does not contain valid JSON");

        Ok(())
    }
}
