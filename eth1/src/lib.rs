pub use crate::{
    batch_size::{BatchSizeZero, LogBatchSize},
    deposit_cache::{DepositCache, DepositContainer, InMemoryDepositCache},
    download_manager::{
        DownloadManager, Error as DownloadError, ExecutionChainSource, SyncState,
    },
    eth1_chain::{Eth1Chain, Eth1Config},
    header_cache::{Error as HeaderCacheError, HeaderCache},
    log_processor::{
        deposit_tree_finalizer, DepositTreeFinalizer, Error as DepositError, LogOutcome,
        LogProcessor, NoopFinalizer, TreeFinalizer,
    },
    store::{
        ChainStartData, ExecutionChainData, ExecutionChainStore, FileStore, FinalizedState,
        InMemoryStore, LatestEth1Data, StateAccess,
    },
};

mod batch_size;
mod deposit_cache;
mod download_manager;
mod eth1_chain;
mod header_cache;
mod log_processor;
mod store;
