use core::any::Any;
use std::{collections::HashMap, sync::Arc};

use anyhow::{ensure, Result};
use eth1_api::HeaderInfo;
use hashlink::LinkedHashMap;
use parking_lot::RwLock;
use prometheus_metrics::Metrics;
use thiserror::Error;
use types::phase0::primitives::{ExecutionBlockHash, ExecutionBlockNumber};

#[derive(Debug, Error)]
pub enum Error {
    #[error("object is not a HeaderInfo")]
    NotAHeaderInfo,
    #[error("header has zero block hash: {header:?}")]
    ZeroHash { header: HeaderInfo },
}

/// Bounded cache of execution block headers indexed by hash and by number.
///
/// When full, the header inserted first is evicted.
/// Both indices always contain the same headers.
pub struct HeaderCache {
    capacity: usize,
    indices: RwLock<Indices>,
    metrics: Option<Arc<Metrics>>,
}

#[derive(Default)]
struct Indices {
    // Iteration order is insertion order.
    by_hash: LinkedHashMap<ExecutionBlockHash, HeaderInfo>,
    by_number: HashMap<ExecutionBlockNumber, ExecutionBlockHash>,
}

impl HeaderCache {
    #[must_use]
    pub fn new(eth1_follow_distance: u64, metrics: Option<Arc<Metrics>>) -> Self {
        let capacity = usize::try_from(eth1_follow_distance.saturating_mul(2))
            .unwrap_or(usize::MAX)
            .max(1);

        Self {
            capacity,
            indices: RwLock::default(),
            metrics,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn add_header(&self, header: HeaderInfo) -> Result<()> {
        let hash = hash_key(&header)?;
        let number = number_key(&header)?;

        ensure!(!hash.is_zero(), Error::ZeroHash { header });

        let mut indices = self.indices.write();

        if let Some(previous) = indices.by_hash.remove(&hash) {
            if previous.number != number && indices.by_number.get(&previous.number) == Some(&hash) {
                indices.by_number.remove(&previous.number);
            }
        }

        // A header replaced by another one at the same height must leave both indices.
        if let Some(previous_hash) = indices.by_number.insert(number, hash) {
            if previous_hash != hash {
                indices.by_hash.remove(&previous_hash);
            }
        }

        indices.by_hash.insert(hash, header);

        while indices.by_hash.len() > self.capacity {
            let Some((_, evicted)) = indices.by_hash.pop_front() else {
                break;
            };

            if indices.by_number.get(&evicted.number) == Some(&evicted.hash) {
                indices.by_number.remove(&evicted.number);
            }
        }

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.set_eth1_header_cache_size(indices.by_hash.len());
        }

        Ok(())
    }

    #[must_use]
    pub fn header_by_hash(&self, hash: ExecutionBlockHash) -> Option<HeaderInfo> {
        self.indices.read().by_hash.get(&hash).copied()
    }

    #[must_use]
    pub fn header_by_number(&self, number: ExecutionBlockNumber) -> Option<HeaderInfo> {
        let indices = self.indices.read();
        let hash = indices.by_number.get(&number)?;
        indices.by_hash.get(hash).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.read().by_hash.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extracts the hash index key from a type-erased cache entry.
pub fn hash_key(object: &dyn Any) -> Result<ExecutionBlockHash> {
    let header = object
        .downcast_ref::<HeaderInfo>()
        .ok_or(Error::NotAHeaderInfo)?;

    Ok(header.hash)
}

/// Extracts the number index key from a type-erased cache entry.
pub fn number_key(object: &dyn Any) -> Result<ExecutionBlockNumber> {
    let header = object
        .downcast_ref::<HeaderInfo>()
        .ok_or(Error::NotAHeaderInfo)?;

    Ok(header.number)
}
