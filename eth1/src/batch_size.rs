use anyhow::{ensure, Result};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("log batch size reached zero")]
pub struct BatchSizeZero;

/// Width in blocks of deposit log queries.
///
/// Halved whenever the provider refuses a query as too large.
/// Grows back by a tenth of the maximum after every successful query.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LogBatchSize {
    current: u64,
    maximum: u64,
}

impl LogBatchSize {
    #[must_use]
    pub fn new(maximum: u64) -> Self {
        let maximum = maximum.max(1);

        Self {
            current: maximum,
            maximum,
        }
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.current
    }

    pub fn decrease(&mut self) -> Result<u64> {
        let halved = self.current / 2;

        ensure!(halved > 0, BatchSizeZero);

        self.current = halved;

        Ok(halved)
    }

    pub fn increase(&mut self) -> u64 {
        let step = (self.maximum / 10).max(1);

        self.current = self.current.saturating_add(step).min(self.maximum);
        self.current
    }
}
