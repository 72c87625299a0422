use std::collections::BTreeMap;

use derive_more::Display;
use parking_lot::RwLock;

/// Conditions that keep the execution layer bridge from working correctly.
///
/// Ordered from most to least severe.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Display)]
pub enum ServiceErrorKind {
    #[display("configuration mismatch")]
    ConfigurationMismatch,
    #[display("deposit synchronization")]
    DepositSynchronization,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

/// Sticky service errors reported to operators.
///
/// Each kind of error stays set until a later successful check of the same kind clears it.
#[derive(Default)]
pub struct ServiceHealth {
    errors: RwLock<BTreeMap<ServiceErrorKind, String>>,
}

impl ServiceHealth {
    /// Returns the most severe error currently set.
    #[must_use]
    pub fn error(&self) -> Option<ServiceError> {
        self.errors
            .read()
            .first_key_value()
            .map(|(kind, message)| ServiceError {
                kind: *kind,
                message: message.clone(),
            })
    }

    #[must_use]
    pub fn errors(&self) -> Vec<ServiceError> {
        self.errors
            .read()
            .iter()
            .map(|(kind, message)| ServiceError {
                kind: *kind,
                message: message.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn has_error(&self, kind: ServiceErrorKind) -> bool {
        self.errors.read().contains_key(&kind)
    }

    pub fn set_error(&self, kind: ServiceErrorKind, message: impl Into<String>) {
        self.errors.write().insert(kind, message.into());
    }

    pub fn clear_error(&self, kind: ServiceErrorKind) {
        self.errors.write().remove(&kind);
    }
}
