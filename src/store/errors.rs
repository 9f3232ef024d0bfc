//! Store error taxonomy
//!
//! Business-rule rejections (missing entities, stale versions, owner
//! mismatches, repeated removals) come back as values; callers decide whether
//! to refetch and retry. Only a poisoned lock is unrecoverable.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Kind of entity an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EntityKind {
    Layer,
    Domain,
    DomainValue,
    Element,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Layer => write!(f, "layer"),
            EntityKind::Domain => write!(f, "domain"),
            EntityKind::DomainValue => write!(f, "domain value"),
            EntityKind::Element => write!(f, "element"),
        }
    }
}

/// Version or ownership conflicts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictKind {
    #[error("stale version for {key}: stored {stored}, requested {requested}")]
    StaleVersion {
        key: String,
        stored: i64,
        requested: i64,
    },

    #[error("element {element} belongs to layer {owner}, not {requested}")]
    OwnerMismatch {
        element: String,
        owner: String,
        requested: String,
    },
}

/// Operations not allowed in the entity's current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateKind {
    #[error("element {element} is already inactive")]
    AlreadyInactive { element: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: EntityKind, key: String },

    #[error("conflict: {0}")]
    Conflict(ConflictKind),

    #[error("invalid state: {0}")]
    InvalidState(StateKind),

    /// The mutation was applied in memory but the save callback failed;
    /// the entity stays marked dirty until a later save succeeds.
    #[error("persisting {kind} {key} failed: {message}")]
    Persistence {
        kind: EntityKind,
        key: String,
        message: String,
    },

    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl StoreError {
    pub(crate) fn not_found(kind: EntityKind, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub(crate) fn stale(key: impl Into<String>, stored: i64, requested: i64) -> Self {
        StoreError::Conflict(ConflictKind::StaleVersion {
            key: key.into(),
            stored,
            requested,
        })
    }

    pub(crate) fn owner_mismatch(element: &str, owner: &str, requested: &str) -> Self {
        StoreError::Conflict(ConflictKind::OwnerMismatch {
            element: element.to_string(),
            owner: owner.to_string(),
            requested: requested.to_string(),
        })
    }

    pub fn is_stale_version(&self) -> bool {
        matches!(self, StoreError::Conflict(ConflictKind::StaleVersion { .. }))
    }

    pub fn is_owner_mismatch(&self) -> bool {
        matches!(self, StoreError::Conflict(ConflictKind::OwnerMismatch { .. }))
    }

    pub fn is_already_inactive(&self) -> bool {
        matches!(self, StoreError::InvalidState(StateKind::AlreadyInactive { .. }))
    }

    /// Lock poisoning means another thread panicked mid-mutation
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::LockPoisoned(_))
    }
}
