use thiserror::Error;
use uuid::Uuid;

use crate::models::{EntityKind, EntityRef, ShapeKind};

/// An entity or geometry that would break a data-model invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("position ({lat}, {lon}) is outside WGS84 bounds")]
    InvalidPosition { lat: f64, lon: f64 },

    #[error("certainty {0} is outside 0..=100")]
    CertaintyOutOfRange(u8),

    #[error("{shape} needs at least {required} vertices, got {actual}")]
    TooFewVertices {
        shape: ShapeKind,
        required: usize,
        actual: usize,
    },

    #[error("circle radius must be positive, got {0}")]
    NonPositiveRadius(f64),

    #[error("area shape cannot change from {from} to {to}")]
    ShapeChanged { from: ShapeKind, to: ShapeKind },
}

/// A serialized collection that cannot be accepted as a whole.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectionError {
    #[error("malformed collection: {0}")]
    Malformed(String),

    #[error("entity {index} is invalid: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error("duplicate id {0}")]
    DuplicateId(Uuid),
}

/// Failure reported by a storage collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("{kind} {id} already exists")]
    DuplicateId { kind: EntityKind, id: Uuid },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Rejected operator intent. The engine state is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("nothing is staged")]
    NothingStaged,

    #[error("another entity is already staged")]
    StagingOccupied,

    #[error("only committed entities can be deleted")]
    NotCommitted,

    #[error("form for {got} does not match staged {expected}")]
    FormMismatch { expected: EntityKind, got: EntityKind },

    #[error("{shape} needs at least {required} points, have {actual}")]
    IncompleteShape {
        shape: ShapeKind,
        required: usize,
        actual: usize,
    },

    #[error("finish or cancel the staged entity before switching tools")]
    ToolBusy,

    #[error("no shape is being drawn")]
    NotDrawing,

    #[error("no committed entity with id {0}")]
    UnknownEntity(Uuid),

    #[error("{} {} is open for editing", .0.kind, .0.id)]
    StagedForEdit(EntityRef),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
