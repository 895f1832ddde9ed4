//! Engine-level error taxonomy.
//!
//! Validation errors are raised synchronously at submission; decode and
//! compute errors travel back inside the response for the request that
//! caused them. An error in one asset's pipeline never affects another
//! asset's in-flight requests.

use thiserror::Error;

use fstop_core::decode::DecodeError;
use fstop_core::transform::ValidationError;

use crate::gpu::ComputeBackendError;
use crate::message::AssetId;

/// Errors surfaced by the edit engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The source bytes could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Request parameters were rejected before dispatch.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The compute backend failed; carries enough context to retry.
    #[error("compute backend failed for asset {asset} in stage {stage}: {source}")]
    Compute {
        asset: AssetId,
        stage: &'static str,
        #[source]
        source: ComputeBackendError,
    },

    /// Not a failure: the request was superseded and its result discarded.
    #[error("request superseded by a newer request for the same asset")]
    Stale,

    /// The target worker's queue is full; the caller should coalesce edits.
    #[error("worker queue full for asset {asset}")]
    QueueFull { asset: AssetId },

    /// The engine's workers are gone; no further requests can be taken.
    #[error("engine is shut down")]
    Shutdown,
}

impl EngineError {
    /// True for the discard signal, which callers should not treat as a
    /// pipeline failure.
    pub fn is_stale(&self) -> bool {
        matches!(self, EngineError::Stale)
    }
}
