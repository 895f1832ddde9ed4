//! fstop Engine - edit-request orchestration for the fstop pixel pipeline.
//!
//! This crate sits between the UI/store layer and `fstop-core`. It owns:
//!
//! - `message` - the request/response shape spoken over the boundary
//! - `orchestrator` - the worker pool and the correlation-id protocol that
//!   keeps responses consistent under rapid, out-of-order user input
//! - `gpu` - the wgpu compute backend and the row-stride alignment layer
//!   every texture↔buffer copy must pass through
//!
//! # Usage
//!
//! ```ignore
//! use fstop_engine::{AssetId, EditOp, Engine, EngineConfig};
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! let id = engine.submit(AssetId::from("dsc_0042"), EditOp::ComputeHistogram {
//!     buffer,
//! })?;
//! // ... later, on the control thread:
//! for response in engine.poll() {
//!     assert_eq!(response.id, id);
//! }
//! ```

pub mod error;
pub mod gpu;
pub mod message;
pub mod orchestrator;
mod worker;

pub use error::EngineError;
pub use gpu::ComputeBackendError;
pub use message::{
    AnalysisReport, AssetId, CropParams, EditOp, EditOutcome, EditPhase, EditSource, RequestId,
    Response, RotationParams,
};
pub use orchestrator::{ComputeBackend, Engine, EngineConfig};
