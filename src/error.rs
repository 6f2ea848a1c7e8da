//! Error taxonomy for tree-support generation.
//!
//! Only [`TreeSupportError::Cancelled`] and [`TreeSupportError::Internal`]
//! are fatal to a generation run. Per-element geometric failures
//! (`GeometryDegenerate`) are always recovered locally by the propagator;
//! they never surface here except as an aggregate warning threshold.

use crate::element::ElementId;

#[derive(Debug, thiserror::Error)]
pub enum TreeSupportError {
    /// Settings failed consistency checks; no work begins.
    #[error("invalid tree support settings: {reason}")]
    ConfigInvalid { reason: String },

    /// Cancellation token observed; partial results are discarded.
    #[error("tree support generation was cancelled")]
    Cancelled,

    /// An invariant was violated at a checkpoint. Always fatal.
    #[error("internal invariant violated on layer {layer} (element {element:?}): {invariant}")]
    Internal {
        invariant: &'static str,
        element: ElementId,
        layer: i32,
    },
}

pub type Result<T> = std::result::Result<T, TreeSupportError>;
