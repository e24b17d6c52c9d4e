//! Physics Error Types
//!
//! Unified error type for the engine. Only construction-time operations can
//! fail (bad polygon rings, invalid configuration); the simulation step
//! itself is total and handles degenerate state with clamps instead of
//! errors.

use thiserror::Error;

/// Unified error type for physics operations.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PhysicsError {
    /// A body or hull was created from an empty vertex list.
    #[error("vertex list is empty")]
    EmptyVertices,

    /// A vertex coordinate is NaN or infinite.
    #[error("vertex {index} is not finite: ({x}, {y})")]
    NonFiniteVertex {
        /// Ring index of the offending vertex
        index: usize,
        /// X coordinate as provided
        x: f64,
        /// Y coordinate as provided
        y: f64,
    },

    /// The polygon ring is not convex.
    #[error("polygon is not convex at vertex {index}")]
    NonConvexPolygon {
        /// Ring index where the winding direction reverses
        index: usize,
    },

    /// Invalid configuration parameter.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the invalid configuration
        reason: &'static str,
    },
}

// ============================================================================
// Tests
// ============================================================================
