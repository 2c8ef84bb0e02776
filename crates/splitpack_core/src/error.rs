use thiserror::Error;

/// A chunk graph invariant no longer holds.
///
/// Produced only by [`crate::ChunkGraph::check_constraints`], which is a
/// test/debug affordance; production passes never hit this on the hot path.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("chunk graph constraint violated: {0}")]
pub struct ConstraintViolation(pub String);
