use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::module::SourceType;

/// Handle for a chunk.
///
/// The wrapped value is the chunk's debug id: a monotonic integer minted at
/// creation (starting at 1000) by the owning [`crate::ChunkGraph`]. Ordering
/// by `ChunkId` therefore gives every algorithm a total, content-independent
/// order over chunks, which is what keeps set canonicalization and tie breaks
/// deterministic.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkId(pub(crate) u32);

impl ChunkId {
  pub fn debug_id(self) -> u32 {
    self.0
  }
}

impl std::fmt::Display for ChunkId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "chunk({})", self.0)
  }
}

/// One physical output unit.
///
/// This record only carries identity and codegen metadata. All adjacency
/// (which modules it holds, which groups it belongs to) lives in the owning
/// [`crate::ChunkGraph`] and is mutated exclusively through its paired
/// connect/disconnect primitives.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
  pub name: Option<String>,
  /// Output id, assigned later by an id-allocation pass.
  pub id: Option<String>,
  /// Content hash, assigned after codegen.
  pub hash: Option<String>,
  pub rendered_hash: Option<String>,
  /// Per-source-type content hashes.
  pub content_hash: HashMap<SourceType, String>,
  /// When set, this chunk refuses to be merged into (or absorb) another.
  pub prevent_integration: bool,
  /// Human-readable note about why this chunk exists.
  pub chunk_reason: Option<String>,
  /// Custom output filename template, set by the split-chunks pass.
  pub filename_template: Option<String>,
}

impl Chunk {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: Some(name.into()),
      ..Self::default()
    }
  }
}

/// Cost model used by [`crate::ChunkGraph::get_chunk_size`].
///
/// A chunk that can be loaded initially delays first paint, so its module
/// bytes are weighted by `entry_chunk_multiplicator`; every chunk also pays a
/// fixed per-request overhead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkSizeOptions {
  pub entry_chunk_multiplicator: f64,
  pub chunk_overhead: f64,
}

impl Default for ChunkSizeOptions {
  fn default() -> Self {
    Self {
      entry_chunk_multiplicator: 10.0,
      chunk_overhead: 10_000.0,
    }
  }
}
