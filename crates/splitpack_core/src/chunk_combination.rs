use std::collections::HashMap;

use indexmap::IndexSet;

use crate::chunk::ChunkId;

/// Handle for an interned chunk combination. Id 0 is always the empty
/// combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CombinationId(u32);

impl CombinationId {
  pub const EMPTY: CombinationId = CombinationId(0);

  fn index(self) -> usize {
    self.0 as usize
  }
}

struct CombinationNode {
  parent: CombinationId,
  /// Chunk added by this node over its parent. `None` only for the empty
  /// combination.
  last: Option<ChunkId>,
  /// Full chunk set, kept in ascending debug-id order.
  chunks: IndexSet<ChunkId>,
}

/// Interner for immutable, structurally shared chunk sets.
///
/// Every node extends its parent by exactly one chunk, and the backbone is
/// kept in ascending debug-id order. Construction is memoized per
/// `(combination, chunk)` pair, so two combinations hold the same chunk set
/// iff they are the same id — no matter in which order callers added the
/// chunks. That makes "do these two modules sit in exactly the same chunks"
/// an id comparison instead of a set comparison, which is what the
/// split-chunks pass leans on for its grouping key.
pub struct ChunkCombinations {
  nodes: Vec<CombinationNode>,
  add_cache: HashMap<(CombinationId, ChunkId), CombinationId>,
  remove_cache: HashMap<(CombinationId, ChunkId), CombinationId>,
}

impl Default for ChunkCombinations {
  fn default() -> Self {
    Self::new()
  }
}

impl ChunkCombinations {
  pub fn new() -> Self {
    Self {
      nodes: vec![CombinationNode {
        parent: CombinationId::EMPTY,
        last: None,
        chunks: IndexSet::new(),
      }],
      add_cache: HashMap::new(),
      remove_cache: HashMap::new(),
    }
  }

  fn node(&self, id: CombinationId) -> &CombinationNode {
    &self.nodes[id.index()]
  }

  pub fn len(&self, id: CombinationId) -> usize {
    self.node(id).chunks.len()
  }

  pub fn is_empty(&self, id: CombinationId) -> bool {
    self.node(id).chunks.is_empty()
  }

  pub fn contains(&self, id: CombinationId, chunk: ChunkId) -> bool {
    self.node(id).chunks.contains(&chunk)
  }

  /// The combination's chunks in ascending debug-id order.
  pub fn chunks(&self, id: CombinationId) -> &IndexSet<ChunkId> {
    &self.node(id).chunks
  }

  /// Returns the combination representing `id ∪ {chunk}`. A no-op when the
  /// chunk is already present.
  ///
  /// The canonical backbone only ever grows by appending the largest debug
  /// id; when `chunk` sorts below the current maximum the operation is
  /// re-expressed as remove-and-reinsert via the parent chain.
  pub fn with(&mut self, id: CombinationId, chunk: ChunkId) -> CombinationId {
    if self.node(id).chunks.contains(&chunk) {
      return id;
    }
    if let Some(&hit) = self.add_cache.get(&(id, chunk)) {
      return hit;
    }
    let result = match self.node(id).last {
      Some(last) if chunk < last => {
        let parent = self.node(id).parent;
        let lower = self.with(parent, chunk);
        self.with(lower, last)
      }
      _ => {
        // `chunk` is greater than everything in the set: append a node.
        let node = self.node(id);
        let mut chunks = node.chunks.clone();
        chunks.insert(chunk);
        let new_id = CombinationId(self.nodes.len() as u32);
        self.nodes.push(CombinationNode {
          parent: id,
          last: Some(chunk),
          chunks,
        });
        new_id
      }
    };
    self.add_cache.insert((id, chunk), result);
    result
  }

  /// Returns the combination representing `id ∖ {chunk}`. A no-op when the
  /// chunk is absent.
  pub fn without(&mut self, id: CombinationId, chunk: ChunkId) -> CombinationId {
    if !self.node(id).chunks.contains(&chunk) {
      return id;
    }
    if let Some(&hit) = self.remove_cache.get(&(id, chunk)) {
      return hit;
    }
    let node = self.node(id);
    let last = node.last.expect("non-empty combination has a last chunk");
    let parent = node.parent;
    let result = if last == chunk {
      parent
    } else {
      let upper = self.without(parent, chunk);
      self.with(upper, last)
    };
    self.remove_cache.insert((id, chunk), result);
    result
  }

  /// Returns the union of two combinations, peeling whichever side currently
  /// holds the larger maximum so the canonical backbone is reused rather than
  /// rebuilt.
  pub fn with_all(&mut self, a: CombinationId, b: CombinationId) -> CombinationId {
    if a == b || self.is_empty(b) {
      return a;
    }
    if self.is_empty(a) {
      return b;
    }
    let last_a = self.node(a).last.expect("non-empty");
    let last_b = self.node(b).last.expect("non-empty");
    if last_a < last_b {
      let parent_b = self.node(b).parent;
      let merged = self.with_all(a, parent_b);
      self.with(merged, last_b)
    } else {
      let parent_a = self.node(a).parent;
      let merged = self.with_all(parent_a, b);
      self.with(merged, last_a)
    }
  }

  /// True when the two combinations' chunk sets intersect.
  pub fn has_shared_chunks(&self, a: CombinationId, b: CombinationId) -> bool {
    let (small, large) = if self.len(a) <= self.len(b) {
      (a, b)
    } else {
      (b, a)
    };
    let large_chunks = &self.node(large).chunks;
    self
      .node(small)
      .chunks
      .iter()
      .any(|chunk| large_chunks.contains(chunk))
  }

  /// True when `other`'s chunks are a subset of `id`'s chunks.
  pub fn is_subset(&self, id: CombinationId, other: CombinationId) -> bool {
    if id == other || self.is_empty(other) {
      return true;
    }
    if self.len(other) > self.len(id) {
      return false;
    }
    // When the candidate subset is tiny relative to the superset, direct
    // membership tests beat walking the shared backbone.
    if self.len(other) * 8 < self.len(id) {
      let chunks = &self.node(id).chunks;
      return self.node(other).chunks.iter().all(|c| chunks.contains(c));
    }
    // Walk both backbones by decreasing debug id. Insertion order is
    // canonical, so any chunk of `other` missing from `id` surfaces as soon
    // as `id`'s cursor drops below it.
    let mut x = id;
    let mut y = other;
    loop {
      if self.is_empty(y) {
        return true;
      }
      if self.len(x) < self.len(y) {
        return false;
      }
      let last_x = self.node(x).last.expect("non-empty");
      let last_y = self.node(y).last.expect("non-empty");
      match last_x.cmp(&last_y) {
        std::cmp::Ordering::Equal => {
          x = self.node(x).parent;
          y = self.node(y).parent;
        }
        std::cmp::Ordering::Greater => {
          x = self.node(x).parent;
        }
        std::cmp::Ordering::Less => {
          return false;
        }
      }
    }
  }
}
