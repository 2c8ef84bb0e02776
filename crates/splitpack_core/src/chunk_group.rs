use indexmap::IndexSet;
use petgraph::graph::NodeIndex;

use crate::chunk::ChunkId;
use crate::module::ModuleId;

/// Handle for a chunk group. Groups live as node weights in the chunk
/// graph's loading-order DAG, so the stable petgraph index is the id.
pub type ChunkGroupId = NodeIndex;

/// Handle for an async-dependencies block: a point in the module graph that
/// triggered an async chunk group. Each block maps to at most one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkGroupKind {
  /// An async split point; never loaded initially.
  Normal,
  /// An entrypoint; its chunks are part of the initial page load.
  Entrypoint,
}

/// Provenance for diagnostics: which module/request caused this group to
/// exist.
#[derive(Debug, Clone, Default)]
pub struct OriginRecord {
  pub module: Option<ModuleId>,
  pub loc: Option<String>,
  pub request: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkGroupOptions {
  pub name: Option<String>,
  /// Runtime manifest order hints, surfaced by
  /// [`crate::ChunkGraph::get_children_by_orders`].
  pub preload_order: Option<i32>,
  pub prefetch_order: Option<i32>,
}

/// An ordered sequence of chunks produced together for one loading slot
/// (one entrypoint or one dynamic-import boundary).
///
/// The order of `chunks` is semantically meaningful: within a group, later
/// chunks require the earlier ones to be loaded first. Mutators preserve
/// relative order; nothing here may silently reorder.
///
/// Parent/child DAG edges live in the owning [`crate::ChunkGraph`], where a
/// single directed edge serves both directions of the relation.
#[derive(Debug)]
pub struct ChunkGroup {
  pub(crate) options: ChunkGroupOptions,
  pub(crate) kind: ChunkGroupKind,
  pub(crate) group_debug_id: u32,
  pub(crate) chunks: Vec<ChunkId>,
  pub(crate) blocks: IndexSet<BlockId>,
  pub(crate) origins: Vec<OriginRecord>,
  /// Designated runtime chunk; only meaningful for entrypoints. Falls back
  /// to the group's first chunk.
  pub(crate) runtime_chunk: Option<ChunkId>,
}

impl ChunkGroup {
  pub(crate) fn new(kind: ChunkGroupKind, options: ChunkGroupOptions, group_debug_id: u32) -> Self {
    Self {
      options,
      kind,
      group_debug_id,
      chunks: Vec::new(),
      blocks: IndexSet::new(),
      origins: Vec::new(),
      runtime_chunk: None,
    }
  }

  pub fn name(&self) -> Option<&str> {
    self.options.name.as_deref()
  }

  pub fn options(&self) -> &ChunkGroupOptions {
    &self.options
  }

  pub fn kind(&self) -> ChunkGroupKind {
    self.kind
  }

  /// Whether this group's chunks are loaded as part of the initial page
  /// load. Only entrypoints are initial.
  pub fn is_initial(&self) -> bool {
    self.kind == ChunkGroupKind::Entrypoint
  }

  pub fn group_debug_id(&self) -> u32 {
    self.group_debug_id
  }

  /// Derived debug id: the joined debug ids of the constituent chunks.
  pub fn debug_id(&self) -> String {
    let ids: Vec<String> = self.chunks.iter().map(|c| c.debug_id().to_string()).collect();
    ids.join("+")
  }

  pub fn chunks(&self) -> &[ChunkId] {
    &self.chunks
  }

  pub fn blocks(&self) -> &IndexSet<BlockId> {
    &self.blocks
  }

  pub fn origins(&self) -> &[OriginRecord] {
    &self.origins
  }

  pub fn add_origin(&mut self, origin: OriginRecord) {
    self.origins.push(origin);
  }

  /// The chunk carrying the bootstrap runtime for this group, when initial.
  pub fn runtime_chunk(&self) -> Option<ChunkId> {
    self.runtime_chunk.or_else(|| self.chunks.first().copied())
  }

  pub(crate) fn unshift_chunk(&mut self, chunk: ChunkId) -> bool {
    if self.chunks.contains(&chunk) {
      return false;
    }
    self.chunks.insert(0, chunk);
    true
  }

  pub(crate) fn push_chunk(&mut self, chunk: ChunkId) -> bool {
    if self.chunks.contains(&chunk) {
      return false;
    }
    self.chunks.push(chunk);
    true
  }

  /// Inserts `chunk` immediately before `before`. If `chunk` is already
  /// present at a later position it is moved forward; an earlier position is
  /// left untouched.
  ///
  /// # Panics
  ///
  /// Panics when `before` is not part of this group.
  pub(crate) fn insert_chunk(&mut self, chunk: ChunkId, before: ChunkId) {
    let idx = self
      .chunks
      .iter()
      .position(|c| *c == before)
      .unwrap_or_else(|| {
        panic!("ChunkGroup.insert_chunk: cannot insert before a chunk that is not in the group")
      });
    match self.chunks.iter().position(|c| *c == chunk) {
      Some(old_idx) if old_idx > idx => {
        self.chunks.remove(old_idx);
        self.chunks.insert(idx, chunk);
      }
      Some(_) => {}
      None => {
        self.chunks.insert(idx, chunk);
      }
    }
  }

  /// Replaces `old` with `new`, keeping positions unambiguous: when `new` is
  /// already present, the earlier-positioned occurrence wins and the later
  /// duplicate is dropped.
  pub(crate) fn replace_chunk(&mut self, old: ChunkId, new: ChunkId) -> bool {
    let Some(old_idx) = self.chunks.iter().position(|c| *c == old) else {
      return false;
    };
    match self.chunks.iter().position(|c| *c == new) {
      None => {
        self.chunks[old_idx] = new;
        true
      }
      Some(new_idx) if new_idx < old_idx => {
        self.chunks.remove(old_idx);
        true
      }
      Some(new_idx) if new_idx > old_idx => {
        self.chunks[old_idx] = new;
        self.chunks.remove(new_idx);
        true
      }
      Some(_) => false,
    }
  }

  pub(crate) fn remove_chunk(&mut self, chunk: ChunkId) -> bool {
    match self.chunks.iter().position(|c| *c == chunk) {
      Some(idx) => {
        self.chunks.remove(idx);
        true
      }
      None => false,
    }
  }
}
