use std::cmp::Ordering;
use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use petgraph::prelude::StableDiGraph;
use petgraph::Direction;
use tracing::debug;

use crate::chunk::{Chunk, ChunkId, ChunkSizeOptions};
use crate::chunk_combination::{ChunkCombinations, CombinationId};
use crate::chunk_group::{
  BlockId, ChunkGroup, ChunkGroupId, ChunkGroupKind, ChunkGroupOptions, OriginRecord,
};
use crate::error::ConstraintViolation;
use crate::module::{Module, ModuleId, SourceType};
use crate::sortable_set::{SortTag, SortableSet};

mod manifest;
pub use manifest::{ChunkMaps, ChunkModuleMaps};

/// Per-module chunk-graph state.
#[derive(Debug)]
struct ChunkGraphModule {
  /// Chunks this module is placed in.
  chunks: SortableSet<ChunkId>,
  /// Interned canonical representation of `chunks`, maintained on every
  /// connect/disconnect. Identity comparison of two modules' combinations is
  /// the "same chunk set" test.
  combination: CombinationId,
  /// Chunks where this module is the designated entry module.
  entry_in_chunks: IndexSet<ChunkId>,
  /// Chunks where this module is a runtime module.
  runtime_in_chunks: IndexSet<ChunkId>,
  id: Option<String>,
  hash: Option<String>,
  rendered_hash: Option<String>,
  runtime_requirements: IndexSet<String>,
}

impl ChunkGraphModule {
  fn new() -> Self {
    Self {
      chunks: SortableSet::with_default_order("chunk_debug_id", |a: &ChunkId, b| a.cmp(b)),
      combination: CombinationId::EMPTY,
      entry_in_chunks: IndexSet::new(),
      runtime_in_chunks: IndexSet::new(),
      id: None,
      hash: None,
      rendered_hash: None,
      runtime_requirements: IndexSet::new(),
    }
  }
}

/// Per-chunk chunk-graph state.
#[derive(Debug)]
struct ChunkGraphChunk {
  modules: SortableSet<ModuleId>,
  groups: IndexSet<ChunkGroupId>,
  /// Entry modules and the chunk group that owns each of them. A module can
  /// be a plain member of most chunks and the entry module of one.
  entry_modules: IndexMap<ModuleId, ChunkGroupId>,
  runtime_modules: IndexSet<ModuleId>,
  runtime_requirements: IndexSet<String>,
}

impl ChunkGraphChunk {
  fn new() -> Self {
    Self {
      modules: SortableSet::new(),
      groups: IndexSet::new(),
      entry_modules: IndexMap::new(),
      runtime_modules: IndexSet::new(),
      runtime_requirements: IndexSet::new(),
    }
  }
}

/// The authoritative bidirectional index between modules and chunks, plus
/// the chunk-group loading-order DAG and all per-entity metadata.
///
/// This is the *only* store: `Chunk`, `ChunkGroup` and `Module` records carry
/// no adjacency of their own, and the paired connect/disconnect/replace
/// primitives below are the only mutation surface. The two sides of the
/// index therefore cannot drift out of sync.
///
/// Debug-id counters are owned by the graph (chunks start at 1000, groups at
/// 5000), so independent graphs never share counter state.
pub struct ChunkGraph {
  modules: IndexMap<ModuleId, Module>,
  module_index: IndexMap<ModuleId, ChunkGraphModule>,
  chunks: IndexMap<ChunkId, Chunk>,
  chunk_index: IndexMap<ChunkId, ChunkGraphChunk>,
  named_chunks: HashMap<String, ChunkId>,
  /// Loading-order DAG: edge = parent group → child group. One edge serves
  /// both directions of the parent/child relation.
  groups: StableDiGraph<ChunkGroup, ()>,
  block_to_group: IndexMap<BlockId, ChunkGroupId>,
  combinations: ChunkCombinations,
  next_chunk_debug_id: u32,
  next_group_debug_id: u32,
  next_module_id: u32,
  next_block_id: u32,
}

impl Default for ChunkGraph {
  fn default() -> Self {
    Self::new()
  }
}

impl ChunkGraph {
  pub fn new() -> Self {
    Self {
      modules: IndexMap::new(),
      module_index: IndexMap::new(),
      chunks: IndexMap::new(),
      chunk_index: IndexMap::new(),
      named_chunks: HashMap::new(),
      groups: StableDiGraph::new(),
      block_to_group: IndexMap::new(),
      combinations: ChunkCombinations::new(),
      next_chunk_debug_id: 1000,
      next_group_debug_id: 5000,
      next_module_id: 0,
      next_block_id: 0,
    }
  }

  // --- registration -------------------------------------------------------

  pub fn add_module(&mut self, module: Module) -> ModuleId {
    let id = ModuleId(self.next_module_id);
    self.next_module_id += 1;
    self.modules.insert(id, module);
    self.module_index.insert(id, ChunkGraphModule::new());
    id
  }

  /// Creates a chunk. A named chunk is created once: asking again for the
  /// same name returns the existing chunk.
  pub fn add_chunk(&mut self, name: Option<&str>) -> ChunkId {
    if let Some(name) = name {
      if let Some(&existing) = self.named_chunks.get(name) {
        return existing;
      }
    }
    let id = ChunkId(self.next_chunk_debug_id);
    self.next_chunk_debug_id += 1;
    let chunk = Chunk {
      name: name.map(str::to_owned),
      ..Chunk::default()
    };
    self.chunks.insert(id, chunk);
    self.chunk_index.insert(id, ChunkGraphChunk::new());
    if let Some(name) = name {
      self.named_chunks.insert(name.to_owned(), id);
    }
    id
  }

  pub fn create_chunk_group(
    &mut self,
    kind: ChunkGroupKind,
    options: ChunkGroupOptions,
  ) -> ChunkGroupId {
    let debug_id = self.next_group_debug_id;
    self.next_group_debug_id += 1;
    self.groups.add_node(ChunkGroup::new(kind, options, debug_id))
  }

  pub fn create_entrypoint(&mut self, name: &str) -> ChunkGroupId {
    self.create_chunk_group(
      ChunkGroupKind::Entrypoint,
      ChunkGroupOptions {
        name: Some(name.to_owned()),
        ..Default::default()
      },
    )
  }

  pub fn alloc_block(&mut self) -> BlockId {
    let id = BlockId(self.next_block_id);
    self.next_block_id += 1;
    id
  }

  // --- accessors -----------------------------------------------------------

  /// # Panics
  ///
  /// Panics when the module was never registered with this graph.
  pub fn module(&self, module: ModuleId) -> &Module {
    self
      .modules
      .get(&module)
      .unwrap_or_else(|| panic!("{module} is not registered with this ChunkGraph"))
  }

  /// # Panics
  ///
  /// Panics when the chunk was never created by this graph.
  pub fn chunk(&self, chunk: ChunkId) -> &Chunk {
    self
      .chunks
      .get(&chunk)
      .unwrap_or_else(|| panic!("{chunk} is not registered with this ChunkGraph"))
  }

  /// # Panics
  ///
  /// Panics when the group does not exist (anymore) in this graph.
  pub fn group(&self, group: ChunkGroupId) -> &ChunkGroup {
    self
      .groups
      .node_weight(group)
      .unwrap_or_else(|| panic!("chunk group {group:?} is not registered with this ChunkGraph"))
  }

  fn group_mut(&mut self, group: ChunkGroupId) -> &mut ChunkGroup {
    self
      .groups
      .node_weight_mut(group)
      .unwrap_or_else(|| panic!("chunk group {group:?} is not registered with this ChunkGraph"))
  }

  pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
    self.modules.keys().copied()
  }

  pub fn chunk_ids(&self) -> impl Iterator<Item = ChunkId> + '_ {
    self.chunks.keys().copied()
  }

  pub fn group_ids(&self) -> impl Iterator<Item = ChunkGroupId> + '_ {
    self.groups.node_indices()
  }

  pub fn get_named_chunk(&self, name: &str) -> Option<ChunkId> {
    self.named_chunks.get(name).copied()
  }

  pub fn combinations(&self) -> &ChunkCombinations {
    &self.combinations
  }

  // --- module <-> chunk ----------------------------------------------------

  /// Connects both directions. Returns `false` (no-op) when already
  /// connected.
  pub fn connect_chunk_and_module(&mut self, chunk: ChunkId, module: ModuleId) -> bool {
    let Self {
      module_index,
      chunk_index,
      combinations,
      ..
    } = self;
    let cgm = module_index
      .get_mut(&module)
      .unwrap_or_else(|| panic!("{module} is not registered with this ChunkGraph"));
    if cgm.chunks.contains(&chunk) {
      return false;
    }
    cgm.chunks.add(chunk);
    cgm.combination = combinations.with(cgm.combination, chunk);
    chunk_index
      .get_mut(&chunk)
      .unwrap_or_else(|| panic!("{chunk} is not registered with this ChunkGraph"))
      .modules
      .add(module);
    true
  }

  /// Removes both directions unconditionally.
  pub fn disconnect_chunk_and_module(&mut self, chunk: ChunkId, module: ModuleId) {
    let Self {
      module_index,
      chunk_index,
      combinations,
      ..
    } = self;
    let cgm = module_index
      .get_mut(&module)
      .unwrap_or_else(|| panic!("{module} is not registered with this ChunkGraph"));
    if cgm.chunks.delete(&chunk) {
      cgm.combination = combinations.without(cgm.combination, chunk);
    }
    if let Some(cgc) = chunk_index.get_mut(&chunk) {
      cgc.modules.delete(&module);
    }
  }

  /// Full teardown: removes the chunk from every module that referenced it,
  /// clears its module/entry/runtime sets and detaches it from its groups.
  pub fn disconnect_chunk(&mut self, chunk: ChunkId) {
    let modules: Vec<ModuleId> = self.chunk_index[&chunk].modules.iter().copied().collect();
    for module in modules {
      self.disconnect_chunk_and_module(chunk, module);
    }
    let entries: Vec<ModuleId> = self.chunk_index[&chunk].entry_modules.keys().copied().collect();
    for module in entries {
      self.disconnect_chunk_and_entry_module(chunk, module);
    }
    let runtimes: Vec<ModuleId> = self.chunk_index[&chunk].runtime_modules.iter().copied().collect();
    for module in runtimes {
      self.disconnect_chunk_and_runtime_module(chunk, module);
    }
    let groups: Vec<ChunkGroupId> = self.chunk_index[&chunk].groups.iter().copied().collect();
    for group in groups {
      self.group_mut(group).remove_chunk(chunk);
    }
    self.chunk_index.get_mut(&chunk).unwrap().groups.clear();
  }

  /// Disconnects the chunk everywhere and drops it from the graph.
  pub fn remove_chunk(&mut self, chunk: ChunkId) {
    self.disconnect_chunk(chunk);
    if let Some(record) = self.chunks.shift_remove(&chunk) {
      if let Some(name) = record.name {
        if self.named_chunks.get(&name) == Some(&chunk) {
          self.named_chunks.remove(&name);
        }
      }
    }
    self.chunk_index.shift_remove(&chunk);
  }

  /// Re-points every chunk containing `old` to contain `new` instead,
  /// preserving entry/runtime roles, then clears all of `old`'s
  /// associations. Used when module dedup/concatenation replaces one module
  /// object with another without losing chunk placement.
  pub fn replace_module(&mut self, old: ModuleId, new: ModuleId) {
    let chunks: Vec<ChunkId> = self.module_index[&old].chunks.iter().copied().collect();
    for chunk in chunks {
      self.disconnect_chunk_and_module(chunk, old);
      self.connect_chunk_and_module(chunk, new);
    }
    let entry_chunks: Vec<ChunkId> =
      self.module_index[&old].entry_in_chunks.iter().copied().collect();
    for chunk in entry_chunks {
      let group = self.chunk_index[&chunk].entry_modules[&old];
      self.disconnect_chunk_and_entry_module(chunk, old);
      self.connect_chunk_and_entry_module(chunk, new, group);
    }
    let runtime_chunks: Vec<ChunkId> =
      self.module_index[&old].runtime_in_chunks.iter().copied().collect();
    for chunk in runtime_chunks {
      self.disconnect_chunk_and_runtime_module(chunk, old);
      self.connect_chunk_and_runtime_module(chunk, new);
    }
  }

  // --- entry/runtime module tracking ---------------------------------------

  pub fn connect_chunk_and_entry_module(
    &mut self,
    chunk: ChunkId,
    module: ModuleId,
    group: ChunkGroupId,
  ) {
    self
      .module_index
      .get_mut(&module)
      .unwrap_or_else(|| panic!("{module} is not registered with this ChunkGraph"))
      .entry_in_chunks
      .insert(chunk);
    self
      .chunk_index
      .get_mut(&chunk)
      .unwrap_or_else(|| panic!("{chunk} is not registered with this ChunkGraph"))
      .entry_modules
      .insert(module, group);
  }

  pub fn disconnect_chunk_and_entry_module(&mut self, chunk: ChunkId, module: ModuleId) {
    if let Some(cgm) = self.module_index.get_mut(&module) {
      cgm.entry_in_chunks.shift_remove(&chunk);
    }
    if let Some(cgc) = self.chunk_index.get_mut(&chunk) {
      cgc.entry_modules.shift_remove(&module);
    }
  }

  pub fn connect_chunk_and_runtime_module(&mut self, chunk: ChunkId, module: ModuleId) {
    self
      .module_index
      .get_mut(&module)
      .unwrap_or_else(|| panic!("{module} is not registered with this ChunkGraph"))
      .runtime_in_chunks
      .insert(chunk);
    self
      .chunk_index
      .get_mut(&chunk)
      .unwrap_or_else(|| panic!("{chunk} is not registered with this ChunkGraph"))
      .runtime_modules
      .insert(module);
  }

  pub fn disconnect_chunk_and_runtime_module(&mut self, chunk: ChunkId, module: ModuleId) {
    if let Some(cgm) = self.module_index.get_mut(&module) {
      cgm.runtime_in_chunks.shift_remove(&chunk);
    }
    if let Some(cgc) = self.chunk_index.get_mut(&chunk) {
      cgc.runtime_modules.shift_remove(&module);
    }
  }

  pub fn get_number_of_chunk_entry_modules(&self, chunk: ChunkId) -> usize {
    self.chunk_index[&chunk].entry_modules.len()
  }

  pub fn has_chunk_entry_modules(&self, chunk: ChunkId) -> bool {
    !self.chunk_index[&chunk].entry_modules.is_empty()
  }

  pub fn get_chunk_entry_modules_with_group(
    &self,
    chunk: ChunkId,
  ) -> impl Iterator<Item = (ModuleId, ChunkGroupId)> + '_ {
    self.chunk_index[&chunk]
      .entry_modules
      .iter()
      .map(|(m, g)| (*m, *g))
  }

  pub fn get_chunk_runtime_modules(&self, chunk: ChunkId) -> impl Iterator<Item = ModuleId> + '_ {
    self.chunk_index[&chunk].runtime_modules.iter().copied()
  }

  // --- membership queries ---------------------------------------------------

  pub fn is_module_in_chunk(&self, module: ModuleId, chunk: ChunkId) -> bool {
    self.module_index[&module].chunks.contains(&chunk)
  }

  pub fn get_module_chunks(&self, module: ModuleId) -> Vec<ChunkId> {
    self.module_index[&module].chunks.iter().copied().collect()
  }

  pub fn get_module_chunks_iterable(&self, module: ModuleId) -> impl Iterator<Item = ChunkId> + '_ {
    self.module_index[&module].chunks.iter().copied()
  }

  pub fn get_chunk_modules(&self, chunk: ChunkId) -> Vec<ModuleId> {
    self.chunk_index[&chunk].modules.iter().copied().collect()
  }

  pub fn get_chunk_modules_iterable(&self, chunk: ChunkId) -> impl Iterator<Item = ModuleId> + '_ {
    self.chunk_index[&chunk].modules.iter().copied()
  }

  pub fn get_number_of_module_chunks(&self, module: ModuleId) -> usize {
    self.module_index[&module].chunks.len()
  }

  pub fn get_number_of_chunk_modules(&self, chunk: ChunkId) -> usize {
    self.chunk_index[&chunk].modules.len()
  }

  /// The interned canonical representation of the module's chunk set. Two
  /// modules with the same combination sit in exactly the same chunks.
  pub fn get_module_chunks_combination(&self, module: ModuleId) -> CombinationId {
    self.module_index[&module].combination
  }

  /// The chunk's modules, sorted by module identifier (the stable order
  /// codegen consumes). The sort is memoized inside the set.
  pub fn get_ordered_chunk_modules(&mut self, chunk: ChunkId) -> Vec<ModuleId> {
    self.get_chunk_modules_sorted(chunk, "module_identifier", |a, b| {
      a.identifier.cmp(&b.identifier)
    })
  }

  /// The chunk's modules under a caller-supplied order over the module
  /// records. `tag` names the order so repeated asks with the same tag skip
  /// the sort.
  pub fn get_chunk_modules_sorted(
    &mut self,
    chunk: ChunkId,
    tag: SortTag,
    mut cmp: impl FnMut(&Module, &Module) -> Ordering,
  ) -> Vec<ModuleId> {
    let Self {
      modules,
      chunk_index,
      ..
    } = self;
    let cgc = chunk_index
      .get_mut(&chunk)
      .unwrap_or_else(|| panic!("{chunk} is not registered with this ChunkGraph"));
    cgc
      .modules
      .sort_with(tag, |a, b| cmp(&modules[a], &modules[b]));
    cgc.modules.iter().copied().collect()
  }

  /// True iff the two modules are placed in exactly the same chunk set.
  pub fn have_modules_equal_chunks(&mut self, a: ModuleId, b: ModuleId) -> bool {
    if self.module_index[&a].combination == self.module_index[&b].combination {
      return true;
    }
    // Combinations are canonical, so a miss means the sets differ; confirm
    // with the direct lockstep walk over both debug-id-sorted sets.
    if self.module_index[&a].chunks.len() != self.module_index[&b].chunks.len() {
      return false;
    }
    let sorted = |this: &mut Self, m: ModuleId| -> Vec<ChunkId> {
      let cgm = this.module_index.get_mut(&m).unwrap();
      cgm.chunks.sort();
      cgm.chunks.iter().copied().collect()
    };
    sorted(self, a) == sorted(self, b)
  }

  // --- group membership and derived chunk queries ---------------------------

  /// Adds the chunk at the end of the group and registers the group on the
  /// chunk. No-op when already a member.
  pub fn connect_chunk_group_and_chunk(&mut self, group: ChunkGroupId, chunk: ChunkId) {
    if self.group_mut(group).push_chunk(chunk) {
      self
        .chunk_index
        .get_mut(&chunk)
        .unwrap_or_else(|| panic!("{chunk} is not registered with this ChunkGraph"))
        .groups
        .insert(group);
    }
  }

  /// Like [`ChunkGraph::connect_chunk_group_and_chunk`], but places the chunk
  /// at the front of the group so it loads before every existing member.
  /// Entrypoints use this to pull a runtime chunk ahead of their own chunk.
  pub fn unshift_chunk_group_and_chunk(&mut self, group: ChunkGroupId, chunk: ChunkId) {
    if self.group_mut(group).unshift_chunk(chunk) {
      self
        .chunk_index
        .get_mut(&chunk)
        .unwrap_or_else(|| panic!("{chunk} is not registered with this ChunkGraph"))
        .groups
        .insert(group);
    }
  }

  pub fn chunk_groups(&self, chunk: ChunkId) -> impl Iterator<Item = ChunkGroupId> + '_ {
    self.chunk_index[&chunk].groups.iter().copied()
  }

  pub fn get_number_of_chunk_groups(&self, chunk: ChunkId) -> usize {
    self.chunk_index[&chunk].groups.len()
  }

  /// Whether this chunk carries the bootstrap runtime. Runtime-ness is
  /// group-invariant by construction, so only the first group is consulted.
  pub fn has_runtime(&self, chunk: ChunkId) -> bool {
    match self.chunk_index[&chunk].groups.first() {
      Some(&group) => {
        let group = self.group(group);
        group.is_initial() && group.runtime_chunk() == Some(chunk)
      }
      None => false,
    }
  }

  pub fn can_be_initial(&self, chunk: ChunkId) -> bool {
    self
      .chunk_groups(chunk)
      .any(|g| self.group(g).is_initial())
  }

  pub fn is_only_initial(&self, chunk: ChunkId) -> bool {
    let cgc = &self.chunk_index[&chunk];
    !cgc.groups.is_empty() && cgc.groups.iter().all(|g| self.group(*g).is_initial())
  }

  pub fn set_group_runtime_chunk(&mut self, group: ChunkGroupId, chunk: ChunkId) {
    self.group_mut(group).runtime_chunk = Some(chunk);
  }

  pub fn add_group_origin(&mut self, group: ChunkGroupId, origin: OriginRecord) {
    self.group_mut(group).add_origin(origin);
  }

  // --- group DAG -------------------------------------------------------------

  /// Establishes the parent→child loading-order edge. Both directions of the
  /// relation are served by the single edge, so mirroring is structural.
  pub fn connect_group_parent_and_child(&mut self, parent: ChunkGroupId, child: ChunkGroupId) {
    self.groups.update_edge(parent, child, ());
  }

  pub fn remove_group_child(&mut self, parent: ChunkGroupId, child: ChunkGroupId) -> bool {
    match self.groups.find_edge(parent, child) {
      Some(edge) => {
        self.groups.remove_edge(edge);
        true
      }
      None => false,
    }
  }

  /// Removes the child→parent relation; identical to removing the parent's
  /// child edge, spelled from the child's point of view.
  pub fn remove_group_parent(&mut self, child: ChunkGroupId, parent: ChunkGroupId) -> bool {
    self.remove_group_child(parent, child)
  }

  pub fn group_has_child(&self, parent: ChunkGroupId, child: ChunkGroupId) -> bool {
    self.groups.find_edge(parent, child).is_some()
  }

  pub fn group_parents(&self, group: ChunkGroupId) -> Vec<ChunkGroupId> {
    self.groups.neighbors_directed(group, Direction::Incoming).collect()
  }

  pub fn group_children(&self, group: ChunkGroupId) -> Vec<ChunkGroupId> {
    self.groups.neighbors_directed(group, Direction::Outgoing).collect()
  }

  /// Splices a group out of the DAG: every child is reparented onto every
  /// parent (so removing an interior group never orphans its descendants),
  /// block associations are dropped and the group is detached from its
  /// chunks.
  pub fn remove_group(&mut self, group: ChunkGroupId) {
    let parents = self.group_parents(group);
    let children = self.group_children(group);
    for &parent in &parents {
      for &child in &children {
        self.groups.update_edge(parent, child, ());
      }
    }
    let chunks = self.group(group).chunks().to_vec();
    for chunk in chunks {
      if let Some(cgc) = self.chunk_index.get_mut(&chunk) {
        cgc.groups.shift_remove(&group);
      }
    }
    let blocks: Vec<BlockId> = self.group(group).blocks().iter().copied().collect();
    for block in blocks {
      self.block_to_group.shift_remove(&block);
    }
    debug!(group = ?group, reparented_children = children.len(), "removing chunk group");
    self.groups.remove_node(group);
  }

  // --- async dependency blocks ------------------------------------------------

  /// Associates a block with the group it resolves to. A block maps to at
  /// most one group; reconnecting re-points it.
  pub fn connect_block_and_chunk_group(&mut self, block: BlockId, group: ChunkGroupId) {
    if let Some(previous) = self.block_to_group.insert(block, group) {
      if previous != group {
        self.group_mut(previous).blocks.shift_remove(&block);
      }
    }
    self.group_mut(group).blocks.insert(block);
  }

  pub fn get_block_chunk_group(&self, block: BlockId) -> Option<ChunkGroupId> {
    self.block_to_group.get(&block).copied()
  }

  // --- sizes -------------------------------------------------------------------

  /// Sum of the sizes of the chunk's modules. Memoized; order-insensitive,
  /// so the cache survives re-sorts.
  pub fn get_chunk_modules_size(&self, chunk: ChunkId) -> f64 {
    let cgc = &self.chunk_index[&chunk];
    let modules = &self.modules;
    cgc
      .modules
      .get_from_unordered_cache("chunk_modules_size", |items| {
        items.iter().map(|m| modules[m].size).sum::<f64>()
      })
  }

  pub fn get_chunk_size(&self, chunk: ChunkId, options: ChunkSizeOptions) -> f64 {
    let multiplier = if self.can_be_initial(chunk) {
      options.entry_chunk_multiplicator
    } else {
      1.0
    };
    self.get_chunk_modules_size(chunk) * multiplier + options.chunk_overhead
  }

  /// The size the merged chunk would have, without mutating anything. Used
  /// purely for scoring "would merging help".
  pub fn get_integrated_chunks_size(
    &self,
    a: ChunkId,
    b: ChunkId,
    options: ChunkSizeOptions,
  ) -> f64 {
    let mut size = self.get_chunk_modules_size(a);
    let a_modules = &self.chunk_index[&a].modules;
    for module in self.chunk_index[&b].modules.iter() {
      if !a_modules.contains(module) {
        size += self.modules[module].size;
      }
    }
    let multiplier = if self.can_be_initial(a) || self.can_be_initial(b) {
      options.entry_chunk_multiplicator
    } else {
      1.0
    };
    size * multiplier + options.chunk_overhead
  }

  // --- integration ----------------------------------------------------------------

  /// True when `available` is loaded on every path that leads to `chunk`:
  /// walking `chunk`'s group ancestry, each branch either passes a group
  /// containing `available` or would reach an initial group without it (in
  /// which case the answer is no).
  fn is_available_chunk(&self, available: ChunkId, chunk: ChunkId) -> bool {
    let mut queue: IndexSet<ChunkGroupId> = self.chunk_groups(chunk).collect();
    let mut i = 0;
    while i < queue.len() {
      let group = *queue.get_index(i).unwrap();
      i += 1;
      if self.group(group).chunks().contains(&available) {
        continue;
      }
      if self.group(group).is_initial() {
        return false;
      }
      for parent in self.group_parents(group) {
        queue.insert(parent);
      }
    }
    true
  }

  pub fn can_chunks_be_integrated(&self, a: ChunkId, b: ChunkId) -> bool {
    if self.chunk(a).prevent_integration || self.chunk(b).prevent_integration {
      return false;
    }
    let runtime_a = self.has_runtime(a);
    let runtime_b = self.has_runtime(b);
    if runtime_a != runtime_b {
      // Merging a runtime chunk with a plain one is only safe when the
      // runtime chunk is unconditionally loaded before the other.
      return if runtime_a {
        self.is_available_chunk(a, b)
      } else {
        self.is_available_chunk(b, a)
      };
    }
    if self.has_chunk_entry_modules(a) || self.has_chunk_entry_modules(b) {
      return false;
    }
    true
  }

  /// Merges `b` fully into `a`: moves every module (plain, entry and
  /// runtime), reassigns every group and resolves the merged name
  /// deterministically. Afterwards `b` has no modules and no groups; callers
  /// usually follow up with [`ChunkGraph::remove_chunk`].
  ///
  /// Name resolution: when both chunks have entry modules or neither does,
  /// the shorter name wins (ties lexicographically); when only `b` has entry
  /// modules its name wins outright, entry-chunk names being the more
  /// meaningful ones.
  pub fn integrate_chunks(&mut self, a: ChunkId, b: ChunkId) {
    let name_a = self.chunk(a).name.clone();
    let name_b = self.chunk(b).name.clone();
    let entries_a = self.has_chunk_entry_modules(a);
    let entries_b = self.has_chunk_entry_modules(b);
    let merged_name = match (name_a, name_b) {
      (Some(na), Some(nb)) => {
        if entries_a == entries_b {
          if na.len() != nb.len() {
            Some(if na.len() < nb.len() { na } else { nb })
          } else {
            Some(if na < nb { na } else { nb })
          }
        } else if entries_b {
          Some(nb)
        } else {
          Some(na)
        }
      }
      (None, Some(nb)) => Some(nb),
      (name_a, None) => name_a,
    };
    self.set_chunk_name(a, merged_name);

    let groups: Vec<ChunkGroupId> = self.chunk_index[&b].groups.iter().copied().collect();
    for group in groups {
      self.group_mut(group).replace_chunk(b, a);
      self.chunk_index.get_mut(&a).unwrap().groups.insert(group);
      self.chunk_index.get_mut(&b).unwrap().groups.shift_remove(&group);
    }

    let modules: Vec<ModuleId> = self.chunk_index[&b].modules.iter().copied().collect();
    for module in modules {
      self.disconnect_chunk_and_module(b, module);
      self.connect_chunk_and_module(a, module);
    }

    let entry_modules: Vec<(ModuleId, ChunkGroupId)> =
      self.get_chunk_entry_modules_with_group(b).collect();
    for (module, group) in entry_modules {
      self.disconnect_chunk_and_entry_module(b, module);
      self.connect_chunk_and_entry_module(a, module, group);
    }

    let runtime_modules: Vec<ModuleId> =
      self.chunk_index[&b].runtime_modules.iter().copied().collect();
    for module in runtime_modules {
      self.disconnect_chunk_and_runtime_module(b, module);
      self.connect_chunk_and_runtime_module(a, module);
    }
    debug!(into = %a, from = %b, "integrated chunks");
  }

  /// The split primitive: wires `new_chunk` into every group this chunk
  /// belongs to, immediately *before* this chunk, so the extracted chunk
  /// loads first.
  pub fn split_chunk(&mut self, chunk: ChunkId, new_chunk: ChunkId) {
    let groups: Vec<ChunkGroupId> = self.chunk_index[&chunk].groups.iter().copied().collect();
    for group in groups {
      self.group_mut(group).insert_chunk(new_chunk, chunk);
      self
        .chunk_index
        .get_mut(&new_chunk)
        .unwrap_or_else(|| panic!("{new_chunk} is not registered with this ChunkGraph"))
        .groups
        .insert(group);
    }
  }

  /// Total, deterministic chunk order: chunks with more modules sort first;
  /// ties are broken by comparing the sorted module-identifier sequences.
  /// At the first divergence the lexicographically later sequence counts as
  /// less.
  pub fn compare_chunks(&mut self, a: ChunkId, b: ChunkId) -> Ordering {
    let count_a = self.get_number_of_chunk_modules(a);
    let count_b = self.get_number_of_chunk_modules(b);
    if count_a != count_b {
      return count_b.cmp(&count_a);
    }
    let modules_a = self.get_ordered_chunk_modules(a);
    let modules_b = self.get_ordered_chunk_modules(b);
    for (x, y) in modules_a.iter().zip(&modules_b) {
      let ix = &self.modules[x].identifier;
      let iy = &self.modules[y].identifier;
      match ix.cmp(iy) {
        Ordering::Equal => continue,
        Ordering::Greater => return Ordering::Less,
        Ordering::Less => return Ordering::Greater,
      }
    }
    Ordering::Equal
  }

  // --- per-entity metadata ------------------------------------------------------

  pub fn set_module_id(&mut self, module: ModuleId, id: impl Into<String>) {
    self.module_index.get_mut(&module).unwrap().id = Some(id.into());
  }

  pub fn get_module_id(&self, module: ModuleId) -> Option<&str> {
    self.module_index[&module].id.as_deref()
  }

  pub fn set_module_hashes(
    &mut self,
    module: ModuleId,
    hash: impl Into<String>,
    rendered_hash: impl Into<String>,
  ) {
    let cgm = self.module_index.get_mut(&module).unwrap();
    cgm.hash = Some(hash.into());
    cgm.rendered_hash = Some(rendered_hash.into());
  }

  pub fn get_module_hash(&self, module: ModuleId) -> Option<&str> {
    self.module_index[&module].hash.as_deref()
  }

  pub fn get_module_rendered_hash(&self, module: ModuleId) -> Option<&str> {
    self.module_index[&module].rendered_hash.as_deref()
  }

  pub fn add_module_runtime_requirements<I>(&mut self, module: ModuleId, items: I)
  where
    I: IntoIterator<Item = String>,
  {
    self
      .module_index
      .get_mut(&module)
      .unwrap()
      .runtime_requirements
      .extend(items);
  }

  pub fn get_module_runtime_requirements(&self, module: ModuleId) -> &IndexSet<String> {
    &self.module_index[&module].runtime_requirements
  }

  pub fn add_chunk_runtime_requirements<I>(&mut self, chunk: ChunkId, items: I)
  where
    I: IntoIterator<Item = String>,
  {
    self
      .chunk_index
      .get_mut(&chunk)
      .unwrap()
      .runtime_requirements
      .extend(items);
  }

  pub fn get_chunk_runtime_requirements(&self, chunk: ChunkId) -> &IndexSet<String> {
    &self.chunk_index[&chunk].runtime_requirements
  }

  pub fn set_chunk_id(&mut self, chunk: ChunkId, id: impl Into<String>) {
    self.chunks.get_mut(&chunk).unwrap().id = Some(id.into());
  }

  pub fn set_chunk_hashes(
    &mut self,
    chunk: ChunkId,
    hash: impl Into<String>,
    rendered_hash: impl Into<String>,
  ) {
    let record = self.chunks.get_mut(&chunk).unwrap();
    record.hash = Some(hash.into());
    record.rendered_hash = Some(rendered_hash.into());
  }

  pub fn set_chunk_content_hash(
    &mut self,
    chunk: ChunkId,
    source_type: SourceType,
    hash: impl Into<String>,
  ) {
    self
      .chunks
      .get_mut(&chunk)
      .unwrap()
      .content_hash
      .insert(source_type, hash.into());
  }

  pub fn set_chunk_reason(&mut self, chunk: ChunkId, reason: impl Into<String>) {
    self.chunks.get_mut(&chunk).unwrap().chunk_reason = Some(reason.into());
  }

  pub fn set_chunk_filename_template(&mut self, chunk: ChunkId, template: impl Into<String>) {
    self.chunks.get_mut(&chunk).unwrap().filename_template = Some(template.into());
  }

  pub fn set_prevent_integration(&mut self, chunk: ChunkId, prevent: bool) {
    self.chunks.get_mut(&chunk).unwrap().prevent_integration = prevent;
  }

  fn set_chunk_name(&mut self, chunk: ChunkId, name: Option<String>) {
    let old = self.chunks[&chunk].name.clone();
    if old == name {
      return;
    }
    if let Some(old) = old {
      if self.named_chunks.get(&old) == Some(&chunk) {
        self.named_chunks.remove(&old);
      }
    }
    if let Some(name) = &name {
      self.named_chunks.insert(name.clone(), chunk);
    }
    self.chunks.get_mut(&chunk).unwrap().name = name;
  }

  /// Derived group id: the joined output ids of the constituent chunks
  /// (debug ids where no output id is assigned yet).
  pub fn get_chunk_group_id(&self, group: ChunkGroupId) -> String {
    let parts: Vec<String> = self
      .group(group)
      .chunks()
      .iter()
      .map(|c| {
        self
          .chunk(*c)
          .id
          .clone()
          .unwrap_or_else(|| c.debug_id().to_string())
      })
      .collect();
    parts.join("+")
  }

  // --- invariants -----------------------------------------------------------------

  /// Validates the cross-index invariants. Test/debug affordance; never part
  /// of the production hot path.
  pub fn check_constraints(&self) -> Result<(), ConstraintViolation> {
    for (module, cgm) in &self.module_index {
      for chunk in cgm.chunks.iter() {
        if !self.chunk_index[chunk].modules.contains(module) {
          return Err(ConstraintViolation(format!(
            "{module} lists {chunk} but the chunk does not list the module"
          )));
        }
      }
      let combination = self.combinations.chunks(cgm.combination);
      if combination.len() != cgm.chunks.len()
        || !cgm.chunks.iter().all(|c| combination.contains(c))
      {
        return Err(ConstraintViolation(format!(
          "{module} chunk combination is out of sync with its chunk set"
        )));
      }
      for chunk in &cgm.entry_in_chunks {
        if !self.chunk_index[chunk].entry_modules.contains_key(module) {
          return Err(ConstraintViolation(format!(
            "{module} is entry in {chunk} but the chunk does not record it"
          )));
        }
      }
      for chunk in &cgm.runtime_in_chunks {
        if !self.chunk_index[chunk].runtime_modules.contains(module) {
          return Err(ConstraintViolation(format!(
            "{module} is runtime in {chunk} but the chunk does not record it"
          )));
        }
      }
    }
    for (chunk, cgc) in &self.chunk_index {
      for module in cgc.modules.iter() {
        if !self.module_index[module].chunks.contains(chunk) {
          return Err(ConstraintViolation(format!(
            "{chunk} lists {module} but the module does not list the chunk"
          )));
        }
      }
      for group in &cgc.groups {
        if !self.group(*group).chunks().contains(chunk) {
          return Err(ConstraintViolation(format!(
            "{chunk} lists group {group:?} but the group does not list the chunk"
          )));
        }
      }
    }
    for group in self.groups.node_indices() {
      for chunk in self.group(group).chunks() {
        if !self.chunk_index[chunk].groups.contains(&group) {
          return Err(ConstraintViolation(format!(
            "group {group:?} lists {chunk} but the chunk does not list the group"
          )));
        }
      }
      for block in self.group(group).blocks() {
        if self.block_to_group.get(block) != Some(&group) {
          return Err(ConstraintViolation(format!(
            "group {group:?} lists a block that does not map back to it"
          )));
        }
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::chunk_group::ChunkGroupKind;

  fn graph_with_modules(n: usize) -> (ChunkGraph, Vec<ModuleId>) {
    let mut graph = ChunkGraph::new();
    let modules = (0..n)
      .map(|i| graph.add_module(Module::new(format!("src/m{i}.js"), 100.0)))
      .collect();
    (graph, modules)
  }

  #[test]
  fn test_connect_and_disconnect_keep_both_sides_in_sync() {
    let (mut graph, modules) = graph_with_modules(2);
    let chunk = graph.add_chunk(Some("main"));

    assert!(graph.connect_chunk_and_module(chunk, modules[0]));
    assert!(!graph.connect_chunk_and_module(chunk, modules[0]));
    graph.connect_chunk_and_module(chunk, modules[1]);

    assert!(graph.is_module_in_chunk(modules[0], chunk));
    assert_eq!(graph.get_module_chunks(modules[0]), vec![chunk]);
    assert_eq!(graph.get_chunk_modules(chunk), modules);
    graph.check_constraints().unwrap();

    graph.disconnect_chunk_and_module(chunk, modules[0]);
    assert!(!graph.is_module_in_chunk(modules[0], chunk));
    assert_eq!(graph.get_chunk_modules(chunk), vec![modules[1]]);
    assert_eq!(graph.get_number_of_module_chunks(modules[0]), 0);
    graph.check_constraints().unwrap();
  }

  #[test]
  fn test_unshift_places_chunk_at_the_front_of_the_group() {
    let mut graph = ChunkGraph::new();
    let main = graph.add_chunk(Some("main"));
    let entry = graph.create_entrypoint("main");
    graph.connect_chunk_group_and_chunk(entry, main);

    let runtime = graph.add_chunk(Some("runtime"));
    graph.unshift_chunk_group_and_chunk(entry, runtime);

    assert_eq!(graph.group(entry).chunks(), &[runtime, main]);
    assert!(graph.chunk_groups(runtime).any(|g| g == entry));

    // Unshifting an existing member does not move it.
    graph.unshift_chunk_group_and_chunk(entry, main);
    assert_eq!(graph.group(entry).chunks(), &[runtime, main]);
    graph.check_constraints().unwrap();
  }

  #[test]
  fn test_chunk_ids_are_monotonic_debug_ids() {
    let mut graph = ChunkGraph::new();
    let a = graph.add_chunk(None);
    let b = graph.add_chunk(None);
    assert_eq!(a.debug_id(), 1000);
    assert_eq!(b.debug_id(), 1001);
    assert!(a < b);
  }

  #[test]
  fn test_named_chunk_is_created_once() {
    let mut graph = ChunkGraph::new();
    let a = graph.add_chunk(Some("shared"));
    let b = graph.add_chunk(Some("shared"));
    assert_eq!(a, b);
    assert_eq!(graph.get_named_chunk("shared"), Some(a));
  }

  #[test]
  fn test_have_modules_equal_chunks() {
    let (mut graph, modules) = graph_with_modules(3);
    let a = graph.add_chunk(None);
    let b = graph.add_chunk(None);

    graph.connect_chunk_and_module(a, modules[0]);
    graph.connect_chunk_and_module(b, modules[0]);
    // Same chunks, different insertion order.
    graph.connect_chunk_and_module(b, modules[1]);
    graph.connect_chunk_and_module(a, modules[1]);
    graph.connect_chunk_and_module(a, modules[2]);

    assert!(graph.have_modules_equal_chunks(modules[0], modules[1]));
    assert!(!graph.have_modules_equal_chunks(modules[0], modules[2]));
  }

  #[test]
  fn test_chunk_modules_sorted_by_injected_comparator() {
    let mut graph = ChunkGraph::new();
    let chunk = graph.add_chunk(None);
    let big = graph.add_module(Module::new("b.js", 300.0));
    let small = graph.add_module(Module::new("a.js", 100.0));
    let mid = graph.add_module(Module::new("c.js", 200.0));
    for module in [big, small, mid] {
      graph.connect_chunk_and_module(chunk, module);
    }

    assert_eq!(graph.get_ordered_chunk_modules(chunk), vec![small, big, mid]);

    let by_size = graph.get_chunk_modules_sorted(chunk, "module_size_desc", |a, b| {
      b.size.total_cmp(&a.size)
    });
    assert_eq!(by_size, vec![big, mid, small]);
  }

  #[test]
  fn test_replace_module_preserves_roles() {
    let (mut graph, modules) = graph_with_modules(2);
    let chunk = graph.add_chunk(Some("main"));
    let entry = graph.create_entrypoint("main");
    graph.connect_chunk_group_and_chunk(entry, chunk);
    graph.connect_chunk_and_module(chunk, modules[0]);
    graph.connect_chunk_and_entry_module(chunk, modules[0], entry);

    graph.replace_module(modules[0], modules[1]);

    assert!(!graph.is_module_in_chunk(modules[0], chunk));
    assert!(graph.is_module_in_chunk(modules[1], chunk));
    assert_eq!(
      graph.get_chunk_entry_modules_with_group(chunk).collect::<Vec<_>>(),
      vec![(modules[1], entry)]
    );
    assert_eq!(graph.get_number_of_module_chunks(modules[0]), 0);
    graph.check_constraints().unwrap();
  }

  #[test]
  fn test_disconnect_chunk_is_a_full_teardown() {
    let (mut graph, modules) = graph_with_modules(2);
    let chunk = graph.add_chunk(Some("main"));
    let entry = graph.create_entrypoint("main");
    graph.connect_chunk_group_and_chunk(entry, chunk);
    graph.connect_chunk_and_module(chunk, modules[0]);
    graph.connect_chunk_and_module(chunk, modules[1]);
    graph.connect_chunk_and_entry_module(chunk, modules[0], entry);

    graph.disconnect_chunk(chunk);

    assert_eq!(graph.get_number_of_chunk_modules(chunk), 0);
    assert_eq!(graph.get_number_of_module_chunks(modules[0]), 0);
    assert_eq!(graph.get_number_of_chunk_groups(chunk), 0);
    assert!(graph.group(entry).chunks().is_empty());
    graph.check_constraints().unwrap();
  }

  #[test]
  fn test_group_dag_mirroring() {
    let mut graph = ChunkGraph::new();
    let p = graph.create_entrypoint("main");
    let c = graph.create_chunk_group(ChunkGroupKind::Normal, ChunkGroupOptions::default());

    graph.connect_group_parent_and_child(p, c);
    assert!(graph.group_has_child(p, c));
    assert_eq!(graph.group_parents(c), vec![p]);
    assert_eq!(graph.group_children(p), vec![c]);

    assert!(graph.remove_group_parent(c, p));
    assert!(!graph.group_has_child(p, c));
    assert!(graph.group_parents(c).is_empty());
    assert!(graph.group_children(p).is_empty());
  }

  #[test]
  fn test_remove_group_reparents_children() {
    let mut graph = ChunkGraph::new();
    let p = graph.create_entrypoint("main");
    let mid = graph.create_chunk_group(ChunkGroupKind::Normal, ChunkGroupOptions::default());
    let x = graph.create_chunk_group(ChunkGroupKind::Normal, ChunkGroupOptions::default());
    let y = graph.create_chunk_group(ChunkGroupKind::Normal, ChunkGroupOptions::default());
    graph.connect_group_parent_and_child(p, mid);
    graph.connect_group_parent_and_child(mid, x);
    graph.connect_group_parent_and_child(mid, y);

    let chunk = graph.add_chunk(None);
    graph.connect_chunk_group_and_chunk(mid, chunk);
    let block = graph.alloc_block();
    graph.connect_block_and_chunk_group(block, mid);

    graph.remove_group(mid);

    let mut children = graph.group_children(p);
    children.sort();
    let mut expected = vec![x, y];
    expected.sort();
    assert_eq!(children, expected);
    assert_eq!(graph.group_parents(x), vec![p]);
    assert_eq!(graph.group_parents(y), vec![p]);
    assert_eq!(graph.get_number_of_chunk_groups(chunk), 0);
    assert_eq!(graph.get_block_chunk_group(block), None);
    graph.check_constraints().unwrap();
  }

  #[test]
  fn test_integrate_chunks_moves_everything() {
    let (mut graph, modules) = graph_with_modules(3);
    let a = graph.add_chunk(Some("a"));
    let b = graph.add_chunk(Some("b"));
    let group = graph.create_chunk_group(ChunkGroupKind::Normal, ChunkGroupOptions::default());
    graph.connect_chunk_group_and_chunk(group, b);
    graph.connect_chunk_and_module(a, modules[0]);
    graph.connect_chunk_and_module(b, modules[1]);
    graph.connect_chunk_and_module(b, modules[2]);

    assert!(graph.can_chunks_be_integrated(a, b));
    graph.integrate_chunks(a, b);

    assert_eq!(graph.get_number_of_chunk_modules(b), 0);
    assert_eq!(graph.get_number_of_chunk_groups(b), 0);
    assert_eq!(graph.get_number_of_chunk_modules(a), 3);
    assert!(graph.chunk_groups(a).any(|g| g == group));
    assert_eq!(graph.group(group).chunks(), &[a]);
    // Shorter name wins; equal length falls back to lexicographic order.
    assert_eq!(graph.chunk(a).name.as_deref(), Some("a"));
    graph.check_constraints().unwrap();

    graph.remove_chunk(b);
    graph.check_constraints().unwrap();
  }

  #[test]
  fn test_integrate_prefers_entry_chunk_name() {
    let (mut graph, modules) = graph_with_modules(1);
    let a = graph.add_chunk(Some("long-split-name"));
    let b = graph.add_chunk(Some("page"));
    let entry = graph.create_entrypoint("page");
    graph.connect_chunk_group_and_chunk(entry, b);
    graph.connect_chunk_and_entry_module(b, modules[0], entry);

    graph.integrate_chunks(a, b);
    assert_eq!(graph.chunk(a).name.as_deref(), Some("page"));
    assert_eq!(
      graph.get_chunk_entry_modules_with_group(a).collect::<Vec<_>>(),
      vec![(modules[0], entry)]
    );
  }

  #[test]
  fn test_entry_chunks_cannot_be_integrated() {
    let (mut graph, modules) = graph_with_modules(1);
    let a = graph.add_chunk(Some("a"));
    let b = graph.add_chunk(Some("b"));
    let entry = graph.create_entrypoint("a");
    graph.connect_chunk_group_and_chunk(entry, a);
    graph.connect_chunk_and_entry_module(a, modules[0], entry);

    assert!(!graph.can_chunks_be_integrated(a, b));
    assert!(!graph.can_chunks_be_integrated(b, a));
  }

  #[test]
  fn test_prevent_integration_flag() {
    let mut graph = ChunkGraph::new();
    let a = graph.add_chunk(None);
    let b = graph.add_chunk(None);
    assert!(graph.can_chunks_be_integrated(a, b));
    graph.set_prevent_integration(b, true);
    assert!(!graph.can_chunks_be_integrated(a, b));
  }

  #[test]
  fn test_runtime_chunk_integration_requires_availability() {
    let mut graph = ChunkGraph::new();
    let runtime = graph.add_chunk(Some("main"));
    let entry = graph.create_entrypoint("main");
    graph.connect_chunk_group_and_chunk(entry, runtime);

    // An async chunk loaded under the entrypoint: the runtime chunk is on
    // every path to it.
    let async_chunk = graph.add_chunk(Some("lazy"));
    let async_group =
      graph.create_chunk_group(ChunkGroupKind::Normal, ChunkGroupOptions::default());
    graph.connect_chunk_group_and_chunk(async_group, async_chunk);
    graph.connect_group_parent_and_child(entry, async_group);

    assert!(graph.has_runtime(runtime));
    assert!(!graph.has_runtime(async_chunk));
    assert!(graph.can_chunks_be_integrated(runtime, async_chunk));

    // A second, unrelated entrypoint reaches the async group too: now some
    // path avoids the runtime chunk.
    let other = graph.add_chunk(Some("other"));
    let other_entry = graph.create_entrypoint("other");
    graph.connect_chunk_group_and_chunk(other_entry, other);
    graph.connect_group_parent_and_child(other_entry, async_group);

    assert!(!graph.can_chunks_be_integrated(runtime, async_chunk));
  }

  #[test]
  fn test_split_chunk_inserts_before_source() {
    let mut graph = ChunkGraph::new();
    let main = graph.add_chunk(Some("main"));
    let entry = graph.create_entrypoint("main");
    graph.connect_chunk_group_and_chunk(entry, main);

    let shared = graph.add_chunk(Some("shared"));
    graph.split_chunk(main, shared);

    assert_eq!(graph.group(entry).chunks(), &[shared, main]);
    assert!(graph.chunk_groups(shared).any(|g| g == entry));
    graph.check_constraints().unwrap();
  }

  #[test]
  fn test_chunk_size_cost_model() {
    let mut graph = ChunkGraph::new();
    let m = graph.add_module(Module::new("src/a.js", 500.0));
    let chunk = graph.add_chunk(Some("main"));
    graph.connect_chunk_and_module(chunk, m);

    let options = ChunkSizeOptions::default();
    assert_eq!(graph.get_chunk_size(chunk, options), 500.0 + 10_000.0);

    let entry = graph.create_entrypoint("main");
    graph.connect_chunk_group_and_chunk(entry, chunk);
    assert_eq!(graph.get_chunk_size(chunk, options), 500.0 * 10.0 + 10_000.0);

    let other = graph.add_chunk(None);
    let n = graph.add_module(Module::new("src/b.js", 300.0));
    graph.connect_chunk_and_module(other, n);
    graph.connect_chunk_and_module(other, m);
    // Union size counts the shared module once; the initial side wins the
    // multiplier.
    assert_eq!(
      graph.get_integrated_chunks_size(chunk, other, options),
      800.0 * 10.0 + 10_000.0
    );
  }

  #[test]
  fn test_compare_chunks_is_total_and_deterministic() {
    let mut graph = ChunkGraph::new();
    let m1 = graph.add_module(Module::new("src/a.js", 1.0));
    let m2 = graph.add_module(Module::new("src/b.js", 1.0));
    let m3 = graph.add_module(Module::new("src/c.js", 1.0));

    let big = graph.add_chunk(None);
    graph.connect_chunk_and_module(big, m1);
    graph.connect_chunk_and_module(big, m2);

    let small = graph.add_chunk(None);
    graph.connect_chunk_and_module(small, m3);

    // More modules sorts first.
    assert_eq!(graph.compare_chunks(big, small), Ordering::Less);
    assert_eq!(graph.compare_chunks(small, big), Ordering::Greater);

    // Equal counts: later-diverging identifier sequence is "less".
    let other = graph.add_chunk(None);
    graph.connect_chunk_and_module(other, m3);
    assert_eq!(graph.compare_chunks(small, other), Ordering::Equal);
    let earlier = graph.add_chunk(None);
    graph.connect_chunk_and_module(earlier, m1);
    assert_eq!(graph.compare_chunks(small, earlier), Ordering::Less);
  }

  #[test]
  fn test_runtime_requirements_accumulate() {
    let (mut graph, modules) = graph_with_modules(1);
    let chunk = graph.add_chunk(None);
    graph.add_module_runtime_requirements(
      modules[0],
      ["require".to_owned(), "module".to_owned()],
    );
    graph.add_module_runtime_requirements(modules[0], ["module".to_owned()]);
    assert_eq!(graph.get_module_runtime_requirements(modules[0]).len(), 2);

    graph.add_chunk_runtime_requirements(chunk, ["ensureChunk".to_owned()]);
    assert!(graph
      .get_chunk_runtime_requirements(chunk)
      .contains("ensureChunk"));
  }
}
