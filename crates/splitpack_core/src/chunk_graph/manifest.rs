//! Runtime-manifest queries: everything the bootstrap runtime needs to know
//! about the chunks reachable from a given chunk (hashes, names, preload and
//! prefetch hints).

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::chunk::ChunkId;
use crate::chunk_graph::ChunkGraph;
use crate::chunk_group::ChunkGroupId;
use crate::module::{Module, ModuleId, SourceType};

/// Hash and name tables for a set of chunks, keyed by output chunk id.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChunkMaps {
  pub hash: HashMap<String, String>,
  pub content_hash: HashMap<SourceType, HashMap<String, String>>,
  pub name: HashMap<String, String>,
}

/// Module id and hash tables for the filtered modules of a set of chunks,
/// keyed by output chunk id.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChunkModuleMaps {
  pub id: HashMap<String, Vec<String>>,
  pub hash: HashMap<String, String>,
}

impl ChunkGraph {
  fn output_chunk_id(&self, chunk: ChunkId) -> String {
    self
      .chunk(chunk)
      .id
      .clone()
      .unwrap_or_else(|| chunk.debug_id().to_string())
  }

  fn output_module_id(&self, module: ModuleId) -> String {
    match self.get_module_id(module) {
      Some(id) => id.to_owned(),
      None => self.module(module).identifier.clone(),
    }
  }

  /// All chunks loaded on demand somewhere below this chunk.
  ///
  /// Chunks that are part of every group the chunk belongs to are already
  /// loaded whenever this chunk runs, so they are excluded; everything else
  /// reachable through child groups is collected, transitively.
  pub fn get_all_async_chunks(&self, chunk: ChunkId) -> IndexSet<ChunkId> {
    let groups: Vec<ChunkGroupId> = self.chunk_groups(chunk).collect();

    let mut initial: IndexSet<ChunkId> = match groups.first() {
      Some(&first) => self.group(first).chunks().iter().copied().collect(),
      None => IndexSet::new(),
    };
    for group in groups.iter().skip(1) {
      initial.retain(|c| self.group(*group).chunks().contains(c));
    }

    let mut queue: IndexSet<ChunkGroupId> = IndexSet::new();
    for group in &groups {
      for child in self.group_children(*group) {
        queue.insert(child);
      }
    }

    let mut chunks = IndexSet::new();
    let mut i = 0;
    while i < queue.len() {
      let group = *queue.get_index(i).unwrap();
      i += 1;
      for child_chunk in self.group(group).chunks() {
        if !initial.contains(child_chunk) {
          chunks.insert(*child_chunk);
        }
      }
      for child in self.group_children(group) {
        queue.insert(child);
      }
    }
    chunks
  }

  /// The group's children that carry an order hint, bucketed by hint kind
  /// ("preload"/"prefetch") and sorted by descending order value; ties fall
  /// back to the groups' chunk-count-and-name order.
  pub fn get_children_by_orders(
    &self,
    group: ChunkGroupId,
  ) -> IndexMap<&'static str, Vec<ChunkGroupId>> {
    let mut lists: IndexMap<&'static str, Vec<(i32, ChunkGroupId)>> = IndexMap::new();
    for child in self.group_children(group) {
      let options = self.group(child).options();
      if let Some(order) = options.preload_order {
        lists.entry("preload").or_default().push((order, child));
      }
      if let Some(order) = options.prefetch_order {
        lists.entry("prefetch").or_default().push((order, child));
      }
    }
    lists.sort_unstable_keys();

    let mut result = IndexMap::new();
    for (key, mut entries) in lists {
      entries.sort_by(|(order_a, group_a), (order_b, group_b)| {
        order_b.cmp(order_a).then_with(|| {
          let a = self.group(*group_a);
          let b = self.group(*group_b);
          a.chunks()
            .len()
            .cmp(&b.chunks().len())
            .then_with(|| a.name().cmp(&b.name()))
            .then_with(|| a.group_debug_id().cmp(&b.group_debug_id()))
        })
      });
      result.insert(key, entries.into_iter().map(|(_, g)| g).collect());
    }
    result
  }

  /// Output chunk ids carrying an order hint, seen from this chunk's own
  /// groups, bucketed by hint kind.
  pub fn get_child_ids_by_orders(&self, chunk: ChunkId) -> IndexMap<&'static str, Vec<String>> {
    let mut result: IndexMap<&'static str, Vec<String>> = IndexMap::new();
    for group in self.chunk_groups(chunk) {
      for (order, children) in self.get_children_by_orders(group) {
        let list = result.entry(order).or_default();
        for child in children {
          for child_chunk in self.group(child).chunks() {
            let id = self.output_chunk_id(*child_chunk);
            if !list.contains(&id) {
              list.push(id);
            }
          }
        }
      }
    }
    result.sort_unstable_keys();
    result
  }

  /// Order-hint tables for every async chunk below this one (and the chunk
  /// itself when `include_direct_children`), keyed by output chunk id. Chunks
  /// without hints are omitted.
  pub fn get_child_ids_by_orders_map(
    &self,
    chunk: ChunkId,
    include_direct_children: bool,
  ) -> HashMap<String, IndexMap<&'static str, Vec<String>>> {
    let mut map = HashMap::new();
    if include_direct_children {
      let data = self.get_child_ids_by_orders(chunk);
      if !data.is_empty() {
        map.insert(self.output_chunk_id(chunk), data);
      }
    }
    for async_chunk in self.get_all_async_chunks(chunk) {
      let data = self.get_child_ids_by_orders(async_chunk);
      if !data.is_empty() {
        map.insert(self.output_chunk_id(async_chunk), data);
      }
    }
    map
  }

  /// Hash/name tables over all async chunks below this chunk, as embedded in
  /// the runtime bootstrap. `short_hashes` truncates hashes to their first 4
  /// hex digits, matching the short placeholder form.
  pub fn get_chunk_maps(&self, chunk: ChunkId, short_hashes: bool) -> ChunkMaps {
    let mut maps = ChunkMaps::default();
    for async_chunk in self.get_all_async_chunks(chunk) {
      let key = self.output_chunk_id(async_chunk);
      let record = self.chunk(async_chunk);
      if let Some(hash) = &record.rendered_hash {
        let hash = if short_hashes { shorten(hash) } else { hash.clone() };
        maps.hash.insert(key.clone(), hash);
      }
      for (source_type, hash) in &record.content_hash {
        let hash = if short_hashes { shorten(hash) } else { hash.clone() };
        maps
          .content_hash
          .entry(*source_type)
          .or_default()
          .insert(key.clone(), hash);
      }
      if let Some(name) = &record.name {
        maps.name.insert(key.clone(), name.clone());
      }
    }
    maps
  }

  /// Module id/hash tables over all async chunks below this chunk, restricted
  /// to modules accepted by `filter`. Module order within a chunk is the
  /// identifier order.
  pub fn get_chunk_module_maps(
    &mut self,
    chunk: ChunkId,
    filter: impl Fn(ModuleId, &Module) -> bool,
  ) -> ChunkModuleMaps {
    let mut maps = ChunkModuleMaps::default();
    let async_chunks: Vec<ChunkId> = self.get_all_async_chunks(chunk).into_iter().collect();
    for async_chunk in async_chunks {
      let mut ids = Vec::new();
      for module in self.get_ordered_chunk_modules(async_chunk) {
        if !filter(module, self.module(module)) {
          continue;
        }
        let id = self.output_module_id(module);
        if let Some(hash) = self.get_module_rendered_hash(module) {
          maps.hash.insert(id.clone(), hash.to_owned());
        }
        ids.push(id);
      }
      if !ids.is_empty() {
        maps.id.insert(self.output_chunk_id(async_chunk), ids);
      }
    }
    maps
  }
}

fn shorten(hash: &str) -> String {
  hash.chars().take(4).collect()
}
