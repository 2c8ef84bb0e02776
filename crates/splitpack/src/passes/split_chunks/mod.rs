//! The split-chunks optimization pass.
//!
//! Finds modules shared between chunks (or matched by a cache group) and
//! extracts them into new chunks that are wired into every affected chunk
//! group before their source chunks, so the extracted chunk loads first.
//!
//! The pass is purely graph-in, graph-out: it reads module placement from the
//! [`ChunkGraph`], scores candidate extractions, and applies the winners with
//! the graph's own split/connect primitives.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use indexmap::{IndexMap, IndexSet};
use splitpack_core::chunk_combination::CombinationId;
use splitpack_core::hash::hash_string;
use splitpack_core::{ChunkGraph, ChunkId, ModuleId};
use tracing::debug;

use crate::error::SplitChunksError;

mod cache_group;
mod options;

pub use cache_group::CacheGroup;
pub use options::{
  CacheGroupConfig, CacheGroupOptions, ChunkFilter, ChunkFilterFn, ChunkName, ChunkNameFn,
  ModuleTest, ModuleTestFn, SplitChunksOptions,
};

/// Grouping key for candidate extractions: one candidate per cache group per
/// target name (or, for unnamed candidates, per exact source chunk set).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ChunksKey {
  Name(String),
  Chunks(Vec<ChunkId>),
}

type InfoKey = (usize, ChunksKey);

/// One candidate extraction: a set of modules that would move out of
/// `chunks` into a chunk of their own.
#[derive(Debug)]
struct ChunksInfoItem {
  modules: IndexSet<ModuleId>,
  cache_group: usize,
  name: Option<String>,
  /// Sum of the module sizes; kept in sync as modules are claimed by
  /// better-scoring candidates.
  size: f64,
  chunks: IndexSet<ChunkId>,
}

pub struct SplitChunksPlugin {
  cache_groups: Vec<CacheGroup>,
}

impl Default for SplitChunksPlugin {
  fn default() -> Self {
    Self::new(SplitChunksOptions::default())
  }
}

impl SplitChunksPlugin {
  pub fn new(options: SplitChunksOptions) -> Self {
    Self {
      cache_groups: cache_group::resolve_cache_groups(&options),
    }
  }

  pub fn cache_groups(&self) -> &[CacheGroup] {
    &self.cache_groups
  }

  pub fn optimize(&self, graph: &mut ChunkGraph) -> Result<(), SplitChunksError> {
    debug!(cache_groups = self.cache_groups.len(), "running split-chunks pass");

    // Module iteration order is the identifier order, which is stable across
    // builds regardless of registration order.
    let mut modules: Vec<ModuleId> = graph.module_ids().collect();
    modules.sort_by(|a, b| graph.module(*a).identifier.cmp(&graph.module(*b).identifier));

    // Every distinct chunk set currently occupied by some module, bucketed by
    // size so sub-set candidates can be enumerated cheaply.
    let mut chunk_sets_in_graph: IndexMap<CombinationId, Vec<ChunkId>> = IndexMap::new();
    for &module in &modules {
      let combination = graph.get_module_chunks_combination(module);
      if graph.combinations().is_empty(combination) {
        continue;
      }
      chunk_sets_in_graph
        .entry(combination)
        .or_insert_with(|| graph.combinations().chunks(combination).iter().copied().collect());
    }
    let mut by_count: BTreeMap<usize, Vec<CombinationId>> = BTreeMap::new();
    for (&combination, chunks) in &chunk_sets_in_graph {
      by_count.entry(chunks.len()).or_default().push(combination);
    }

    // A module placed in chunks {a,b,c} is also a candidate for any smaller
    // chunk set occupied by other modules, e.g. {a,b}: extracting there still
    // removes the module from every selected chunk.
    let mut combs_cache: HashMap<CombinationId, Vec<CombinationId>> = HashMap::new();

    let mut chunks_info: IndexMap<InfoKey, ChunksInfoItem> = IndexMap::new();
    for &module in &modules {
      let combination = graph.get_module_chunks_combination(module);
      if graph.combinations().is_empty(combination) {
        continue;
      }
      let combs = match combs_cache.get(&combination) {
        Some(hit) => hit.clone(),
        None => {
          let count = graph.combinations().len(combination);
          let mut result = vec![combination];
          for (_, sets) in by_count.range(..count) {
            for &candidate in sets {
              if graph.combinations().is_subset(combination, candidate) {
                result.push(candidate);
              }
            }
          }
          combs_cache.insert(combination, result.clone());
          result
        }
      };
      for (index, cache_group) in self.cache_groups.iter().enumerate() {
        if !cache_group.test.matches(graph.module(module)) {
          continue;
        }
        for &comb in &combs {
          let selected: Vec<ChunkId> = chunk_sets_in_graph[&comb]
            .iter()
            .copied()
            .filter(|&chunk| cache_group.chunks_filter.select(graph, chunk))
            .collect();
          self.add_module_to_chunks_info(graph, &mut chunks_info, index, selected, module);
        }
      }
    }

    while !chunks_info.is_empty() {
      // Pick the best candidate that clears its group's size floor; stop
      // when none does.
      let mut best: Option<usize> = None;
      for index in 0..chunks_info.len() {
        let (_, info) = chunks_info.get_index(index).unwrap();
        if info.size < self.cache_groups[info.cache_group].min_size {
          continue;
        }
        best = match best {
          None => Some(index),
          Some(current) => {
            let (_, leader) = chunks_info.get_index(current).unwrap();
            if self.compare_entries(graph, leader, info) == Ordering::Less {
              Some(index)
            } else {
              Some(current)
            }
          }
        };
      }
      let Some(best) = best else {
        break;
      };
      let (_, item) = chunks_info.shift_remove_index(best).unwrap();
      let cache_group = &self.cache_groups[item.cache_group];

      let mut chunk_name = item.name.clone();
      let mut new_chunk: Option<ChunkId> = None;
      let mut is_reused = false;
      if cache_group.reuse_existing_chunk {
        // A source chunk holding exactly the extracted modules can become
        // the extracted chunk itself. Prefer the shortest (then smallest)
        // name among qualifying chunks.
        'candidates: for &chunk in &item.chunks {
          if graph.get_number_of_chunk_modules(chunk) != item.modules.len() {
            continue;
          }
          if graph.has_chunk_entry_modules(chunk) {
            continue;
          }
          for &module in &item.modules {
            if !graph.is_module_in_chunk(module, chunk) {
              continue 'candidates;
            }
          }
          let replace = match new_chunk {
            None => true,
            Some(current) => match (
              graph.chunk(current).name.as_deref(),
              graph.chunk(chunk).name.as_deref(),
            ) {
              (None, _) => true,
              (Some(_), None) => false,
              (Some(current_name), Some(candidate)) => {
                candidate.len() < current_name.len()
                  || (candidate.len() == current_name.len() && candidate < current_name)
              }
            },
          };
          if replace {
            new_chunk = Some(chunk);
          }
          chunk_name = None;
          is_reused = true;
        }
      }

      // Source chunks, minus the chunk we are about to address (by reuse or
      // by name).
      let used: Vec<ChunkId> = item
        .chunks
        .iter()
        .copied()
        .filter(|&chunk| Some(chunk) != new_chunk)
        .filter(|&chunk| match &chunk_name {
          Some(name) => graph.chunk(chunk).name.as_deref() != Some(name.as_str()),
          None => true,
        })
        .collect();
      if used.is_empty() {
        // Every source chunk is the target itself: nothing left to split
        // from.
        continue;
      }

      // Request-limit check: splitting adds one request to every group a
      // source chunk belongs to.
      let within_limit: Vec<ChunkId> = used
        .iter()
        .copied()
        .filter(|&chunk| {
          let max_requests = if graph.is_only_initial(chunk) {
            cache_group.max_initial_requests
          } else if graph.can_be_initial(chunk) {
            cache_group.max_initial_requests.min(cache_group.max_async_requests)
          } else {
            cache_group.max_async_requests
          };
          max_requests == usize::MAX || get_requests(graph, chunk) < max_requests
        })
        .collect();
      if within_limit.len() < used.len() {
        // Some chunks are at their limit: retry with the remaining ones when
        // they still clear the sharing floor.
        if within_limit.len() >= cache_group.min_chunks {
          for &module in &item.modules {
            self.add_module_to_chunks_info(
              graph,
              &mut chunks_info,
              item.cache_group,
              within_limit.clone(),
              module,
            );
          }
        }
        continue;
      }

      let target = match new_chunk {
        Some(chunk) if is_reused => chunk,
        _ => graph.add_chunk(chunk_name.as_deref()),
      };
      for &chunk in &used {
        graph.split_chunk(chunk, target);
      }

      let mut reason = if is_reused {
        format!("reused as split chunk (cache group: {})", cache_group.key)
      } else {
        format!("split chunk (cache group: {})", cache_group.key)
      };
      if let Some(name) = &chunk_name {
        reason.push_str(&format!(" (name: {name})"));
      }
      graph.set_chunk_reason(target, reason);

      if let Some(filename) = &cache_group.filename {
        if !graph.is_only_initial(target) {
          return Err(SplitChunksError::FilenameOnNonInitialChunk {
            key: cache_group.key.clone(),
            chunk: graph
              .chunk(target)
              .name
              .clone()
              .unwrap_or_else(|| target.to_string()),
          });
        }
        graph.set_chunk_filename_template(target, filename.clone());
      }

      if is_reused {
        for &module in &item.modules {
          for &chunk in &used {
            graph.disconnect_chunk_and_module(chunk, module);
          }
        }
      } else {
        for &module in &item.modules {
          graph.connect_chunk_and_module(target, module);
          for &chunk in &used {
            graph.disconnect_chunk_and_module(chunk, module);
          }
        }
      }
      debug!(
        chunk = %target,
        cache_group = %cache_group.key,
        reused = is_reused,
        modules = item.modules.len(),
        source_chunks = used.len(),
        "applied split chunk"
      );

      // The claimed modules are gone from the affected chunks: remove them
      // from every overlapping candidate still in the queue.
      let used_set: IndexSet<ChunkId> = used.iter().copied().collect();
      chunks_info.retain(|_, info| {
        if !info.chunks.iter().any(|chunk| used_set.contains(chunk)) {
          return true;
        }
        for module in &item.modules {
          if info.modules.shift_remove(module) {
            info.size -= graph.module(*module).size;
          }
        }
        // A candidate that fell under its group's size floor stays under it:
        // dropping it here keeps a later re-queue from resurrecting it.
        !info.modules.is_empty() && info.size >= self.cache_groups[info.cache_group].min_size
      });
    }

    Ok(())
  }

  fn add_module_to_chunks_info(
    &self,
    graph: &ChunkGraph,
    chunks_info: &mut IndexMap<InfoKey, ChunksInfoItem>,
    cache_group_index: usize,
    selected: Vec<ChunkId>,
    module: ModuleId,
  ) {
    let cache_group = &self.cache_groups[cache_group_index];
    if selected.len() < cache_group.min_chunks {
      return;
    }
    let name = name_for(graph, cache_group, &selected);
    let key = match &name {
      Some(name) => ChunksKey::Name(name.clone()),
      None => {
        let mut sorted = selected.clone();
        sorted.sort_unstable();
        ChunksKey::Chunks(sorted)
      }
    };
    let item = chunks_info
      .entry((cache_group_index, key))
      .or_insert_with(|| ChunksInfoItem {
        modules: IndexSet::new(),
        cache_group: cache_group_index,
        name,
        size: 0.0,
        chunks: IndexSet::new(),
      });
    if item.modules.insert(module) {
      item.size += graph.module(module).size;
    }
    item.chunks.extend(selected);
  }

  /// Total order over candidates, `Greater` meaning "better": priority
  /// first, then number of source chunks, then size reduction, then module
  /// count, with the sorted module-identifier sequences as the final,
  /// content-stable tie break.
  fn compare_entries(
    &self,
    graph: &ChunkGraph,
    a: &ChunksInfoItem,
    b: &ChunksInfoItem,
  ) -> Ordering {
    let priority_a = self.cache_groups[a.cache_group].priority;
    let priority_b = self.cache_groups[b.cache_group].priority;
    if priority_a != priority_b {
      return priority_a.cmp(&priority_b);
    }
    if a.chunks.len() != b.chunks.len() {
      return a.chunks.len().cmp(&b.chunks.len());
    }
    // Bytes no longer duplicated if this candidate is applied.
    let reduction_a = a.size * (a.chunks.len() - 1) as f64;
    let reduction_b = b.size * (b.chunks.len() - 1) as f64;
    if reduction_a != reduction_b {
      return reduction_a.partial_cmp(&reduction_b).unwrap_or(Ordering::Equal);
    }
    if a.modules.len() != b.modules.len() {
      return a.modules.len().cmp(&b.modules.len());
    }
    let sorted_identifiers = |item: &ChunksInfoItem| {
      let mut ids: Vec<&str> = item
        .modules
        .iter()
        .map(|m| graph.module(*m).identifier.as_str())
        .collect();
      ids.sort_unstable();
      ids
    };
    for (x, y) in sorted_identifiers(a).into_iter().zip(sorted_identifiers(b)) {
      match x.cmp(y) {
        Ordering::Equal => continue,
        Ordering::Greater => return Ordering::Less,
        Ordering::Less => return Ordering::Greater,
      }
    }
    Ordering::Equal
  }
}

/// How many chunks the heaviest group of this chunk already loads.
fn get_requests(graph: &ChunkGraph, chunk: ChunkId) -> usize {
  graph
    .chunk_groups(chunk)
    .map(|group| graph.group(group).chunks().len())
    .max()
    .unwrap_or(0)
}

fn name_for(graph: &ChunkGraph, cache_group: &CacheGroup, selected: &[ChunkId]) -> Option<String> {
  match &cache_group.name {
    ChunkName::Disabled => None,
    ChunkName::Fixed(name) => Some(name.clone()),
    ChunkName::Custom(name_fn) => name_fn(graph, selected, &cache_group.key),
    ChunkName::Auto => {
      let mut names = Vec::with_capacity(selected.len());
      for &chunk in selected {
        names.push(graph.chunk(chunk).name.as_deref()?);
      }
      let delimiter = cache_group.automatic_name_delimiter.as_str();
      let mut name = format!("{}{}{}", cache_group.key, delimiter, names.join(delimiter));
      if name.len() > 100 {
        // Keep derived filenames bounded; the digest keeps distinct long
        // names distinct.
        let digest = hash_string(&name);
        let prefix: String = name.chars().take(88).collect();
        name = format!("{prefix}{delimiter}{}", &digest[..8]);
      }
      Some(name)
    }
  }
}
