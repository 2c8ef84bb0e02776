pub mod error;
pub mod passes;

use anyhow::Context;
use splitpack_core::ChunkGraph;

pub use error::SplitChunksError;
pub use passes::split_chunks::{
  CacheGroupConfig, CacheGroupOptions, ChunkFilter, ChunkName, ModuleTest, SplitChunksOptions,
  SplitChunksPlugin,
};

/// Runs the split-chunks pass over the graph with the given options.
///
/// Convenience entry point for hosts that don't keep the plugin around;
/// repeated passes should construct one [`SplitChunksPlugin`] and reuse it.
pub fn optimize_chunks(
  graph: &mut ChunkGraph,
  options: SplitChunksOptions,
) -> anyhow::Result<()> {
  SplitChunksPlugin::new(options)
    .optimize(graph)
    .context("split-chunks optimization failed")
}
