use regex::Regex;

use super::options::{
  CacheGroupConfig, CacheGroupOptions, ChunkFilter, ChunkName, ModuleTest, SplitChunksOptions,
};

/// A cache group with every option resolved: global fallbacks applied, and,
/// when `enforce` is set, the size and request constraints relaxed to their
/// neutral values unless restated on the group itself.
#[derive(Debug, Clone)]
pub struct CacheGroup {
  pub key: String,
  pub priority: i32,
  pub test: ModuleTest,
  pub chunks_filter: ChunkFilter,
  pub min_size: f64,
  pub min_chunks: usize,
  pub max_async_requests: usize,
  pub max_initial_requests: usize,
  pub name: ChunkName,
  pub automatic_name_delimiter: String,
  pub filename: Option<String>,
  pub reuse_existing_chunk: bool,
}

impl CacheGroup {
  fn resolve(key: &str, options: &CacheGroupOptions, globals: &SplitChunksOptions) -> Self {
    let enforce = options.enforce;
    Self {
      key: key.to_owned(),
      priority: options.priority.unwrap_or(0),
      test: options.test.clone().unwrap_or_default(),
      chunks_filter: options.chunks.clone().unwrap_or_else(|| globals.chunks.clone()),
      min_size: options
        .min_size
        .unwrap_or(if enforce { 0.0 } else { globals.min_size }),
      min_chunks: options
        .min_chunks
        .unwrap_or(if enforce { 1 } else { globals.min_chunks }),
      max_async_requests: options
        .max_async_requests
        .unwrap_or(if enforce { usize::MAX } else { globals.max_async_requests }),
      max_initial_requests: options
        .max_initial_requests
        .unwrap_or(if enforce { usize::MAX } else { globals.max_initial_requests }),
      name: options.name.clone().unwrap_or_else(|| globals.name.clone()),
      automatic_name_delimiter: options
        .automatic_name_delimiter
        .clone()
        .unwrap_or_else(|| globals.automatic_name_delimiter.clone()),
      filename: options.filename.clone(),
      reuse_existing_chunk: options.reuse_existing_chunk,
    }
  }
}

fn stock_vendors() -> CacheGroupOptions {
  CacheGroupOptions {
    test: Some(ModuleTest::Pattern(
      Regex::new(r"[\\/]node_modules[\\/]").expect("static pattern"),
    )),
    priority: Some(-10),
    ..Default::default()
  }
}

fn stock_default() -> CacheGroupOptions {
  CacheGroupOptions {
    min_chunks: Some(2),
    priority: Some(-20),
    reuse_existing_chunk: true,
    ..Default::default()
  }
}

/// Expands the configured cache-group map into resolved groups, in a stable
/// order: the stock `vendors` and `default` groups first (unless overridden
/// or disabled with `false`), then user groups in declaration order.
pub(super) fn resolve_cache_groups(options: &SplitChunksOptions) -> Vec<CacheGroup> {
  let mut sources: Vec<(&str, CacheGroupOptions)> = Vec::new();
  if !options.cache_groups.contains_key("vendors") {
    sources.push(("vendors", stock_vendors()));
  }
  if !options.cache_groups.contains_key("default") {
    sources.push(("default", stock_default()));
  }
  for (key, config) in &options.cache_groups {
    match config {
      CacheGroupConfig::Enabled(group) => sources.push((key, group.clone())),
      CacheGroupConfig::Toggle(true) => match key.as_str() {
        "vendors" => sources.push((key, stock_vendors())),
        "default" => sources.push((key, stock_default())),
        _ => sources.push((key, CacheGroupOptions::default())),
      },
      CacheGroupConfig::Toggle(false) => {}
    }
  }
  sources
    .into_iter()
    .map(|(key, group)| CacheGroup::resolve(key, &group, options))
    .collect()
}
