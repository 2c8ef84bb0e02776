//! User-facing split-chunks configuration.
//!
//! The shapes here mirror the JSON config surface (camelCase keys, `false` to
//! disable a stock cache group, a bare string where a prefix test or a fixed
//! name is meant). Programmatic consumers can additionally plug in closures
//! for the test, the chunk filter and the name; those variants have no JSON
//! form and are skipped by serde.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use splitpack_core::{ChunkGraph, ChunkId, Module};

pub type ChunkFilterFn = Arc<dyn Fn(&ChunkGraph, ChunkId) -> bool + Send + Sync>;
pub type ChunkNameFn =
  Arc<dyn Fn(&ChunkGraph, &[ChunkId], &str) -> Option<String> + Send + Sync>;
pub type ModuleTestFn = Arc<dyn Fn(&Module) -> bool + Send + Sync>;

/// Which chunks a cache group is allowed to extract from.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkFilter {
  /// Only chunks that are part of an initial page load.
  Initial,
  /// Only chunks loaded on demand.
  #[default]
  Async,
  All,
  #[serde(skip)]
  Custom(ChunkFilterFn),
}

impl ChunkFilter {
  pub fn select(&self, graph: &ChunkGraph, chunk: ChunkId) -> bool {
    match self {
      ChunkFilter::Initial => graph.can_be_initial(chunk),
      ChunkFilter::Async => !graph.can_be_initial(chunk),
      ChunkFilter::All => true,
      ChunkFilter::Custom(filter) => filter(graph, chunk),
    }
  }
}

impl fmt::Debug for ChunkFilter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ChunkFilter::Initial => write!(f, "Initial"),
      ChunkFilter::Async => write!(f, "Async"),
      ChunkFilter::All => write!(f, "All"),
      ChunkFilter::Custom(_) => write!(f, "Custom(..)"),
    }
  }
}

/// Which modules a cache group applies to, matched against the module
/// identifier. In JSON form a bare string means a prefix match.
#[derive(Clone, Default)]
pub enum ModuleTest {
  #[default]
  Always,
  Prefix(String),
  Pattern(Regex),
  Predicate(ModuleTestFn),
}

impl ModuleTest {
  pub fn matches(&self, module: &Module) -> bool {
    match self {
      ModuleTest::Always => true,
      ModuleTest::Prefix(prefix) => module.identifier.starts_with(prefix.as_str()),
      ModuleTest::Pattern(pattern) => pattern.is_match(&module.identifier),
      ModuleTest::Predicate(test) => test(module),
    }
  }
}

impl fmt::Debug for ModuleTest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ModuleTest::Always => write!(f, "Always"),
      ModuleTest::Prefix(prefix) => write!(f, "Prefix({prefix:?})"),
      ModuleTest::Pattern(pattern) => write!(f, "Pattern({:?})", pattern.as_str()),
      ModuleTest::Predicate(_) => write!(f, "Predicate(..)"),
    }
  }
}

impl<'de> Deserialize<'de> for ModuleTest {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    Ok(ModuleTest::Prefix(String::deserialize(deserializer)?))
  }
}

/// How the extracted chunk is named. In JSON form `true` means automatic
/// naming, `false` disables naming and a string fixes the name.
#[derive(Clone, Default)]
pub enum ChunkName {
  Disabled,
  /// Derive `key~a~b` from the cache group key and the names of the selected
  /// source chunks; stays unnamed when any source chunk is unnamed.
  #[default]
  Auto,
  Fixed(String),
  Custom(ChunkNameFn),
}

impl fmt::Debug for ChunkName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ChunkName::Disabled => write!(f, "Disabled"),
      ChunkName::Auto => write!(f, "Auto"),
      ChunkName::Fixed(name) => write!(f, "Fixed({name:?})"),
      ChunkName::Custom(_) => write!(f, "Custom(..)"),
    }
  }
}

impl<'de> Deserialize<'de> for ChunkName {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
      Flag(bool),
      Fixed(String),
    }
    Ok(match Repr::deserialize(deserializer)? {
      Repr::Flag(true) => ChunkName::Auto,
      Repr::Flag(false) => ChunkName::Disabled,
      Repr::Fixed(name) => ChunkName::Fixed(name),
    })
  }
}

/// One cache group as configured. Unset fields fall back to the global
/// options (or to the enforce overrides, see
/// [`crate::passes::split_chunks::CacheGroup`]).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheGroupOptions {
  pub test: Option<ModuleTest>,
  pub chunks: Option<ChunkFilter>,
  pub priority: Option<i32>,
  pub min_size: Option<f64>,
  pub min_chunks: Option<usize>,
  pub max_async_requests: Option<usize>,
  pub max_initial_requests: Option<usize>,
  pub name: Option<ChunkName>,
  pub automatic_name_delimiter: Option<String>,
  pub filename: Option<String>,
  /// Ignore the size and request constraints and always create this group's
  /// chunks (unless the constraint is explicitly restated on the group).
  pub enforce: bool,
  /// When a source chunk would become empty because it holds exactly the
  /// extracted modules, keep it as the extracted chunk instead of creating a
  /// new one.
  pub reuse_existing_chunk: bool,
}

/// A cache group entry in the config map: either options or `false` to drop
/// a stock group.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CacheGroupConfig {
  Enabled(CacheGroupOptions),
  Toggle(bool),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SplitChunksOptions {
  pub chunks: ChunkFilter,
  /// Minimum total size (in module bytes) an extracted chunk must reach.
  pub min_size: f64,
  /// Minimum number of chunks that must share a module before it is
  /// extracted.
  pub min_chunks: usize,
  /// Maximum parallel requests for an on-demand load.
  pub max_async_requests: usize,
  /// Maximum parallel requests at an entrypoint.
  pub max_initial_requests: usize,
  pub automatic_name_delimiter: String,
  pub name: ChunkName,
  /// Keyed cache groups; the stock `vendors` and `default` groups are always
  /// present unless overridden or set to `false` here.
  pub cache_groups: IndexMap<String, CacheGroupConfig>,
}

impl Default for SplitChunksOptions {
  fn default() -> Self {
    Self {
      chunks: ChunkFilter::Async,
      min_size: 30_000.0,
      min_chunks: 1,
      max_async_requests: 5,
      max_initial_requests: 3,
      automatic_name_delimiter: "~".to_owned(),
      name: ChunkName::Auto,
      cache_groups: IndexMap::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn test_defaults() {
    let options = SplitChunksOptions::default();
    assert!(matches!(options.chunks, ChunkFilter::Async));
    assert_eq!(options.min_size, 30_000.0);
    assert_eq!(options.min_chunks, 1);
    assert_eq!(options.max_async_requests, 5);
    assert_eq!(options.max_initial_requests, 3);
    assert_eq!(options.automatic_name_delimiter, "~");
    assert!(matches!(options.name, ChunkName::Auto));
  }

  #[test]
  fn test_deserialize_full_config() {
    let options: SplitChunksOptions = serde_json::from_str(
      r#"{
        "chunks": "all",
        "minSize": 0,
        "minChunks": 2,
        "automaticNameDelimiter": "-",
        "name": false,
        "cacheGroups": {
          "vendors": false,
          "ui": {
            "test": "src/ui/",
            "name": "ui",
            "priority": 5,
            "enforce": true,
            "reuseExistingChunk": true
          }
        }
      }"#,
    )
    .unwrap();

    assert!(matches!(options.chunks, ChunkFilter::All));
    assert_eq!(options.min_size, 0.0);
    assert_eq!(options.min_chunks, 2);
    assert_eq!(options.automatic_name_delimiter, "-");
    assert!(matches!(options.name, ChunkName::Disabled));

    assert!(matches!(
      options.cache_groups["vendors"],
      CacheGroupConfig::Toggle(false)
    ));
    let CacheGroupConfig::Enabled(ui) = &options.cache_groups["ui"] else {
      panic!("expected options for the ui group");
    };
    assert!(matches!(&ui.test, Some(ModuleTest::Prefix(p)) if p == "src/ui/"));
    assert!(matches!(&ui.name, Some(ChunkName::Fixed(n)) if n == "ui"));
    assert_eq!(ui.priority, Some(5));
    assert!(ui.enforce);
    assert!(ui.reuse_existing_chunk);
  }

  #[test]
  fn test_name_flag_forms() {
    let auto: ChunkName = serde_json::from_str("true").unwrap();
    assert!(matches!(auto, ChunkName::Auto));
    let disabled: ChunkName = serde_json::from_str("false").unwrap();
    assert!(matches!(disabled, ChunkName::Disabled));
    let fixed: ChunkName = serde_json::from_str(r#""commons""#).unwrap();
    assert!(matches!(fixed, ChunkName::Fixed(n) if n == "commons"));
  }

  #[test]
  fn test_module_test_matching() {
    let module = Module::new("/node_modules/lodash/index.js", 1.0);
    assert!(ModuleTest::Always.matches(&module));
    assert!(ModuleTest::Prefix("/node_modules/".into()).matches(&module));
    assert!(!ModuleTest::Prefix("/src/".into()).matches(&module));
    let pattern = ModuleTest::Pattern(Regex::new(r"[\\/]node_modules[\\/]").unwrap());
    assert!(pattern.matches(&module));
    assert!(!pattern.matches(&Module::new("/src/app.js", 1.0)));
    let predicate = ModuleTest::Predicate(Arc::new(|m: &Module| m.size > 10.0));
    assert!(!predicate.matches(&module));
  }
}
