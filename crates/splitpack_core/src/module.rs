use serde::{Deserialize, Serialize};

/// Handle for a module registered with a [`crate::ChunkGraph`].
///
/// Ids are minted monotonically at registration time, so ordering two
/// `ModuleId`s is a stable, content-independent creation-order tie break.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl std::fmt::Display for ModuleId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "module({})", self.0)
  }
}

/// The kind of source a module contributes to a chunk, used to key
/// per-source-type content hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
  #[default]
  JavaScript,
  Css,
}

/// A module as seen by the chunk graph.
///
/// Modules are produced and owned by the module-factory subsystem; the chunk
/// graph only consumes their identity, identifier and size. It never creates
/// or destroys them.
#[derive(Debug, Clone)]
pub struct Module {
  /// Content-derived identifier. Sortable, unique per module, used for every
  /// deterministic tie break that must survive across builds.
  pub identifier: String,
  /// Size in bytes (or whatever cost unit the build uses).
  pub size: f64,
  pub source_type: SourceType,
}

impl Module {
  pub fn new(identifier: impl Into<String>, size: f64) -> Self {
    Self {
      identifier: identifier.into(),
      size,
      source_type: SourceType::default(),
    }
  }

  pub fn with_source_type(mut self, source_type: SourceType) -> Self {
    self.source_type = source_type;
    self
  }
}
