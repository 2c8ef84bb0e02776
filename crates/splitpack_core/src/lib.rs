pub mod chunk;
pub mod chunk_combination;
pub mod chunk_graph;
pub mod chunk_group;
pub mod error;
pub mod hash;
pub mod module;
pub mod sortable_set;

pub use chunk::{Chunk, ChunkId, ChunkSizeOptions};
pub use chunk_combination::{ChunkCombinations, CombinationId};
pub use chunk_graph::{ChunkGraph, ChunkMaps, ChunkModuleMaps};
pub use chunk_group::{
  BlockId, ChunkGroup, ChunkGroupId, ChunkGroupKind, ChunkGroupOptions, OriginRecord,
};
pub use error::ConstraintViolation;
pub use module::{Module, ModuleId, SourceType};
pub use sortable_set::SortableSet;
