use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitChunksError {
  /// A cache group with a custom `filename` produced a chunk that can be
  /// loaded on demand. Filename templates are resolved at emit time for the
  /// initial HTML only, so this configuration can never work.
  #[error(
    "cache group \"{key}\" sets a filename but \"{chunk}\" can be loaded on demand; \
     custom filenames are only supported for chunks that are always loaded initially"
  )]
  FilenameOnNonInitialChunk { key: String, chunk: String },

  #[error("invalid splitChunks configuration: {0}")]
  Config(String),
}
