use xxhash_rust::xxh3::xxh3_64;
use xxhash_rust::xxh3::Xxh3;

/// Hasher for content-derived identifiers (module hashes, chunk hashes).
///
/// These hashes end up in emitted manifests and filenames, so they must be
/// stable across runs, machines and platforms.
pub type IdentifierHasher = Xxh3;

pub fn hash_string(s: &str) -> String {
  hash_bytes(s.as_bytes())
}

pub fn hash_bytes(s: &[u8]) -> String {
  let res = xxh3_64(s);
  format!("{:016x}", res)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_hash_is_stable() {
    assert_eq!(hash_string("a.js"), hash_string("a.js"));
    assert_ne!(hash_string("a.js"), hash_string("b.js"));
    assert_eq!(hash_string("a.js").len(), 16);
  }
}
