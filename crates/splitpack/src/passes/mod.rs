pub mod split_chunks;
