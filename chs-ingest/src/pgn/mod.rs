//! PGN handling: chunk splitting, tag parsing, movetext tokenizing and
//! normalization into `ParsedGame`s

pub mod header;
pub mod movetext;
pub mod normalizer;
pub mod splitter;

pub use normalizer::{derive_external_id, normalize, parse_games, ChunkOutcome, SkipReason};
pub use splitter::split_games;
