// src/memory/recall/mod.rs

pub mod engine;
pub mod fts_search;
pub mod fusion;
pub mod keyword_search;
pub mod query_preprocess;
pub mod rank;
pub mod vector_search;

pub use engine::{RecallEngine, RecallRequest};
pub use fusion::{FusedCandidate, Source, SourceHit};
pub use query_preprocess::{preprocess, PreprocessedQuery};
