//! Per-wordlist corpus/search layer: fuzzy character/edit-distance
//! ranking with an optional fixed-weight semantic blend, TTL-cached and
//! single-flight-built per corpus name.

pub mod embeddings;
pub mod fuzzy;
pub mod registry;
pub mod semantic;

pub use registry::CorpusRegistry;
