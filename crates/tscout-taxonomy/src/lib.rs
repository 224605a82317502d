//! Taxonomy extraction: batched classification of video titles into a
//! series → theme → topic hierarchy, with deterministic cross-batch
//! merging and a coverage pass that guarantees every input title lands
//! in the tree exactly once.

pub mod error;
pub mod extractor;
pub mod merge;
pub mod prompts;

pub use error::{TaxonomyError, TaxonomyResult};
pub use extractor::{TaxonomyExtractor, BATCH_SIZE, MAX_VIDEOS};
pub use merge::{build_tree, merge_wire};
