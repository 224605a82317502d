//! The script generation pipeline.
//!
//! Three stages, each grounded in the previous one:
//! 1. [`breakdown`] - transcript-driven style analysis of an existing
//!    series, producing a reusable script breakdown
//! 2. [`outline`] - a duration-budgeted plot outline with renamed,
//!    timestamped segments
//! 3. [`generator`] - parallel per-segment script generation with
//!    chunking, prompt caching and strict output validation

pub mod breakdown;
pub mod error;
pub mod generator;
pub mod outline;
pub mod postprocess;
pub mod prompts;

pub use breakdown::{BreakdownGenerator, BreakdownSource};
pub use error::{ScriptError, ScriptResult};
pub use generator::{
    chunk_plan, ChunkPlan, FullScriptGenerator, ScriptOutput, ScriptRequest, WORDS_PER_MINUTE,
};
pub use outline::{has_continuation_marker, parse_outline, render_outline, OutlineGenerator};
pub use postprocess::{clean_segment, segment_is_well_formed};
