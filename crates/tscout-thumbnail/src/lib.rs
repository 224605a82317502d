//! The thumbnail pipeline.
//!
//! Two halves:
//! - [`analyzer`] - vision pass over a series' reference thumbnails,
//!   producing the fixed-schema guideline document
//! - [`imagemodel`] - versioned-prediction image model client for
//!   fine-tune training and thumbnail rendering

pub mod analyzer;
pub mod error;
pub mod imagemodel;

pub use analyzer::{ReferenceImage, ThumbnailAnalyzer};
pub use error::{ThumbnailError, ThumbnailResult};
pub use imagemodel::{ImageModelClient, ImageModelConfig, TrainingOutcome};
