//! Competitor discovery and performance analytics.
//!
//! - Topic-driven search fan-out that surfaces candidate channels per
//!   series, excluding the seed channel
//! - Competitor enrichment with derived growth metrics
//! - Shared-series detection with an LLM matcher and substring fallback
//! - The metrics engine: group averages, theme outlier tiers and the
//!   revenue estimator

pub mod competitor;
pub mod discovery;
pub mod error;
pub mod metrics;
pub mod shared;

pub use competitor::build_competitor;
pub use discovery::{CompetitorDiscovery, DiscoveryOutcome};
pub use error::{DiscoveryError, DiscoveryResult};
pub use metrics::{
    estimate_monthly_revenue, group_metrics, niche_multiplier, outlier_tier, theme_outliers,
    OutlierTier, ThemeOutlier,
};
pub use shared::SharedSeriesDetector;
