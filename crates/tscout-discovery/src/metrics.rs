//! The metrics engine: group averages, outlier scoring and revenue
//! estimation. Pure functions over stored stats; no network calls.

use serde::{Deserialize, Serialize};

use tscout_models::{CompetitorChannel, GroupMetrics, TaxonomyTree};

/// Average month length in days, used across every per-month estimate.
pub const DAYS_PER_MONTH: f64 = 30.44;

/// Simple means over a project's finalized competitors.
pub fn group_metrics(competitors: &[CompetitorChannel]) -> GroupMetrics {
    let n = competitors.len();
    if n == 0 {
        return GroupMetrics::default();
    }
    let n_f = n as f64;
    GroupMetrics {
        avg_monthly_views: competitors
            .iter()
            .map(|c| c.metrics.monthly_views as f64)
            .sum::<f64>()
            / n_f,
        avg_monthly_subs: competitors
            .iter()
            .map(|c| c.metrics.monthly_sub_growth)
            .sum::<f64>()
            / n_f,
        avg_upload_frequency: competitors
            .iter()
            .map(|c| c.metrics.upload_frequency)
            .sum::<f64>()
            / n_f,
        total_competitors: n as u32,
    }
}

// ============================================================================
// Outlier scoring
// ============================================================================

/// How far a theme sits above the channel baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierTier {
    Extreme,
    High,
    Moderate,
    Standard,
}

impl OutlierTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutlierTier::Extreme => "extreme",
            OutlierTier::High => "high",
            OutlierTier::Moderate => "moderate",
            OutlierTier::Standard => "standard",
        }
    }
}

/// Tier a theme's outlier score.
pub fn outlier_tier(score: f64) -> OutlierTier {
    if score >= 3.0 {
        OutlierTier::Extreme
    } else if score >= 2.0 {
        OutlierTier::High
    } else if score >= 1.5 {
        OutlierTier::Moderate
    } else {
        OutlierTier::Standard
    }
}

/// One theme on the outlier board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeOutlier {
    pub series_name: String,
    pub theme_name: String,
    pub theme_avg_views: f64,
    pub theme_total_views: u64,
    pub theme_video_count: u32,
    pub channel_avg_views: f64,
    pub outlier_score: f64,
    pub tier: OutlierTier,
}

/// Score every theme against the channel baseline, highest scores first.
pub fn theme_outliers(taxonomy: &TaxonomyTree) -> Vec<ThemeOutlier> {
    let channel_avg_views = taxonomy.channel_avg_views();

    let mut outliers: Vec<ThemeOutlier> = taxonomy
        .series
        .iter()
        .flat_map(|series| {
            series.themes.iter().map(|theme| {
                let outlier_score = if channel_avg_views > 0.0 {
                    theme.avg_views / channel_avg_views
                } else {
                    0.0
                };
                ThemeOutlier {
                    series_name: series.name.clone(),
                    theme_name: theme.name.clone(),
                    theme_avg_views: theme.avg_views,
                    theme_total_views: theme.total_views,
                    theme_video_count: theme.video_count,
                    channel_avg_views,
                    outlier_score,
                    tier: outlier_tier(outlier_score),
                }
            })
        })
        .collect();

    outliers.sort_by(|a, b| b.outlier_score.total_cmp(&a.outlier_score));
    outliers
}

// ============================================================================
// Revenue estimation
// ============================================================================

/// Base RPM by average video length bucket (minutes).
pub fn base_rpm(avg_video_duration_minutes: f64) -> f64 {
    if avg_video_duration_minutes >= 180.0 {
        23.5
    } else if avg_video_duration_minutes >= 90.0 {
        14.5
    } else if avg_video_duration_minutes >= 45.0 {
        6.5
    } else if avg_video_duration_minutes >= 20.0 {
        5.0
    } else {
        3.5
    }
}

/// Niche RPM multipliers from public market research. Substring match,
/// defaulting to 0.8 for unknown niches.
pub fn niche_multiplier(niche: &str) -> f64 {
    const MULTIPLIERS: &[(&str, f64)] = &[
        ("Dropshipping", 5.18),
        ("Real Estate", 1.82),
        ("Entrepreneurship", 1.63),
        ("Crypto", 1.49),
        ("Personal Finance", 1.29),
        ("Finance", 1.29),
        ("Digital Products", 1.2),
        ("Aviation", 1.2),
        ("News", 1.2),
        ("Side Hustle", 1.19),
        ("Marketing", 1.18),
        ("Boats", 1.15),
        ("Hustling", 1.15),
        ("Personal Development", 1.1),
        ("Wine", 1.1),
        ("Politics", 1.1),
        ("Automotive", 1.1),
        ("Investing", 1.08),
        ("Astronomy", 1.05),
        ("Productivity", 1.05),
        ("Home Improvement", 1.05),
        ("Spirits", 1.05),
        ("Survival", 1.05),
        ("Technology", 1.04),
        ("Vlogging", 1.03),
        ("Space", 1.0),
        ("Fitness", 1.0),
        ("Beauty", 1.0),
        ("Language Learning", 1.0),
        ("Motorcycles", 1.0),
        ("Business", 0.95),
        ("Motherhood", 0.95),
        ("Science", 0.95),
        ("Fashion", 0.95),
        ("Photography", 0.95),
        ("Beer", 0.95),
        ("Education", 0.92),
        ("Filmmaking", 0.9),
        ("Geology", 0.9),
        ("History", 0.9),
        ("Sports", 0.9),
        ("DIY", 0.9),
        ("Pets", 0.9),
        ("Writing", 0.9),
        ("Food", 0.9),
        ("Outdoors", 0.9),
        ("Affiliate Marketing", 0.87),
        ("Travel", 0.85),
        ("Hunting", 0.85),
        ("Paleontology", 0.85),
        ("Cooking", 0.85),
        ("Gardening", 0.85),
        ("Art", 0.85),
        ("Lifestyle", 0.82),
        ("Archery", 0.8),
        ("Gaming", 0.8),
        ("Music", 0.8),
        ("Print on Demand", 0.78),
        ("Entertainment", 0.77),
    ];

    let niche_lower = niche.to_lowercase();
    for (key, multiplier) in MULTIPLIERS {
        if niche_lower.contains(&key.to_lowercase()) {
            return *multiplier;
        }
    }
    0.8
}

/// Estimated monthly revenue in dollars:
/// `(monthly_views / 1000) × base RPM × niche multiplier`.
pub fn estimate_monthly_revenue(
    monthly_views: f64,
    avg_video_duration_secs: f64,
    niche: &str,
) -> f64 {
    let minutes = if avg_video_duration_secs > 0.0 {
        avg_video_duration_secs / 60.0
    } else {
        10.0
    };
    let rpm = base_rpm(minutes) * niche_multiplier(niche);
    (monthly_views / 1000.0) * rpm
}

#[cfg(test)]
mod tests {
    use super::*;
    use tscout_models::{Series, Theme, Topic};

    fn theme(name: &str, avg_views: f64, count: u32) -> Theme {
        Theme {
            name: name.to_string(),
            topics: (0..count)
                .map(|i| Topic {
                    name: format!("t{i}"),
                    example: format!("example {i}"),
                    views: avg_views as u64,
                    thumbnail_url: String::new(),
                    published_at: None,
                    video_id: None,
                    channel_id: None,
                })
                .collect(),
            total_views: avg_views as u64 * count as u64,
            video_count: count,
            avg_views,
        }
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(outlier_tier(3.0), OutlierTier::Extreme);
        assert_eq!(outlier_tier(2.999), OutlierTier::High);
        assert_eq!(outlier_tier(2.0), OutlierTier::High);
        assert_eq!(outlier_tier(1.999), OutlierTier::Moderate);
        assert_eq!(outlier_tier(1.5), OutlierTier::Moderate);
        assert_eq!(outlier_tier(1.499), OutlierTier::Standard);
        assert_eq!(outlier_tier(0.0), OutlierTier::Standard);
    }

    #[test]
    fn tiering_against_fixed_baseline() {
        let baseline = 1000.0;
        let tiers: Vec<OutlierTier> = [3500.0, 2100.0, 1600.0, 500.0]
            .iter()
            .map(|avg| outlier_tier(avg / baseline))
            .collect();
        assert_eq!(
            tiers,
            vec![
                OutlierTier::Extreme,
                OutlierTier::High,
                OutlierTier::Moderate,
                OutlierTier::Standard
            ]
        );
    }

    #[test]
    fn outlier_board_sorts_by_score() {
        let taxonomy = TaxonomyTree {
            series: vec![Series {
                name: "S".to_string(),
                themes: vec![theme("low", 100.0, 1), theme("high", 900.0, 1)],
                total_views: 1000,
                video_count: 2,
                avg_views: 500.0,
                channels_with_series: vec![],
            }],
        };
        let board = theme_outliers(&taxonomy);
        assert_eq!(board[0].theme_name, "high");
        assert!(board[0].outlier_score > board[1].outlier_score);
        assert!((board[0].channel_avg_views - 500.0).abs() < 1e-9);
    }

    #[test]
    fn zero_baseline_scores_zero() {
        let taxonomy = TaxonomyTree {
            series: vec![Series {
                name: "S".to_string(),
                themes: vec![theme("empty", 0.0, 0)],
                ..Default::default()
            }],
        };
        let board = theme_outliers(&taxonomy);
        assert_eq!(board[0].outlier_score, 0.0);
        assert_eq!(board[0].tier, OutlierTier::Standard);
    }

    #[test]
    fn rpm_buckets() {
        assert_eq!(base_rpm(10.0), 3.5);
        assert_eq!(base_rpm(19.9), 3.5);
        assert_eq!(base_rpm(20.0), 5.0);
        assert_eq!(base_rpm(44.9), 5.0);
        assert_eq!(base_rpm(45.0), 6.5);
        assert_eq!(base_rpm(90.0), 14.5);
        assert_eq!(base_rpm(180.0), 23.5);
        assert_eq!(base_rpm(400.0), 23.5);
    }

    #[test]
    fn niche_multipliers_match_table() {
        assert_eq!(niche_multiplier("Dropshipping"), 5.18);
        assert_eq!(niche_multiplier("real estate investing"), 1.82);
        assert_eq!(niche_multiplier("Gaming"), 0.8);
        assert_eq!(niche_multiplier("Underwater Basket Weaving"), 0.8);
    }

    #[test]
    fn revenue_estimate() {
        // 100k monthly views, 60-minute videos, finance niche:
        // (100_000/1000) × 6.5 × 1.29 = 838.5
        let revenue = estimate_monthly_revenue(100_000.0, 3600.0, "Finance");
        assert!((revenue - 838.5).abs() < 1e-9);
    }

    #[test]
    fn group_metrics_are_means() {
        use tscout_models::{ChannelId, ChannelStats, CompetitorMetrics};
        let competitor = |views: u64, subs: f64, freq: f64| CompetitorChannel {
            channel_id: ChannelId::from("UC"),
            title: String::new(),
            description: String::new(),
            stats: ChannelStats::default(),
            published_at: None,
            thumbnail_url: String::new(),
            videos: vec![],
            matching_series: vec![],
            metrics: CompetitorMetrics {
                upload_frequency: freq,
                monthly_views: views,
                monthly_sub_growth: subs,
                growth_score: 0.0,
                avg_video_duration: 0.0,
                engagement_rate: 0.0,
            },
            total_video_views: 0,
            total_video_likes: 0,
            total_video_comments: 0,
            average_views_per_video: 0.0,
            added_at: chrono::Utc::now(),
        };

        let metrics = group_metrics(&[competitor(1000, 10.0, 4.0), competitor(3000, 30.0, 8.0)]);
        assert!((metrics.avg_monthly_views - 2000.0).abs() < 1e-9);
        assert!((metrics.avg_monthly_subs - 20.0).abs() < 1e-9);
        assert!((metrics.avg_upload_frequency - 6.0).abs() < 1e-9);
        assert_eq!(metrics.total_competitors, 2);

        assert_eq!(group_metrics(&[]), GroupMetrics::default());
    }
}
