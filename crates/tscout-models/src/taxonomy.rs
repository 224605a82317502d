//! The series → theme → topic taxonomy.
//!
//! A [`TaxonomyTree`] is owned by a project and produced by the taxonomy
//! extractor. The wire shapes at the bottom of this file are the exact
//! JSON contract spoken with the classification model:
//!
//! ```json
//! { "series": [ { "name": S, "themes": [ { "name": T,
//!   "topics": [ { "name": N, "example": E } ] } ] } ] }
//! ```

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, VideoId};

/// Theme that collects titles the classifier failed to place.
pub const MISC_THEME_NAME: &str = "Miscellaneous";

/// One video standing in a theme. Its canonical identifier is the exact
/// example title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Topic {
    /// Contiguous phrase lifted from the title
    pub name: String,
    /// The exact video title
    pub example: String,
    /// View count of the backing video
    pub views: u64,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<VideoId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
}

/// A subcategory within a series grouping topically similar videos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Theme {
    pub name: String,
    pub topics: Vec<Topic>,
    pub total_views: u64,
    pub video_count: u32,
    pub avg_views: f64,
}

impl Theme {
    /// Recompute totals and the average from the topic list.
    pub fn recompute(&mut self) {
        self.total_views = self.topics.iter().map(|t| t.views).sum();
        self.video_count = self.topics.len() as u32;
        self.avg_views = if self.video_count == 0 {
            0.0
        } else {
            self.total_views as f64 / self.video_count as f64
        };
    }
}

/// A cluster of videos sharing a recurring title structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Series {
    pub name: String,
    pub themes: Vec<Theme>,
    pub total_views: u64,
    pub video_count: u32,
    pub avg_views: f64,
    /// Channels observed carrying this series (seed plus matched competitors).
    #[serde(default)]
    pub channels_with_series: Vec<ChannelId>,
}

impl Series {
    /// Recompute aggregates bottom-up and re-sort themes by average views.
    pub fn recompute(&mut self) {
        for theme in &mut self.themes {
            theme.recompute();
        }
        self.themes.retain(|t| !t.topics.is_empty());
        self.themes
            .sort_by(|a, b| b.avg_views.total_cmp(&a.avg_views));
        self.total_views = self.themes.iter().map(|t| t.total_views).sum();
        self.video_count = self.themes.iter().map(|t| t.video_count).sum();
        self.avg_views = if self.video_count == 0 {
            0.0
        } else {
            self.total_views as f64 / self.video_count as f64
        };
    }

    /// All example titles in this series, in theme order.
    pub fn example_titles(&self) -> Vec<&str> {
        self.themes
            .iter()
            .flat_map(|t| t.topics.iter().map(|topic| topic.example.as_str()))
            .collect()
    }
}

/// Ordered sequence of series, sorted by average views descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct TaxonomyTree {
    pub series: Vec<Series>,
}

impl TaxonomyTree {
    /// Recompute every aggregate and restore the sort invariants:
    /// series by `avg_views` descending, themes within each series the same.
    pub fn recompute(&mut self) {
        for series in &mut self.series {
            series.recompute();
        }
        self.series.retain(|s| !s.themes.is_empty());
        self.series
            .sort_by(|a, b| b.avg_views.total_cmp(&a.avg_views));
    }

    /// Total number of topic rows (one per classified video).
    pub fn topic_count(&self) -> usize {
        self.series
            .iter()
            .flat_map(|s| &s.themes)
            .map(|t| t.topics.len())
            .sum()
    }

    /// Channel-wide baseline: total views over total videos.
    pub fn channel_avg_views(&self) -> f64 {
        let total_views: u64 = self.series.iter().map(|s| s.total_views).sum();
        let total_videos: u32 = self.series.iter().map(|s| s.video_count).sum();
        if total_videos == 0 {
            0.0
        } else {
            total_views as f64 / total_videos as f64
        }
    }

    /// All example titles across the tree.
    pub fn all_example_titles(&self) -> Vec<&str> {
        self.series
            .iter()
            .flat_map(|s| s.example_titles())
            .collect()
    }

    /// Project into the interop wire shape.
    pub fn to_wire(&self) -> Vec<SeriesWire> {
        self.series
            .iter()
            .map(|s| SeriesWire {
                name: s.name.clone(),
                themes: s
                    .themes
                    .iter()
                    .map(|t| ThemeWire {
                        name: t.name.clone(),
                        topics: t
                            .topics
                            .iter()
                            .map(|topic| TopicWire {
                                name: topic.name.clone(),
                                example: topic.example.clone(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect()
    }
}

// ============================================================================
// Wire shapes (bit-exact interop with the classification model)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TopicWire {
    pub name: String,
    pub example: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThemeWire {
    pub name: String,
    #[serde(default)]
    pub topics: Vec<TopicWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SeriesWire {
    pub name: String,
    #[serde(default)]
    pub themes: Vec<ThemeWire>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(example: &str, views: u64) -> Topic {
        Topic {
            name: example.split_whitespace().next().unwrap_or("").to_string(),
            example: example.to_string(),
            views,
            thumbnail_url: String::new(),
            published_at: None,
            video_id: None,
            channel_id: None,
        }
    }

    fn tree() -> TaxonomyTree {
        TaxonomyTree {
            series: vec![
                Series {
                    name: "Low".to_string(),
                    themes: vec![Theme {
                        name: "A".to_string(),
                        topics: vec![topic("a one", 100), topic("a two", 200)],
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                Series {
                    name: "High".to_string(),
                    themes: vec![
                        Theme {
                            name: "Cold".to_string(),
                            topics: vec![topic("c one", 1_000)],
                            ..Default::default()
                        },
                        Theme {
                            name: "Hot".to_string(),
                            topics: vec![topic("h one", 9_000)],
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn recompute_sorts_series_and_themes_by_avg_views() {
        let mut tree = tree();
        tree.recompute();

        assert_eq!(tree.series[0].name, "High");
        assert_eq!(tree.series[1].name, "Low");
        assert_eq!(tree.series[0].themes[0].name, "Hot");
        assert_eq!(tree.series[0].themes[1].name, "Cold");
    }

    #[test]
    fn recompute_fills_aggregates() {
        let mut tree = tree();
        tree.recompute();

        let low = &tree.series[1];
        assert_eq!(low.total_views, 300);
        assert_eq!(low.video_count, 2);
        assert!((low.avg_views - 150.0).abs() < f64::EPSILON);
        assert!((tree.channel_avg_views() - 10_300.0 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn wire_shape_matches_interop_contract() {
        let mut tree = tree();
        tree.recompute();
        let wire = tree.to_wire();
        let json = serde_json::to_value(&wire).unwrap();

        let first_topic = &json[0]["themes"][0]["topics"][0];
        assert!(first_topic.get("name").is_some());
        assert!(first_topic.get("example").is_some());
        assert!(first_topic.get("views").is_none());
    }

    #[test]
    fn empty_tree_has_zero_baseline() {
        let tree = TaxonomyTree::default();
        assert_eq!(tree.channel_avg_views(), 0.0);
        assert_eq!(tree.topic_count(), 0);
    }
}
