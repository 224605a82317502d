//! Deterministic merging and tree construction.

use std::collections::HashMap;

use tscout_models::{
    Series, SeriesWire, TaxonomyTree, Theme, Topic, VideoSummary, MISC_THEME_NAME,
};

/// Merge `incoming` into `running`.
///
/// Series are keyed by trimmed name (case-sensitive after that
/// normalization); themes within a merged series are keyed the same way;
/// topics are concatenated without deduplication, preserving
/// multiplicity.
pub fn merge_wire(running: &mut Vec<SeriesWire>, incoming: Vec<SeriesWire>) {
    for series in incoming {
        let series_key = series.name.trim().to_string();
        match running.iter_mut().find(|s| s.name.trim() == series_key) {
            Some(existing) => {
                for theme in series.themes {
                    let theme_key = theme.name.trim().to_string();
                    match existing.themes.iter_mut().find(|t| t.name.trim() == theme_key) {
                        Some(existing_theme) => existing_theme.topics.extend(theme.topics),
                        None => existing.themes.push(theme),
                    }
                }
            }
            None => running.push(series),
        }
    }
}

/// Build the full tree from the merged wire hierarchy and the input
/// videos, then append any uncovered videos to a "Miscellaneous" theme.
///
/// Each topic row consumes exactly one input video whose title matches
/// its example (case-insensitive, trimmed), highest view count first, so
/// duplicate titles keep their multiplicity. Topic rows with no matching
/// unconsumed video are dropped.
pub fn build_tree(wire: &[SeriesWire], videos: &[VideoSummary]) -> TaxonomyTree {
    // Title → indices of unconsumed videos, best views first.
    let mut by_title: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, video) in videos.iter().enumerate() {
        by_title.entry(title_key(&video.title)).or_default().push(idx);
    }
    for indices in by_title.values_mut() {
        indices.sort_by(|a, b| videos[*b].views.cmp(&videos[*a].views));
    }

    let mut consumed = vec![false; videos.len()];
    let mut tree = TaxonomyTree::default();

    for series_wire in wire {
        let mut series = Series {
            name: series_wire.name.trim().to_string(),
            ..Default::default()
        };
        for theme_wire in &series_wire.themes {
            let mut theme = Theme {
                name: theme_wire.name.trim().to_string(),
                ..Default::default()
            };
            for topic_wire in &theme_wire.topics {
                let Some(idx) = take_video(&mut by_title, &topic_wire.example) else {
                    continue;
                };
                consumed[idx] = true;
                theme.topics.push(topic_from_video(
                    topic_wire.name.clone(),
                    &videos[idx],
                ));
            }
            if !theme.topics.is_empty() {
                series.themes.push(theme);
            }
        }
        if !series.themes.is_empty() {
            tree.series.push(series);
        }
    }

    // Coverage pass: anything the classifier missed lands in a
    // Miscellaneous theme so no input title is ever lost.
    let leftover: Vec<&VideoSummary> = videos
        .iter()
        .enumerate()
        .filter(|(idx, _)| !consumed[*idx])
        .map(|(_, v)| v)
        .collect();

    if !leftover.is_empty() {
        if tree.series.is_empty() {
            tree.series.push(Series {
                name: "Default Series".to_string(),
                ..Default::default()
            });
        }
        let misc = Theme {
            name: MISC_THEME_NAME.to_string(),
            topics: leftover
                .into_iter()
                .map(|video| topic_from_video(first_three_words(&video.title), video))
                .collect(),
            ..Default::default()
        };
        tree.series[0].themes.push(misc);
    }

    tree.recompute();
    tree
}

fn take_video(by_title: &mut HashMap<String, Vec<usize>>, example: &str) -> Option<usize> {
    let indices = by_title.get_mut(&title_key(example))?;
    if indices.is_empty() {
        return None;
    }
    Some(indices.remove(0))
}

fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

fn topic_from_video(name: String, video: &VideoSummary) -> Topic {
    Topic {
        name,
        example: video.title.clone(),
        views: video.views,
        thumbnail_url: video.thumbnail_url.clone(),
        published_at: video.published_at,
        video_id: Some(video.id.clone()),
        channel_id: Some(video.channel_id.clone()),
    }
}

fn first_three_words(title: &str) -> String {
    title.split_whitespace().take(3).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tscout_models::{ChannelId, ThemeWire, TopicWire, VideoId};

    fn video(title: &str, views: u64) -> VideoSummary {
        VideoSummary {
            id: VideoId::from(format!("v-{title}-{views}")),
            title: title.to_string(),
            views,
            likes: 0,
            comments: 0,
            duration_seconds: 0,
            published_at: None,
            thumbnail_url: String::new(),
            channel_id: ChannelId::from("UCseed"),
        }
    }

    fn wire(series: &str, theme: &str, examples: &[&str]) -> SeriesWire {
        SeriesWire {
            name: series.to_string(),
            themes: vec![ThemeWire {
                name: theme.to_string(),
                topics: examples
                    .iter()
                    .map(|e| TopicWire {
                        name: e.split_whitespace().next().unwrap_or("").to_string(),
                        example: e.to_string(),
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn merge_prefers_existing_series_and_themes() {
        let mut running = vec![wire("History for Sleep", "Rome", &["The Fall of Rome"])];
        merge_wire(
            &mut running,
            vec![
                wire("History for Sleep", "Rome", &["Caesar's Last Day"]),
                wire("History for Sleep", "Egypt", &["Cleopatra's Secret"]),
                wire("True Crime", "Cold Cases", &["The Missing Heir"]),
            ],
        );

        assert_eq!(running.len(), 2);
        let history = &running[0];
        assert_eq!(history.themes.len(), 2);
        assert_eq!(history.themes[0].topics.len(), 2);
    }

    #[test]
    fn merge_preserves_topic_multiplicity() {
        let mut running = vec![wire("S", "T", &["Same Title"])];
        merge_wire(&mut running, vec![wire("S", "T", &["Same Title"])]);
        assert_eq!(running[0].themes[0].topics.len(), 2);
    }

    #[test]
    fn build_tree_joins_video_stats() {
        let videos = vec![video("The Fall of Rome", 5000), video("Caesar's Last Day", 100)];
        let wire = vec![wire(
            "History for Sleep",
            "Rome",
            &["The Fall of Rome", "Caesar's Last Day"],
        )];

        let tree = build_tree(&wire, &videos);
        assert_eq!(tree.topic_count(), 2);
        let theme = &tree.series[0].themes[0];
        assert_eq!(theme.total_views, 5100);
        assert_eq!(theme.video_count, 2);
    }

    #[test]
    fn duplicate_titles_keep_multiplicity() {
        // 90 copies of the same title, classified as 90 topic rows.
        let videos: Vec<VideoSummary> = (0..90)
            .map(|i| video("Greek Mythology for Sleep", 100 + i))
            .collect();
        let examples: Vec<&str> = vec!["Greek Mythology for Sleep"; 90];
        let wire = vec![wire("Mythology for Sleep", "Greek", &examples)];

        let tree = build_tree(&wire, &videos);
        let count = tree
            .all_example_titles()
            .iter()
            .filter(|t| **t == "Greek Mythology for Sleep")
            .count();
        assert_eq!(count, 90);
    }

    #[test]
    fn uncovered_titles_land_in_miscellaneous() {
        let videos = vec![
            video("The Fall of Rome", 5000),
            video("A Video Nobody Classified", 10),
        ];
        let wire = vec![wire("History for Sleep", "Rome", &["The Fall of Rome"])];

        let tree = build_tree(&wire, &videos);
        assert_eq!(tree.topic_count(), 2);

        let misc = tree
            .series
            .iter()
            .flat_map(|s| &s.themes)
            .find(|t| t.name == MISC_THEME_NAME)
            .expect("miscellaneous theme");
        assert_eq!(misc.topics.len(), 1);
        assert_eq!(misc.topics[0].name, "A Video Nobody");
        assert_eq!(misc.topics[0].example, "A Video Nobody Classified");
    }

    #[test]
    fn empty_wire_still_covers_everything() {
        let videos = vec![video("Only Video", 42)];
        let tree = build_tree(&[], &videos);
        assert_eq!(tree.series.len(), 1);
        assert_eq!(tree.series[0].name, "Default Series");
        assert_eq!(tree.topic_count(), 1);
    }

    #[test]
    fn duplicate_rows_consume_highest_views_first() {
        let videos = vec![video("Same Title", 10), video("Same Title", 9000)];
        let wire = vec![wire("S", "T", &["Same Title"])];

        let tree = build_tree(&wire, &videos);
        // The classified row takes the 9000-view copy; the other copy
        // falls through to Miscellaneous. Themes sort by avg views, so
        // the classified theme comes first.
        assert_eq!(tree.series[0].themes[0].topics[0].views, 9000);
        assert_eq!(tree.topic_count(), 2);
    }
}
