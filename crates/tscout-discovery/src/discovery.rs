//! Topic-driven competitor discovery.

use std::collections::BTreeMap;

use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use tscout_models::{
    CandidateChannel, CandidateVideo, ChannelId, ChannelStats, TaxonomyTree,
};
use tscout_youtube::{SearchResult, YoutubeClient};

use crate::error::DiscoveryResult;

/// Results requested per topic query.
pub const MAX_RESULTS_PER_TOPIC: usize = 50;

/// Candidates collected per series before the fan-out stops appending.
pub const MAX_CANDIDATES_PER_SERIES: usize = 10;

/// Concurrent search / channel-stat requests per discovery run.
pub const FANOUT_CONCURRENCY: usize = 8;

/// What a discovery run produces, ready to persist on the project.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    /// Series-name → ordered candidate list.
    pub potential_competitors: BTreeMap<String, Vec<CandidateChannel>>,
    /// Series-name → query → raw search hits.
    pub search_results: BTreeMap<String, BTreeMap<String, Vec<CandidateVideo>>>,
}

/// Search-driven candidate discovery over a project's taxonomy.
pub struct CompetitorDiscovery<'a> {
    youtube: &'a YoutubeClient,
}

impl<'a> CompetitorDiscovery<'a> {
    pub fn new(youtube: &'a YoutubeClient) -> Self {
        Self { youtube }
    }

    /// Fan out one search per topic example title, series by series.
    ///
    /// The seed channel never appears among the candidates. Individual
    /// query failures are swallowed; a series stops collecting once it
    /// has [`MAX_CANDIDATES_PER_SERIES`] candidates.
    pub async fn discover(
        &self,
        seed_channel_id: &ChannelId,
        taxonomy: &TaxonomyTree,
    ) -> DiscoveryResult<DiscoveryOutcome> {
        let mut outcome = DiscoveryOutcome::default();

        for series in &taxonomy.series {
            let queries: Vec<String> = series
                .themes
                .iter()
                .flat_map(|theme| theme.topics.iter().map(|topic| topic.example.clone()))
                .collect();

            // Bounded fan-out; results come back in query order so the
            // candidate list stays deterministic.
            let searches: Vec<(String, Option<Vec<SearchResult>>)> = stream::iter(queries)
                .map(|query| async move {
                    match self.youtube.search(&query, MAX_RESULTS_PER_TOPIC).await {
                        Ok(results) => (query, Some(results)),
                        Err(e) => {
                            warn!("search for '{query}' failed: {e}");
                            (query, None)
                        }
                    }
                })
                .buffered(FANOUT_CONCURRENCY)
                .collect()
                .await;

            let mut series_results: BTreeMap<String, Vec<CandidateVideo>> = BTreeMap::new();
            let mut picked: Vec<SearchResult> = Vec::new();

            for (query, results) in searches {
                let Some(results) = results else { continue };
                series_results.insert(
                    query,
                    results
                        .iter()
                        .map(|hit| CandidateVideo {
                            id: hit.video_id.clone(),
                            title: hit.title.clone(),
                            thumbnail_url: hit.thumbnail_url.clone(),
                            published_at: hit.published_at,
                        })
                        .collect(),
                );

                for hit in results {
                    if picked.len() >= MAX_CANDIDATES_PER_SERIES {
                        break;
                    }
                    if hit.channel_id.as_str().is_empty()
                        || &hit.channel_id == seed_channel_id
                        || picked.iter().any(|p| p.channel_id == hit.channel_id)
                    {
                        continue;
                    }
                    picked.push(hit);
                }
            }

            // Enrich the picked channels with full stats, best effort.
            let candidates: Vec<CandidateChannel> = stream::iter(picked)
                .map(|hit| async move {
                    match self.youtube.fetch_channel(&hit.channel_id).await {
                        Ok(channel) => CandidateChannel {
                            id: channel.id,
                            title: channel.title,
                            stats: channel.stats,
                            thumbnail_url: channel.thumbnail_url,
                            video: CandidateVideo {
                                id: hit.video_id,
                                title: hit.title,
                                thumbnail_url: hit.thumbnail_url,
                                published_at: hit.published_at,
                            },
                        },
                        Err(e) => {
                            warn!("failed to fetch stats for {}: {e}", hit.channel_id);
                            CandidateChannel {
                                id: hit.channel_id.clone(),
                                title: hit.channel_title.clone(),
                                stats: ChannelStats::default(),
                                thumbnail_url: String::new(),
                                video: CandidateVideo {
                                    id: hit.video_id,
                                    title: hit.title,
                                    thumbnail_url: hit.thumbnail_url,
                                    published_at: hit.published_at,
                                },
                            }
                        }
                    }
                })
                .buffered(FANOUT_CONCURRENCY)
                .collect()
                .await;

            if !candidates.is_empty() {
                info!(
                    series = %series.name,
                    count = candidates.len(),
                    "collected candidate competitors"
                );
                outcome
                    .potential_competitors
                    .insert(series.name.clone(), candidates);
            }
            outcome
                .search_results
                .insert(series.name.clone(), series_results);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tscout_youtube::YoutubeConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use tscout_models::{Series, Theme, Topic};

    fn taxonomy(examples: &[&str]) -> TaxonomyTree {
        TaxonomyTree {
            series: vec![Series {
                name: "History for Sleep".to_string(),
                themes: vec![Theme {
                    name: "Rome".to_string(),
                    topics: examples
                        .iter()
                        .map(|e| Topic {
                            name: e.to_string(),
                            example: e.to_string(),
                            views: 10,
                            thumbnail_url: String::new(),
                            published_at: None,
                            video_id: None,
                            channel_id: None,
                        })
                        .collect(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    fn search_items(hits: &[(&str, &str, &str)]) -> serde_json::Value {
        json!({
            "items": hits.iter().map(|(video_id, channel_id, title)| json!({
                "id": {"videoId": video_id},
                "snippet": {
                    "title": title,
                    "channelId": channel_id,
                    "channelTitle": format!("channel {channel_id}"),
                }
            })).collect::<Vec<_>>()
        })
    }

    fn channel_item(id: &str, subs: u64) -> serde_json::Value {
        json!({
            "items": [{
                "id": id,
                "snippet": {"title": format!("channel {id}"), "description": ""},
                "statistics": {
                    "subscriberCount": subs.to_string(),
                    "videoCount": "10",
                    "viewCount": "1000"
                },
                "contentDetails": {"relatedPlaylists": {"uploads": format!("UU{id}")}}
            }]
        })
    }

    #[tokio::test]
    async fn discovery_excludes_seed_and_dedupes_channels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_items(&[
                ("v1", "UCseed", "a seed video"),
                ("v2", "UCrival", "a rival video"),
                ("v3", "UCrival", "another rival video"),
                ("v4", "UCother", "someone else"),
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("id", "UCrival"))
            .respond_with(ResponseTemplate::new(200).set_body_json(channel_item("UCrival", 5000)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("id", "UCother"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let youtube = YoutubeClient::new(
            YoutubeConfig::new(vec!["k".to_string()])
                .with_api_base_url(server.uri())
                .with_web_base_url(server.uri()),
        )
        .unwrap();
        let discovery = CompetitorDiscovery::new(&youtube);

        let outcome = discovery
            .discover(&ChannelId::from("UCseed"), &taxonomy(&["The Fall of Rome"]))
            .await
            .unwrap();

        let candidates = &outcome.potential_competitors["History for Sleep"];
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.id.as_str() != "UCseed"));
        // Enriched candidate carries real stats; the failed fetch falls
        // back to the search-hit shell.
        assert_eq!(candidates[0].id.as_str(), "UCrival");
        assert_eq!(candidates[0].stats.subscriber_count, 5000);
        assert_eq!(candidates[1].id.as_str(), "UCother");
        assert_eq!(candidates[1].stats.subscriber_count, 0);
    }

    #[tokio::test]
    async fn failed_queries_are_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let youtube = YoutubeClient::new(
            YoutubeConfig::new(vec!["k".to_string()])
                .with_api_base_url(server.uri())
                .with_web_base_url(server.uri()),
        )
        .unwrap();
        let discovery = CompetitorDiscovery::new(&youtube);

        let outcome = discovery
            .discover(&ChannelId::from("UCseed"), &taxonomy(&["Anything"]))
            .await
            .unwrap();
        assert!(outcome.potential_competitors.is_empty());
    }
}
