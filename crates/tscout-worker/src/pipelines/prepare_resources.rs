//! Resource preparation: script breakdown plus thumbnail guidelines
//! (and fine-tune training when a base model version is configured).

use tracing::{info, warn};

use tscout_models::{resource_key, ThemeResources, Theme, ThumbnailAssets};
use tscout_queue::PrepareResourcesJob;
use tscout_script::{BreakdownGenerator, BreakdownSource};
use tscout_thumbnail::{ReferenceImage, ThumbnailAnalyzer};

use crate::context::{UserContext, WorkerContext};
use crate::error::{WorkerError, WorkerResult};
use crate::pipelines::{load_project, update_project};
use crate::progress::JobTracker;

/// Transcripts analyzed per theme.
const MAX_SOURCE_VIDEOS: usize = 3;

pub async fn run(
    ctx: &WorkerContext,
    user: &UserContext,
    mut tracker: JobTracker,
    job: PrepareResourcesJob,
) -> WorkerResult<()> {
    let youtube = user.youtube()?;
    let llm = user.llm()?;

    let project = load_project(ctx, &job.project_id).await?;
    let theme = find_theme(&project.taxonomy.series, &job.series_name, &job.theme_name)
        .ok_or_else(|| {
            WorkerError::job_failed(format!(
                "theme '{}' not found in series '{}'",
                job.theme_name, job.series_name
            ))
        })?
        .clone();

    // Highest-view topics with a backing video drive the analysis.
    let mut topics: Vec<_> = theme
        .topics
        .iter()
        .filter(|t| t.video_id.is_some())
        .collect();
    topics.sort_by(|a, b| b.views.cmp(&a.views));
    topics.truncate(MAX_SOURCE_VIDEOS);
    if topics.is_empty() {
        return Err(WorkerError::job_failed("theme has no videos to analyze"));
    }

    tracker.checkpoint(10, "fetching transcripts").await?;
    let mut transcripts = Vec::new();
    for topic in &topics {
        let Some(video_id) = topic.video_id.as_ref() else {
            continue;
        };
        match youtube.get_transcript(video_id).await {
            Ok(Some(transcript)) => {
                let detail = youtube.get_video(video_id).await.ok();
                transcripts.push((topic, transcript, detail));
            }
            Ok(None) => {
                tracker
                    .warn(format!("no transcript for '{}'", topic.example))
                    .await?;
            }
            Err(e) => {
                tracker
                    .warn(format!("transcript fetch failed for '{}': {e}", topic.example))
                    .await?;
            }
        }
    }
    if transcripts.is_empty() {
        return Err(WorkerError::job_failed("no transcripts available for theme"));
    }

    tracker.checkpoint(30, "analyzing writing style").await?;
    let sources: Vec<BreakdownSource<'_>> = transcripts
        .iter()
        .map(|(topic, transcript, detail)| BreakdownSource {
            title: &topic.example,
            description: "",
            duration_secs: detail.as_ref().map(|d| d.duration_seconds).unwrap_or(0),
            transcript,
        })
        .collect();

    let generator = BreakdownGenerator::new(llm.clone());
    let breakdown = generator
        .breakdown(&job.project_id, &job.series_name, &job.theme_name, &sources)
        .await?;

    tracker.checkpoint(55, "analyzing reference thumbnails").await?;
    let references = fetch_reference_images(&theme).await;
    let mut assets = ThumbnailAssets {
        trigger_word: Some(trigger_word(&job.series_name)),
        ..Default::default()
    };

    if references.is_empty() {
        tracker
            .warn("no reference thumbnails could be fetched; skipping guideline analysis")
            .await?;
    } else {
        let analyzer = ThumbnailAnalyzer::new(llm);
        match analyzer.analyze_references(&job.series_name, &references).await {
            Ok(guidelines) => assets.guidelines = Some(guidelines),
            Err(e) => {
                tracker
                    .warn(format!("thumbnail guideline analysis failed: {e}"))
                    .await?;
            }
        }
    }

    // Fine-tune training is optional: it needs a configured base version
    // and successfully analyzed guidelines.
    if let Some(base_version) = ctx.config.image_model_base_version.as_deref() {
        if assets.guidelines.is_some() {
            tracker.checkpoint(70, "training thumbnail model").await?;
            let image_model = user.image_model()?;
            let training_images: Vec<String> = theme
                .topics
                .iter()
                .map(|t| t.thumbnail_url.clone())
                .filter(|url| !url.is_empty())
                .collect();
            let trigger = assets.trigger_word.clone().unwrap_or_default();

            match image_model
                .train(base_version, &training_images.join(","), &trigger)
                .await
            {
                Ok(outcome) => {
                    assets.trained_model_version = Some(outcome.version);
                    info!(series = %job.series_name, "thumbnail model trained");
                }
                Err(e) => {
                    tracker.warn(format!("thumbnail training failed: {e}")).await?;
                }
            }
        }
    }

    tracker.checkpoint(90, "saving resources").await?;
    let key = resource_key(&job.series_name, &job.theme_name);
    update_project(ctx, &job.project_id, |project| {
        let resources = project
            .content_resources
            .entry(key.clone())
            .or_insert_with(|| ThemeResources::new(&job.series_name, &job.theme_name));
        resources.script_breakdown = Some(breakdown.clone());
        let thumbnail = resources.thumbnail.get_or_insert_with(ThumbnailAssets::default);
        if assets.guidelines.is_some() {
            thumbnail.guidelines = assets.guidelines.clone();
        }
        if assets.trained_model_version.is_some() {
            thumbnail.trained_model_version = assets.trained_model_version.clone();
        }
        if thumbnail.trigger_word.is_none() {
            thumbnail.trigger_word = assets.trigger_word.clone();
        }
    })
    .await?;

    tracker
        .complete(format!("projects/{}/content_resources/{key}", job.project_id))
        .await
}

fn find_theme<'a>(
    series: &'a [tscout_models::Series],
    series_name: &str,
    theme_name: &str,
) -> Option<&'a Theme> {
    series
        .iter()
        .find(|s| s.name == series_name)?
        .themes
        .iter()
        .find(|t| t.name == theme_name)
}

/// Download the theme's topic thumbnails as reference images.
async fn fetch_reference_images(theme: &Theme) -> Vec<ReferenceImage> {
    let client = reqwest::Client::new();
    let mut references = Vec::new();

    for topic in theme.topics.iter().take(6) {
        if topic.thumbnail_url.is_empty() {
            continue;
        }
        match client.get(&topic.thumbnail_url).send().await {
            Ok(response) if response.status().is_success() => {
                let media_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("image/jpeg")
                    .to_string();
                if let Ok(bytes) = response.bytes().await {
                    references.push(ReferenceImage {
                        media_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            Ok(response) => {
                warn!("thumbnail fetch returned {}", response.status());
            }
            Err(e) => {
                warn!("thumbnail fetch failed: {e}");
            }
        }
    }

    references
}

/// Derive the fine-tune trigger word from the series name.
fn trigger_word(series_name: &str) -> String {
    let word: String = series_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();
    if word.is_empty() {
        "TSCOUTSTYLE".to_string()
    } else {
        word.chars().take(16).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_word_is_upper_alnum() {
        assert_eq!(trigger_word("History for Sleep 2.0"), "HISTORYFORSLEEP2");
        assert_eq!(trigger_word("!!!"), "TSCOUTSTYLE");
    }
}
