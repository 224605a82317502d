//! Firestore integration tests.
//!
//! These run against a live Firestore (GCP credentials required) and are
//! ignored by default: `cargo test -p tscout-firestore -- --ignored`

use tscout_firestore::{FirestoreClient, JobRepository, ProjectRepository, SecretsRepository};
use tscout_models::{
    ChannelId, ChannelStats, Job, JobKind, JobState, Project, SeedChannel, UserSecret,
};

fn sample_project() -> Project {
    Project::new(
        "integration test project",
        "integration_test_user",
        SeedChannel {
            id: ChannelId::from("UCintegrationtest"),
            title: "Integration Seed".to_string(),
            stats: ChannelStats {
                subscriber_count: 1,
                video_count: 1,
                view_count: 1,
            },
            description: String::new(),
            published_at: None,
            thumbnail_url: String::new(),
        },
        vec![],
    )
}

#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn project_crud_cycle() {
    dotenvy::dotenv().ok();

    let client = FirestoreClient::from_env().await.expect("client");
    let repo = ProjectRepository::new(client);

    let project = sample_project();
    repo.create(&project).await.expect("create");

    let loaded = repo.get(&project.id).await.expect("get").expect("exists");
    assert_eq!(loaded.name, project.name);
    assert_eq!(loaded.seed_channel.id, project.seed_channel.id);

    repo.delete(&project.id).await.expect("delete");
    assert!(repo.get(&project.id).await.expect("get").is_none());
}

#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn job_progress_and_cancel_flag() {
    dotenvy::dotenv().ok();

    let client = FirestoreClient::from_env().await.expect("client");
    let repo = JobRepository::new(client);

    let job = Job::new(JobKind::CreateProject, "integration_test_user", None);
    repo.create(&job).await.expect("create");

    let updated = job.clone().with_progress(42, "integration step");
    repo.put(&updated).await.expect("put");

    repo.request_cancel(&job.id).await.expect("cancel");

    let loaded = repo.get(&job.id).await.expect("get").expect("exists");
    assert_eq!(loaded.progress, 42);
    assert_eq!(loaded.state, JobState::Running);
    assert!(loaded.cancel_requested);
}

#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn secret_upsert_and_snapshot() {
    dotenvy::dotenv().ok();

    let client = FirestoreClient::from_env().await.expect("client");
    let repo = SecretsRepository::new(client);

    let now = chrono::Utc::now();
    let secret = UserSecret {
        user_id: "integration_test_user".to_string(),
        service: "anthropic".to_string(),
        api_key: "sk-test-integration".to_string(),
        created_at: now,
        updated_at: now,
    };
    repo.put(&secret).await.expect("put");

    let snapshot = repo
        .snapshot_for_user("integration_test_user")
        .await
        .expect("snapshot");
    assert_eq!(snapshot.get("anthropic"), Some("sk-test-integration"));

    repo.delete("integration_test_user", "anthropic")
        .await
        .expect("delete");
}
