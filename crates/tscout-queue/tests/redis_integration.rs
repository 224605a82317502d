//! Redis queue integration tests.
//!
//! These run against a live Redis and are ignored by default:
//! `cargo test -p tscout-queue -- --ignored`

use tscout_models::{JobId, ProjectId};
use tscout_queue::{CreateProjectJob, JobQueue, QueueJob};

#[tokio::test]
#[ignore = "requires Redis"]
async fn redis_connection_and_lengths() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("failed to create queue");
    queue.init().await.expect("failed to initialize queue");

    let len = queue.len().await.expect("failed to get queue length");
    println!("queue length: {len}");
    let dlq = queue.dlq_len().await.expect("failed to get DLQ length");
    println!("DLQ length: {dlq}");
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn enqueue_consume_ack_cycle() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("failed to create queue");
    queue.init().await.expect("failed to initialize queue");

    let job = CreateProjectJob::new(
        JobId::new(),
        "integration_test_user",
        ProjectId::new(),
        "integration test project",
        "https://www.youtube.com/@integrationtest",
    );
    let job_id = job.job_id.clone();
    let wrapper = QueueJob::CreateProject(job);

    queue.enqueue(wrapper.clone()).await.expect("failed to enqueue");

    // A duplicate enqueue within the dedup window must be rejected.
    assert!(queue.enqueue(wrapper.clone()).await.is_err());

    let consumed = queue
        .consume("integration-test-consumer", 2000, 10)
        .await
        .expect("failed to consume");
    let found = consumed.iter().find(|(_, job)| job.job_id() == &job_id);
    let (message_id, consumed_job) = found.expect("enqueued job not consumed");

    assert_eq!(consumed_job.user_id(), "integration_test_user");

    queue.ack(message_id).await.expect("failed to ack");
    queue
        .clear_dedup(consumed_job)
        .await
        .expect("failed to clear dedup");
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn retry_counter_round_trip() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("failed to create queue");
    let message_id = format!("test-{}", uuid::Uuid::new_v4());

    assert_eq!(queue.get_retry_count(&message_id).await.unwrap(), 0);
    assert_eq!(queue.increment_retry(&message_id).await.unwrap(), 1);
    assert_eq!(queue.increment_retry(&message_id).await.unwrap(), 2);
    assert_eq!(queue.get_retry_count(&message_id).await.unwrap(), 2);
}
