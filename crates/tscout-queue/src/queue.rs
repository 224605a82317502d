//! Job queue using Redis Streams.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::QueueJob;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Dead letter queue stream name
    pub dlq_stream_name: String,
    /// Max retries before DLQ
    pub max_retries: u32,
    /// How long a job may sit unacknowledged before another worker may
    /// claim it
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "tscout:jobs".to_string(),
            consumer_group: "tscout:workers".to_string(),
            dlq_stream_name: "tscout:dlq".to_string(),
            max_retries: 3,
            visibility_timeout: Duration::from_secs(1800),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP").unwrap_or(defaults.consumer_group),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream_name),
            max_retries: std::env::var("QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.visibility_timeout.as_secs()),
            ),
        }
    }
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Enqueue a job. Rejects duplicates via the payload's idempotency key.
    pub async fn enqueue(&self, job: QueueJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(&job)?;
        let idempotency_key = job.idempotency_key();

        let dedup_key = format!("tscout:dedup:{idempotency_key}");
        let exists: bool = conn.exists(&dedup_key).await?;
        if exists {
            warn!("duplicate job rejected: {}", idempotency_key);
            return Err(QueueError::enqueue_failed("duplicate job"));
        }

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("key")
            .arg(&idempotency_key)
            .query_async(&mut conn)
            .await?;

        // Dedup window: 1 hour.
        conn.set_ex::<_, _, ()>(&dedup_key, "1", 3600).await?;

        info!("enqueued job {} with message ID {}", job.job_id(), message_id);
        Ok(message_id)
    }

    /// Acknowledge a job (mark as completed) and drop it from the stream.
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("acknowledged job: {}", message_id);
        Ok(())
    }

    /// Clear the deduplication key for a job so it can be re-run later.
    pub async fn clear_dedup(&self, job: &QueueJob) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let dedup_key = format!("tscout:dedup:{}", job.idempotency_key());
        conn.del::<_, ()>(&dedup_key).await?;
        Ok(())
    }

    /// Move a job to the dead letter queue.
    pub async fn dlq(&self, message_id: &str, job: &QueueJob, error: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(job)?;
        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(message_id).await?;

        warn!("moved job {} to DLQ: {}", job.job_id(), error);
        Ok(())
    }

    /// Consume new jobs from the queue.
    /// Returns (message_id, job) pairs.
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, QueueJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();
        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();
                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<QueueJob>(&payload_str) {
                        Ok(job) => {
                            debug!("consumed job {} from stream", job.job_id());
                            jobs.push((message_id, job));
                        }
                        Err(e) => {
                            warn!("failed to parse job payload: {}", e);
                            // Ack the malformed message to prevent reprocessing.
                            self.ack(&message_id).await.ok();
                        }
                    }
                }
            }
        }

        Ok(jobs)
    }

    /// Claim jobs left pending by crashed workers.
    ///
    /// Uses XAUTOCLAIM with the configured visibility timeout as the
    /// minimum idle time.
    pub async fn claim_stale(
        &self,
        consumer_name: &str,
        count: usize,
    ) -> QueueResult<Vec<(String, QueueJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let reply: redis::streams::StreamAutoClaimReply = redis::cmd("XAUTOCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(self.config.visibility_timeout.as_millis() as u64)
            .arg("0-0")
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();
        for entry in reply.claimed {
            let message_id = entry.id.clone();
            if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                let payload_str = String::from_utf8_lossy(payload);
                match serde_json::from_str::<QueueJob>(&payload_str) {
                    Ok(job) => {
                        info!("claimed stale job {} from stream", job.job_id());
                        jobs.push((message_id, job));
                    }
                    Err(e) => {
                        warn!("failed to parse claimed job payload: {}", e);
                        self.ack(&message_id).await.ok();
                    }
                }
            }
        }

        Ok(jobs)
    }

    /// Get retry count for a message.
    pub async fn get_retry_count(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("tscout:retry:{message_id}");
        let count: Option<u32> = conn.get(&key).await?;
        Ok(count.unwrap_or(0))
    }

    /// Increment retry count for a message.
    pub async fn increment_retry(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("tscout:retry:{message_id}");
        let count: u32 = conn.incr(&key, 1).await?;
        conn.expire::<_, ()>(&key, 86400).await?;
        Ok(count)
    }

    /// Queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    /// DLQ length.
    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }

    /// Max retries from config.
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}
