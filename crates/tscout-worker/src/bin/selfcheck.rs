//! Configuration and connectivity self-check.
//!
//! Exit codes: 0 success, 2 validation error, 3 missing secret,
//! 4 transient upstream failure, 5 quota exceeded.

use tscout_llm::{ChatRequest, LlmClient, LlmConfig, LlmError};
use tscout_youtube::{YoutubeClient, YoutubeConfig, YoutubeError};

const EXIT_OK: i32 = 0;
const EXIT_VALIDATION: i32 = 2;
const EXIT_MISSING_SECRET: i32 = 3;
const EXIT_TRANSIENT: i32 = 4;
const EXIT_QUOTA: i32 = 5;

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");
    dotenvy::dotenv().ok();

    std::process::exit(run().await);
}

async fn run() -> i32 {
    // Secrets present?
    let llm_config = match LlmConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("missing secret: {e}");
            return EXIT_MISSING_SECRET;
        }
    };
    let youtube_config = match YoutubeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("missing secret: {e}");
            return EXIT_MISSING_SECRET;
        }
    };

    let llm = match LlmClient::new(llm_config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("invalid LLM configuration: {e}");
            return EXIT_VALIDATION;
        }
    };
    let youtube = match YoutubeClient::new(youtube_config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("invalid search configuration: {e}");
            return EXIT_VALIDATION;
        }
    };

    // Cheap read-only probes.
    let probe = ChatRequest::new().user("Reply with the word ok.").max_tokens(10);
    if let Err(e) = llm.call(&probe).await {
        eprintln!("LLM probe failed: {e}");
        return match e {
            LlmError::Transient(_) | LlmError::Network(_) => EXIT_TRANSIENT,
            LlmError::Api { status: 429, .. } => EXIT_QUOTA,
            LlmError::Config(_) => EXIT_MISSING_SECRET,
            _ => EXIT_VALIDATION,
        };
    }

    if let Err(e) = youtube.search("test", 1).await {
        eprintln!("search probe failed: {e}");
        return match e {
            YoutubeError::QuotaExceeded(_) => EXIT_QUOTA,
            YoutubeError::Transient(_) | YoutubeError::Network(_) => EXIT_TRANSIENT,
            YoutubeError::Config(_) => EXIT_MISSING_SECRET,
            _ => EXIT_VALIDATION,
        };
    }

    println!("ok");
    EXIT_OK
}
