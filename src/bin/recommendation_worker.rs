// ABOUTME: Recommendation worker binary streaming activity events through the AI pipeline
// ABOUTME: Reads newline-delimited JSON from a file or stdin and can print stored recommendations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Recommendation worker for recorded fitness activities.
//!
//! Each input line is one activity event. Every event produces exactly one
//! stored recommendation (generated or fallback).
//!
//! Usage:
//! ```bash
//! # Process events from a file (uses GEMINI_API_KEY and DATABASE_URL from environment)
//! cargo run --bin recommendation-worker -- run --input ./activities.ndjson
//!
//! # Process events piped on stdin; Ctrl-C drains in-flight work and exits
//! cat activities.ndjson | cargo run --bin recommendation-worker -- run
//!
//! # Print stored recommendations
//! cargo run --bin recommendation-worker -- show --user user-42
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fitness_recommender::config::ServiceConfig;
use fitness_recommender::database::{RecommendationStore, SqliteRecommendationStore};
use fitness_recommender::errors::AppError;
use fitness_recommender::llm::{ActivityPromptBuilder, GeminiGateway};
use fitness_recommender::logging;
use fitness_recommender::pipeline::{ConsumerRuntime, InboundMessage, PipelineDispatcher};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "recommendation-worker",
    about = "Fitness activity recommendation worker",
    long_about = "Turn recorded fitness activities into stored AI recommendations"
)]
struct WorkerArgs {
    #[command(subcommand)]
    command: WorkerCommand,
}

#[derive(Subcommand)]
enum WorkerCommand {
    /// Stream newline-delimited activity events through the pipeline
    Run {
        /// Read events from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Print stored recommendations as JSON
    Show {
        /// Recommendations for this user
        #[arg(long, required_unless_present = "activity", conflicts_with = "activity")]
        user: Option<String>,

        /// Recommendations for this activity
        #[arg(long)]
        activity: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = WorkerArgs::parse();

    logging::init_from_env()?;
    let config = ServiceConfig::from_env()?;
    info!("Configuration loaded: {}", config.summary());

    let store = Arc::new(
        SqliteRecommendationStore::connect(&config.database.url)
            .await
            .map_err(AppError::from)?,
    );

    match args.command {
        WorkerCommand::Run { input } => run_worker(&config, store, input).await,
        WorkerCommand::Show { user, activity } => show_records(store.as_ref(), user, activity).await,
    }
}

async fn run_worker(
    config: &ServiceConfig,
    store: Arc<SqliteRecommendationStore>,
    input: Option<PathBuf>,
) -> Result<()> {
    let gateway = GeminiGateway::from_config(&config.gemini)?;
    info!(model = gateway.model(), "Gemini gateway ready");

    let dispatcher = PipelineDispatcher::new(
        Arc::new(ActivityPromptBuilder::new()),
        Arc::new(gateway),
        store,
        config.ai_call.clone(),
    );
    let runtime = ConsumerRuntime::new(dispatcher, config.consumer);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping intake");
            signal_token.cancel();
        }
    });

    let (tx, rx) = mpsc::channel(config.consumer.channel_capacity);
    let reader = tokio::spawn(feed_messages(input, tx, cancel.clone()));

    let summary = runtime.run(rx, cancel.clone()).await;
    cancel.cancel();
    let fed = reader.await.context("Input reader task failed")??;
    info!(lines = fed, "Input reader finished");

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Send each non-empty input line as one message; returns the number sent
async fn feed_messages(
    input: Option<PathBuf>,
    tx: mpsc::Sender<InboundMessage>,
    cancel: CancellationToken,
) -> Result<u64> {
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match input {
        Some(path) => {
            let file = File::open(&path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut lines = reader.lines();
    let mut offset = 0_u64;

    loop {
        let line = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read input")?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sent = tx.send(InboundMessage::new(offset, line)) => sent,
        };
        if sent.is_err() {
            break;
        }
        offset += 1;
    }

    Ok(offset)
}

async fn show_records(
    store: &dyn RecommendationStore,
    user: Option<String>,
    activity: Option<String>,
) -> Result<()> {
    let records = match (user, activity) {
        (Some(user_id), _) => store.find_by_user(&user_id).await?,
        (None, Some(activity_id)) => store.find_by_activity(&activity_id).await?,
        (None, None) => bail!("either --user or --activity is required"),
    };

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
