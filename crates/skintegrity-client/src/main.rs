//! Skintegrity CLI: analyze a video for deepfakes through the scanner API.
//!
//! Storage, database and API settings come from the environment (or `.env`).

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use skintegrity_client::{
    init_tracing, AnalysisSession, InferenceGateway, PollPolicy, PollStrategy, ResultView,
    ScannerApiClient, SelectedVideo, VideoValidator,
};
use skintegrity_core::Config;
use skintegrity_db::{setup_database, AnalysisResultRepository};
use skintegrity_storage::create_storage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "skintegrity", about = "Deepfake video scanner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a video, run the analysis and print the verdict
    Analyze {
        /// Path to the video file
        file: PathBuf,
        /// Where to look for the result
        #[arg(long, value_enum, default_value = "row")]
        strategy: PollStrategy,
        /// Override POLL_MAX_ATTEMPTS
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Override POLL_INTERVAL_SECS
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct FailureOutput<'a> {
    error: &'a str,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize result")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            file,
            strategy,
            max_attempts,
            interval_secs,
            json,
        } => {
            let config = Config::from_env().context("Failed to load configuration")?;
            config.validate_storage()?;

            let storage = create_storage(&config)
                .await
                .context("Failed to initialize storage")?;
            let gateway: Arc<dyn InferenceGateway> = Arc::new(
                ScannerApiClient::from_config(&config).context("Failed to create API client")?,
            );

            let mut policy = PollPolicy::from_config(&config);
            if let Some(max_attempts) = max_attempts {
                policy.max_attempts = max_attempts.max(1);
            }
            if let Some(interval_secs) = interval_secs {
                policy.interval = Duration::from_secs(interval_secs);
            }

            let mut session = AnalysisSession::new(
                storage,
                gateway,
                VideoValidator::from_config(&config),
                policy,
            )
            .with_key_prefix(config.storage_key_prefix());

            if strategy == PollStrategy::Row {
                let pool = setup_database(&config).await?;
                session = session.with_result_store(Arc::new(AnalysisResultRepository::new(pool)));
            }
            session = session.with_strategy(strategy);

            let token = session.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupt received, cancelling analysis");
                    token.cancel();
                }
            });

            let video = SelectedVideo::from_path(&file).await?;
            let outcome = match session.select_video(video) {
                Ok(()) => session.submit().await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(result) => {
                    let view = ResultView::new(&result, session.video());
                    if json {
                        print_json(&view)?;
                    } else {
                        println!("{}", view.render());
                    }
                }
                Err(err) => {
                    let message = err.user_message();
                    if json {
                        print_json(&FailureOutput { error: &message })?;
                    } else {
                        eprintln!("{}", message);
                    }
                    session.teardown();
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
