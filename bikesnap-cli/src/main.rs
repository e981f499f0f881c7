use bikesnap_core::{AutoMergeStatus, PipelineReport, PublishSettings, SnapshotError};
use bikesnap_github::GitHubClient;
use bikesnap_runner::{HttpFetcher, Publisher, SnapshotPipeline};
use clap::{Parser, Subcommand};
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod config;

use config::{PublishArgs, SourceArgs};

#[derive(Parser)]
#[command(name = "bikesnap")]
#[command(about = "Snapshot a bike-share status feed and publish it to a data repository", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the feed and save one snapshot locally
    Fetch,

    /// Fetch, save and open an auto-merging pull request with the snapshot
    Run(PublishArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!(error = %e, "Snapshot run failed");
        println!("Error: {}", e);
        process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let namer = cli.source.namer()?;

    let report = match cli.command {
        Commands::Fetch => {
            let config = cli.source.pipeline_config(PublishSettings::default());
            let pipeline: SnapshotPipeline<HttpFetcher, GitHubClient> =
                SnapshotPipeline::new(config, namer, HttpFetcher::new());
            pipeline.run().await?
        }
        Commands::Run(args) => {
            let publisher = Publisher::new(args.client()?).with_ci_wait(args.ci_wait());
            let config = cli.source.pipeline_config(args.settings());
            SnapshotPipeline::new(config, namer, HttpFetcher::new())
                .with_publisher(publisher)
                .run()
                .await?
        }
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!(
        "Saved snapshot to {} ({} bytes)",
        report.snapshot.local_path.display(),
        report.snapshot.payload.len()
    );

    if let Some(outcome) = &report.publish {
        println!("Branch: {}", outcome.branch_name);
        println!(
            "Pull request #{}: {}",
            outcome.pull_request.number, outcome.pull_request.html_url
        );
        match &outcome.auto_merge {
            AutoMergeStatus::Enabled => println!("Auto-merge: enabled"),
            AutoMergeStatus::Failed(reason) => {
                println!("Auto-merge: not enabled ({}), merge manually", reason)
            }
        }
    }

    println!("Process completed successfully.");
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<SnapshotError>()
        .map(SnapshotError::exit_code)
        .unwrap_or(1)
}
