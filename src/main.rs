use anyhow::{bail, Context};
use clap::Parser;
use metaload_lib::modules::deployment::ResultTone;
use metaload_lib::shared::utils::init_logger;
use metaload_lib::{
    AppConfig, CsvTableParser, HttpDeploymentClient, ImportService, ImportState,
    LogNotificationSink,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Load a CSV file of metadata records into a remote service in batches
#[derive(Debug, Parser)]
#[command(name = "metaload", version)]
struct Cli {
    /// CSV file with a header row
    #[arg(short, long)]
    file: PathBuf,

    /// Metadata type the records belong to
    #[arg(short, long, env = "METALOAD_TARGET_TYPE")]
    target_type: String,

    /// Overrides METALOAD_SERVICE_URL
    #[arg(long)]
    service_url: Option<String>,

    /// Validate and report without deploying
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logger();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(url) = cli.service_url {
        config.service_base_url = url.trim_end_matches('/').to_string();
    }

    let raw = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;

    let client = Arc::new(HttpDeploymentClient::new(&config)?);
    let handle = ImportService::start(
        client,
        Arc::new(CsvTableParser::new()),
        Arc::new(LogNotificationSink),
        &config,
    );

    handle.select_target_type(cli.target_type).await?;
    handle.load_csv(raw).await?;

    let snapshot = handle.snapshot();
    println!(
        "{}: {} rows, {} validation issue(s)",
        cli.file.display(),
        snapshot.row_count(),
        snapshot.issues.len()
    );
    for issue in &snapshot.issues {
        println!("  {}", issue.message);
    }
    if !snapshot.missing_columns.is_empty() {
        bail!(
            "missing required column(s): {}",
            snapshot.missing_columns.join(", ")
        );
    }

    if cli.dry_run {
        handle.shutdown().await?;
        return Ok(());
    }

    let total = handle.start_deployment().await?;
    println!("Deploying in {} batch(es)", total);

    let mut updates = handle.subscribe();
    let mut last_state = String::new();
    let finished = loop {
        let snapshot = updates.borrow_and_update().clone();
        let state = snapshot.state.to_string();
        if state != last_state {
            println!("  {}", state);
            last_state = state;
        }
        if snapshot.state.is_terminal() {
            break snapshot;
        }
        if updates.changed().await.is_err() {
            bail!("import service stopped unexpectedly");
        }
    };

    for (index, result) in finished.results.iter().enumerate() {
        let marker = match result.tone() {
            ResultTone::Success => "ok",
            ResultTone::Error => "FAILED",
            ResultTone::Info => "..",
        };
        println!("  batch {} [{}] {}", index + 1, marker, result.message());
    }
    handle.shutdown().await?;

    match finished.state {
        ImportState::Failed(report) => bail!(report.summary()),
        _ => Ok(()),
    }
}
