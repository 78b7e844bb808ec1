use cadence_planner::{PlannerConfig, PlannedRun, load_definition, simulate};
use cadence_scheduler::Services;
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Show when a schedule trigger would fire.
#[derive(Debug, Parser)]
#[command(name = "cadence-planner", version)]
struct Args {
    /// JSON file holding `flow`, `trigger` and an optional `backfill`.
    definition: PathBuf,

    /// Number of evaluations to simulate. Overrides `CADENCE_COUNT`.
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Simulate from this instant instead of now (RFC 3339).
    #[arg(long)]
    from: Option<DateTime<Utc>>,

    /// Print the simulated runs as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match PlannerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let definition = match load_definition(&args.definition) {
        Ok(definition) => definition,
        Err(report) => {
            tracing::error!(error = %report, "failed to load definition");
            return ExitCode::FAILURE;
        }
    };

    let services = Services::new().with_config(config.scheduler);
    let now = args.from.unwrap_or_else(Utc::now);
    let count = args.count.unwrap_or(config.count);

    let runs = match simulate(&definition, services, now, count) {
        Ok(runs) => runs,
        Err(report) => {
            tracing::error!(error = %report, "simulation failed");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(runs = runs.len(), "simulation finished");

    if args.json {
        match serde_json::to_string_pretty(&runs) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize runs");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for run in &runs {
            println!("{}", describe(run));
        }
    }

    ExitCode::SUCCESS
}

fn describe(run: &PlannedRun) -> String {
    let date = run.date.to_rfc3339_opts(SecondsFormat::Secs, true);
    match &run.execution {
        Some(execution) => match &execution.error {
            Some(error) => format!("{date}  failed   {}  {error}", execution.id),
            None => format!("{date}  created  {}", execution.id),
        },
        None => format!("{date}  skipped"),
    }
}
