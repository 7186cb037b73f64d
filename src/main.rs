use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trigger_archiver::{Archiver, Config};

#[derive(Parser)]
#[command(name = "trigger-archiver")]
#[command(about = "Archives per-client trigger API responses to object storage")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one archive batch
    Run {
        /// Explicit trigger date (YYYY-MM-DD); defaults to today plus the
        /// configured offset
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Override the configured date offset in days
        #[arg(long)]
        offset_days: Option<i64>,
        /// Fetch trigger data but skip the upload
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the eligible client list and exit
    Clients,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trigger_archiver=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    info!(source = ?config.clients, "Configuration loaded");

    let archiver = Archiver::from_config(config.clone()).await?;

    match cli.command {
        Command::Run {
            date,
            offset_days,
            dry_run,
        } => {
            let trigger_date = archiver.resolve_date(date, offset_days);
            let summary = archiver.run_once(trigger_date, dry_run).await?;

            if let Some(dir) = &config.run.output_dir {
                let path = summary.write_to(dir)?;
                info!(path = %path.display(), "Wrote run summary");
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);

            if summary.failed_archives > 0 {
                warn!(
                    failed = summary.failed_archives,
                    "Run completed with failures"
                );
                std::process::exit(1);
            }
        }
        Command::Clients => {
            let clients = archiver.list_clients().await?;
            for client in &clients {
                println!("{}\t{}", client.client_id, client.display_name());
            }
            info!(count = clients.len(), "Listed clients");
        }
    }

    Ok(())
}
