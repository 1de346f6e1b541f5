use std::path::Path;

use clap::Parser;

use rackview_core::ReportConfig;
use rackview_ingest::{GetentDirectory, ScontrolHostlist, SlurmCliSource};

mod cycle;

#[derive(Parser)]
#[command(
    name = "rackview",
    about = "rackview — one-image partition status dashboard",
    version,
)]
struct Cli {
    /// Compatibility flag; historical data storage is disabled.
    #[arg(short = 'n', long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    // Accepted so old cron entries keep working; history is gone for good.
    let _ = cli.dry_run;

    let config = ReportConfig::load_or_default(Path::new("rackview.toml"))?;
    let source = SlurmCliSource::new();
    let hostlist = ScontrolHostlist::new();
    let users = GetentDirectory::new();

    cycle::run(&config, &source, &hostlist, &users)?;
    Ok(())
}
