use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use profilesync::{store, Reconciler};
use profilesync_common::Config;

/// Refresh the persisted social profile snapshot.
#[derive(Parser, Debug)]
#[command(name = "profilesync", version)]
struct Cli {
    /// Snapshot file to read and write (overrides OUTPUT_PATH)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Do not download profile images (overrides SAVE_PROFILE_IMAGES)
    #[arg(long)]
    no_images: bool,

    /// Print the merged snapshot instead of saving it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("profilesync=info".parse()?))
        .init();

    let cli = Cli::parse();
    info!("profilesync starting...");

    let mut config = Config::from_env()?;
    if let Some(output) = cli.output {
        config.output_path = output;
    }
    if cli.no_images {
        config.save_profile_images = false;
    }
    config.log_redacted();

    let reconciler = Reconciler::from_config(&config)?.dry_run(cli.dry_run);
    let report = reconciler.run().await?;

    if cli.dry_run {
        print!("{}", store::render(&report.snapshot)?);
    }

    info!("Run complete. {report}");
    Ok(())
}
