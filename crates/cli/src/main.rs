mod cli;
mod summary;
mod utils;

use clap::Parser;
use eyre::Context;
use extpack_packager::{ReleaseBuilder, ReleaseConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ReleaseConfig::load_or_default(&cli.project)?;
    if let Some(output_dir) = &cli.output_dir {
        config.output_dir = output_dir.clone();
    }

    let mut builder = ReleaseBuilder::with_config(&cli.project, config)
        .wrap_err_with(|| format!("Failed to open project {}", cli.project.display()))?;

    if let Some(kind) = cli.bump {
        let bump = builder.bump_version(kind)?;
        if !cli.json {
            println!("Version bumped: {} -> {}\n", bump.old, bump.new);
        }
    }

    let summary = builder.build_all(cli.include_firefox())?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary::print_summary(&summary);
    }

    if !cli.no_open {
        utils::open_folder(&summary.output_dir);
    }

    Ok(())
}
