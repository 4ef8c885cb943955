use std::path::PathBuf;

use extpack_packager::BumpKind;

#[derive(clap::Parser, Debug)]
#[command(name = "extpack")]
#[command(about = "Build release packages for browser extensions")]
#[command(version)]
pub struct Cli {
    /// Bump version before building
    #[arg(long, value_enum)]
    pub bump: Option<BumpKind>,

    /// Include Firefox package in build (the default)
    #[arg(long)]
    pub firefox: bool,

    /// Exclude Firefox package from build
    #[arg(long)]
    pub no_firefox: bool,

    /// Do not open output folder after build
    #[arg(long)]
    pub no_open: bool,

    /// Extension project root
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// Override the output directory from extpack.json
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Print the build summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// `--no-firefox` wins over `--firefox`
    pub fn include_firefox(&self) -> bool {
        !self.no_firefox
    }
}
