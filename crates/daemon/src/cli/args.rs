pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "elfinderd")]
#[command(about = "elFinder connector daemon")]
pub struct Args {
    /// Address of a running daemon (defaults to localhost on the configured port)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the elfinder config directory (defaults to ~/.elfinder)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
