use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "mwematch",
    version,
    about = "Find multi-word expressions in annotated corpora"
)]
pub struct Args {
    /// JSON-lines corpus files, one sentence per line (stdin when omitted)
    pub corpus: Vec<PathBuf>,

    /// Pattern file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub pattern: PathBuf,

    /// Path to configuration file [default: .mwematch.yml]
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Which matches starting at one token to report: All, Longest or Shortest
    #[arg(short = 'd', long, value_name = "POLICY")]
    pub match_distance: Option<String>,

    /// Resume scanning after each reported match
    #[arg(long)]
    pub non_overlapping: bool,

    /// Ids whose tokens make up each match, in order (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    pub id_order: Vec<String>,

    /// Only try matches starting at the first token
    #[arg(long)]
    pub anchor_begin: bool,

    /// Report at most one match per starting token
    #[arg(long)]
    pub anchor_end: bool,

    /// Print the compiled automaton, then exit
    #[arg(long)]
    pub print_pattern: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}
