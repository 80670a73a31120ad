//! CLI argument parsing for statmine

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "statmine")]
#[command(version)]
#[command(
    about = "Automated statistical test selection across grouped behavioral data",
    long_about = None
)]
pub struct Cli {
    /// Group data file (JSON: behavior -> parameter -> values); repeat per group, order is kept
    #[arg(short = 'g', long = "group", value_name = "FILE", required = true)]
    pub groups: Vec<PathBuf>,

    /// Designated control group file (forces the multi-group path)
    #[arg(short = 'c', long = "control", value_name = "FILE")]
    pub control: Option<PathBuf>,

    /// Observations are paired across groups
    #[arg(short = 'p', long = "paired")]
    pub paired: bool,

    /// Record only results with p <= significance level
    #[arg(long = "significant-only")]
    pub significant_only: bool,

    /// Directory the workbook is written to
    #[arg(short = 'o', long = "output-dir", value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// TOML configuration file; command-line flags take precedence
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Include per-group descriptive summaries in the trace
    #[arg(long = "describe")]
    pub describe: bool,

    /// Record failing tests as skipped rows instead of aborting
    #[arg(long = "skip-failed")]
    pub skip_failed: bool,

    /// Print the analysis report as JSON instead of the text trace
    #[arg(long = "json")]
    pub json: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
