//! Command-line interface for hhga.
//!
//! One invocation builds the alignment matrix for one region and prints it.
//!
//! ## Usage
//!
//! ```text
//! # Matrix for ten bases of chr1
//! hhga -f ref.fa -b sample.bam -r chr1:100-110
//!
//! # Several alignment files, with known variants overlaid
//! hhga -f ref.fa -b tumor.bam -b normal.bam -r chr1:100-110 -v calls.vcf
//!
//! # JSON output for scripting
//! hhga -f ref.fa -b sample.bam -r chr1:100-110 --format json
//! ```

use clap::Parser;

pub mod report;

#[derive(Parser)]
#[command(name = "hhga")]
#[command(version)]
#[command(about = "Render reads aligned over a region as a column matrix")]
#[command(
    long_about = "hhga lays the reads overlapping a region out as a rows-by-columns matrix.\n\nEvery reference position gets a column, and every insertion any read makes gets columns of its own, so reads line up base for base. Known variants can be overlaid, and per-position depth and error counts follow the matrix."
)]
pub struct Cli {
    #[command(flatten)]
    pub report: report::ReportArgs,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
