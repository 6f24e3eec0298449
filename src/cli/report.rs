use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use crate::cli::OutputFormat;
use crate::core::{AlignedRead, RegionSpec, Variant};
use crate::parsing::{fasta, sam, vcf};
use crate::pileup::{
    build_pileup, render, BuildOptions, HhgaError, MergedReads, ReadFilter, SkippedRead,
};

#[derive(Args)]
pub struct ReportArgs {
    /// Reference FASTA (plain, gzip or bgzip)
    #[arg(short = 'f', long, required = true)]
    pub fasta_reference: PathBuf,

    /// Alignment file (SAM or BAM); repeat for several files
    #[arg(short = 'b', long = "bam", required = true)]
    pub bams: Vec<PathBuf>,

    /// Region as chr:start-end, 0-based and end-exclusive
    #[arg(short = 'r', long, required = true)]
    pub region: RegionSpec,

    /// Known variants to overlay (VCF, plain or gzip)
    #[arg(short = 'v', long)]
    pub vcf: Option<PathBuf>,

    /// Drop reads with a mapping quality below this
    #[arg(long, default_value = "0")]
    pub min_mapping_quality: u8,

    /// Drop reads flagged as duplicates
    #[arg(long)]
    pub skip_duplicates: bool,

    /// Drop secondary alignments
    #[arg(long)]
    pub skip_secondary: bool,

    /// Drop supplementary alignments
    #[arg(long)]
    pub skip_supplementary: bool,

    /// Threads for read decoding (default: all cores)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,
}

impl ReportArgs {
    fn filter(&self) -> ReadFilter {
        ReadFilter {
            min_mapping_quality: self.min_mapping_quality,
            skip_duplicates: self.skip_duplicates,
            skip_secondary: self.skip_secondary,
            skip_supplementary: self.skip_supplementary,
        }
    }
}

type CollectedReads = (Vec<AlignedRead>, Vec<SkippedRead>);

/// Execute the report command
///
/// # Errors
///
/// Returns an error if an input cannot be opened or read, or the region is
/// invalid for the reference.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ReportArgs, format: OutputFormat) -> anyhow::Result<()> {
    let window = fasta::load_window(&args.fasta_reference, &args.region).with_context(|| {
        format!(
            "Failed to load region {} from {}",
            args.region.contig,
            args.fasta_reference.display()
        )
    })?;
    let region = window.region().clone();

    let sources = sam::open_sources(&args.bams)?;
    let filter = args.filter();

    // Variant loading overlaps with read collection
    let (reads, variants) = rayon::join(
        || -> Result<CollectedReads, HhgaError> {
            let mut merged = MergedReads::new(sources, region.clone(), filter)?;
            let reads = merged.by_ref().collect::<Result<Vec<_>, _>>()?;
            Ok((reads, merged.into_warnings()))
        },
        || -> Result<Option<Vec<Variant>>, HhgaError> {
            args.vcf
                .as_deref()
                .map(|path| vcf::load_variants(path, &region))
                .transpose()
        },
    );
    let (reads, mut warnings) = reads?;
    let variants = variants?;

    info!(region = %region, reads = reads.len(), "Collected reads");

    let options = BuildOptions {
        threads: args.threads,
    };
    let pileup = build_pileup(&window, reads, variants, &options)?;
    warnings.extend(pileup.warnings.iter().cloned());

    let output = match format {
        OutputFormat::Text => render::render_text(&pileup),
        OutputFormat::Json => render::render_json(&pileup)?,
    };
    println!("{output}");

    if !warnings.is_empty() {
        warn!(skipped = warnings.len(), "Reads were skipped; see warnings above");
    }

    Ok(())
}
