//! Alignment matrix construction.
//!
//! The pipeline for one region:
//!
//! 1. [`merge`]: merge per-file read streams into one coordinate-ordered stream
//! 2. [`decode`]: expand each read's CIGAR into per-position events (in parallel)
//! 3. [`matrix`]: lay the events out in a dense rows x columns matrix, two passes
//! 4. [`overlay`]: annotate columns at known variant positions
//! 5. [`stats`]: per-column depth and error counts
//! 6. [`render`]: serialize everything to text or JSON
//!
//! Errors come in two kinds. [`HhgaError`] is fatal and aborts the run.
//! [`ReadError`] is confined to a single read: the read is dropped, a
//! [`SkippedRead`] warning is recorded, and the report is still produced.

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::{AlignedRead, ReferenceWindow, Variant};

pub mod decode;
pub mod matrix;
pub mod merge;
pub mod overlay;
pub mod render;
pub mod stats;

pub use decode::{DecodedEvent, EventKind, Placement};
pub use matrix::{AlignmentMatrix, Cell, Column, ColumnIndex, DecodedRead, Row};
pub use merge::{AlignmentSource, MergedReads, ReadFilter, ReadFlags, SourceItem, SourceRecord};
pub use overlay::{AlleleCall, VariantAnnotation};
pub use stats::ColumnStats;

/// Errors that abort report construction.
#[derive(Error, Debug)]
pub enum HhgaError {
    #[error("Could not open {path}: {reason}")]
    SourceOpen { path: String, reason: String },

    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Invalid region {0}")]
    InvalidRegion(String),

    #[error("Region too large: {0}")]
    RegionTooLarge(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed reading {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Invalid variant record at {path}:{line}: {reason}")]
    InvalidVariant {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Errors confined to a single read.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadError {
    #[error("malformed alignment: {0}")]
    MalformedAlignment(String),

    #[error("CIGAR accounts for {cigar} read bases but the read has {bases}")]
    CigarLengthMismatch { cigar: usize, bases: usize },
}

/// A read dropped because of a [`ReadError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRead {
    pub source_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub error: ReadError,
}

impl std::fmt::Display for SkippedRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "source {} read {name}: {}", self.source_index, self.error),
            None => write!(f, "source {}: {}", self.source_index, self.error),
        }
    }
}

/// Options for building a pileup.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Worker threads for read decoding; None uses every available core
    pub threads: Option<usize>,
}

/// Everything known about one region after construction.
#[derive(Debug, Clone)]
pub struct Pileup {
    pub matrix: AlignmentMatrix,
    pub annotations: Vec<VariantAnnotation>,
    pub stats: Vec<ColumnStats>,
    pub warnings: Vec<SkippedRead>,
}

/// A rendered report and the reads skipped while producing it.
#[derive(Debug, Clone)]
pub struct Report {
    pub text: String,
    pub warnings: Vec<SkippedRead>,
}

/// Build the matrix, overlay and statistics for the window's region.
///
/// Reads are decoded in parallel; all decoded reads are joined before the
/// matrix is laid out. Reads that fail to decode are dropped and reported in
/// [`Pileup::warnings`].
///
/// # Errors
///
/// Returns `HhgaError::ThreadPool` if the decoding pool cannot be created.
pub fn build_pileup<I, V>(
    window: &ReferenceWindow,
    reads: I,
    variants: Option<V>,
    options: &BuildOptions,
) -> Result<Pileup, HhgaError>
where
    I: IntoIterator<Item = AlignedRead>,
    V: IntoIterator<Item = Variant>,
{
    let region = window.region();
    let reads: Vec<AlignedRead> = reads
        .into_iter()
        .filter(|read| region.overlaps(read.start, read.end()))
        .collect();

    debug!(region = %region, reads = reads.len(), "Decoding reads");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.unwrap_or(0))
        .build()
        .map_err(|e| HhgaError::ThreadPool(e.to_string()))?;

    let results: Vec<Result<Vec<DecodedEvent>, ReadError>> = pool.install(|| {
        reads
            .par_iter()
            .map(|read| decode::decode_read(read, window))
            .collect()
    });

    let mut decoded = Vec::with_capacity(reads.len());
    let mut warnings = Vec::new();

    for (read, result) in reads.into_iter().zip(results) {
        match result {
            Ok(events) => decoded.push(DecodedRead { read, events }),
            Err(error) => {
                warn!(read = %read.name, source = read.source_index, %error, "Skipping read");
                warnings.push(SkippedRead {
                    source_index: read.source_index,
                    name: Some(read.name),
                    error,
                });
            }
        }
    }

    let matrix = matrix::build_matrix(window, &decoded);
    info!(
        region = %region,
        rows = matrix.rows.len(),
        columns = matrix.columns.len(),
        "Built alignment matrix"
    );

    let annotations = match variants {
        Some(variants) => overlay::annotate(&matrix, variants),
        None => Vec::new(),
    };
    let stats = stats::column_stats(&matrix);

    Ok(Pileup {
        matrix,
        annotations,
        stats,
        warnings,
    })
}

/// Build and render the text report for the window's region.
///
/// # Errors
///
/// Returns `HhgaError::ThreadPool` if the decoding pool cannot be created.
pub fn build_report<I, V>(
    window: &ReferenceWindow,
    reads: I,
    variants: Option<V>,
    options: &BuildOptions,
) -> Result<Report, HhgaError>
where
    I: IntoIterator<Item = AlignedRead>,
    V: IntoIterator<Item = Variant>,
{
    let pileup = build_pileup(window, reads, variants, options)?;
    Ok(Report {
        text: render::render_text(&pileup),
        warnings: pileup.warnings,
    })
}
