//! # hhga
//!
//! A library for laying reads aligned over a genomic region out as a
//! rows-by-columns matrix.
//!
//! Every reference position in the region gets a column, and every insertion
//! any read makes gets columns of its own after its anchor, so all reads line
//! up base for base. Reads come from one or more SAM/BAM files, the reference
//! from FASTA, and known variants (optionally) from VCF.
//!
//! ## Features
//!
//! - **Multi-file merge**: Reads from several files in one deterministic order
//! - **Insertion-aware layout**: Two-pass matrix with the widest insertion per anchor
//! - **Variant overlay**: Per-read allele calls at known variant positions
//! - **Column statistics**: Depth, mismatch, insertion and deletion counts per position
//! - **Recoverable errors**: Malformed reads are skipped and reported, not fatal
//!
//! ## Example
//!
//! ```rust
//! use hhga::core::{AlignedRead, Operation, ReferenceWindow, Region, Strand, Variant};
//! use hhga::pileup::{build_report, BuildOptions};
//!
//! let region = Region::new("chr1", 100, 110).unwrap();
//! let window = ReferenceWindow::new(region, b"ACGTACGTAC".to_vec()).unwrap();
//!
//! let read = AlignedRead {
//!     source_index: 0,
//!     record_index: 0,
//!     name: "read1".to_string(),
//!     start: 100,
//!     operations: vec![Operation::Match(10)],
//!     bases: b"ACGTATGTAC".to_vec(),
//!     qualities: Vec::new(),
//!     mapping_quality: Some(60),
//!     strand: Strand::Forward,
//! };
//!
//! let report = build_report(&window, vec![read], None::<Vec<Variant>>, &BuildOptions::default())
//!     .unwrap();
//! assert!(report.text.contains("read1\t0\t+\t60\tACGTATGTAC"));
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Regions, reads, reference windows and variants
//! - [`pileup`]: Decoding, merging, matrix layout, overlay, statistics and rendering
//! - [`parsing`]: Readers for SAM/BAM, FASTA and VCF
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod parsing;
pub mod pileup;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::{AlignedRead, ReferenceWindow, Region, RegionSpec, Variant};
pub use pileup::{build_pileup, build_report, BuildOptions, HhgaError, Pileup, Report};
