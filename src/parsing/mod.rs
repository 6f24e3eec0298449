//! Readers for the three input sources.
//!
//! | Source | Module | Formats |
//! |--------|--------|---------|
//! | Alignments | [`sam`] | SAM, BAM, `.bai`/`.csi` indexed BAM |
//! | Reference | [`fasta`] | FASTA, gzip/bgzip FASTA, `.fai` indexed |
//! | Known variants | [`vcf`] | VCF, gzip/bgzip VCF |
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//!
//! use hhga::core::RegionSpec;
//! use hhga::parsing::{fasta, sam, vcf};
//! use hhga::pileup::{MergedReads, ReadFilter};
//!
//! let spec = RegionSpec::parse("chr1:100-110").unwrap();
//! let window = fasta::load_window(Path::new("ref.fa"), &spec).unwrap();
//! let variants = vcf::load_variants(Path::new("calls.vcf"), window.region()).unwrap();
//!
//! let sources = sam::open_sources(&[PathBuf::from("sample.bam")]).unwrap();
//! let reads = MergedReads::new(sources, window.region().clone(), ReadFilter::default()).unwrap();
//! ```

use std::io;

use noodles::core::region::Interval;
use noodles::core::Position;

use crate::core::Region;

pub mod fasta;
pub mod sam;
pub mod vcf;

/// The 1-based closed interval noodles queries use for a 0-based half-open region.
pub(crate) fn interval(region: &Region) -> io::Result<Interval> {
    let position = |n: u64| {
        usize::try_from(n)
            .ok()
            .and_then(Position::new)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid position"))
    };
    Ok(Interval::from(position(region.start + 1)?..=position(region.end)?))
}
