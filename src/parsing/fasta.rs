//! Reference window loading from FASTA files using noodles.
//!
//! With a `.fai` index next to the file only the region is read. Without
//! one, records are streamed and only the requested contig is kept in memory.
//!
//! Supported extensions:
//! - `.fa`, `.fasta`, `.fna` (uncompressed)
//! - `.fa.gz`, `.fasta.gz`, `.fna.gz` (gzip compressed)
//! - `.fa.bgz`, `.fasta.bgz`, `.fna.bgz` (bgzip compressed; indexed reads need a `.gzi`)

use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use noodles::fasta;
use tracing::debug;

use crate::core::{ReferenceWindow, Region, RegionSpec};
use crate::parsing::interval;
use crate::pileup::HhgaError;
use crate::utils::validation::check_region_length;

/// Compression of a FASTA file, from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastaFormat {
    Plain,
    Gzip,
}

impl FastaFormat {
    /// Detect the format from the file name.
    ///
    /// # Errors
    ///
    /// Returns `HhgaError::UnsupportedFormat` unless the name ends in a FASTA
    /// extension, optionally followed by `.gz` or `.bgz`.
    pub fn from_path(path: &Path) -> Result<Self, HhgaError> {
        let name = path
            .file_name()
            .and_then(OsStr::to_str)
            .map(str::to_lowercase)
            .unwrap_or_default();

        let (stem, format) = match name.rsplit_once('.') {
            Some((stem, "gz" | "bgz")) => (stem, Self::Gzip),
            _ => (name.as_str(), Self::Plain),
        };

        match stem.rsplit_once('.') {
            Some((_, "fa" | "fasta" | "fna")) => Ok(format),
            _ => Err(HhgaError::UnsupportedFormat(format!(
                "{}: expected .fa, .fasta or .fna, optionally gzipped",
                path.display()
            ))),
        }
    }
}

fn fai_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".fai");
    PathBuf::from(name)
}

/// Fill in the region's open end and apply the size limit.
fn resolve(spec: &RegionSpec, contig_length: u64) -> Result<Region, HhgaError> {
    let region = spec.resolve(contig_length)?;
    if let Some(msg) = check_region_length(region.len()) {
        return Err(HhgaError::RegionTooLarge(msg));
    }
    Ok(region)
}

/// Load the reference bases for a region.
///
/// The region's open end, if any, is filled in from the contig length.
///
/// # Errors
///
/// Returns `HhgaError::UnsupportedFormat` for a non-FASTA file name,
/// `HhgaError::SourceOpen` if the file or its index cannot be opened,
/// `HhgaError::ReadFailed` if it is not valid FASTA,
/// `HhgaError::OutOfBounds` if the contig is missing or shorter than the
/// region, `HhgaError::InvalidRegion` for an empty region, or
/// `HhgaError::RegionTooLarge` if the region exceeds the size limit.
pub fn load_window(path: &Path, spec: &RegionSpec) -> Result<ReferenceWindow, HhgaError> {
    let format = FastaFormat::from_path(path)?;
    let label = path.display().to_string();

    if fai_path(path).is_file() {
        return load_indexed_window(path, spec, &label);
    }

    let file = std::fs::File::open(path).map_err(|e| HhgaError::SourceOpen {
        path: label.clone(),
        reason: e.to_string(),
    })?;

    let reader: Box<dyn BufRead> = match format {
        FastaFormat::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        FastaFormat::Plain => Box::new(BufReader::new(file)),
    };

    read_window(&mut fasta::io::Reader::new(reader), spec, &label)
}

/// Read only the region's bases through the `.fai` index.
fn load_indexed_window(
    path: &Path,
    spec: &RegionSpec,
    label: &str,
) -> Result<ReferenceWindow, HhgaError> {
    let mut reader = fasta::io::indexed_reader::Builder::default()
        .build_from_path(path)
        .map_err(|e| HhgaError::SourceOpen {
            path: label.to_string(),
            reason: e.to_string(),
        })?;

    let records: &[fasta::fai::Record] = reader.index().as_ref();
    let length = records
        .iter()
        .find(|record| {
            let name: &[u8] = record.name().as_ref();
            name == spec.contig.as_bytes()
        })
        .map(fasta::fai::Record::length)
        .ok_or_else(|| {
            HhgaError::OutOfBounds(format!("contig '{}' not found in {label}", spec.contig))
        })?;

    let region = resolve(spec, length)?;
    let record = interval(&region)
        .map(|interval| noodles::core::Region::new(region.contig.as_str(), interval))
        .and_then(|query| reader.query(&query))
        .map_err(|e| HhgaError::ReadFailed {
            path: label.to_string(),
            reason: format!("Failed to read {region} through the index: {e}"),
        })?;

    debug!(region = %region, contig_length = length, "Loaded indexed reference window");
    ReferenceWindow::new(region, record.sequence().as_ref().to_vec())
}

/// Scan FASTA records until the region's contig is found.
///
/// # Errors
///
/// See [`load_window`].
pub fn read_window<R: BufRead>(
    reader: &mut fasta::io::Reader<R>,
    spec: &RegionSpec,
    label: &str,
) -> Result<ReferenceWindow, HhgaError> {
    for result in reader.records() {
        let record = result.map_err(|e| HhgaError::ReadFailed {
            path: label.to_string(),
            reason: format!("Failed to parse FASTA record: {e}"),
        })?;

        let name = String::from_utf8_lossy(record.name());
        if name != spec.contig {
            continue;
        }

        let sequence = record.sequence().as_ref();
        let region = resolve(spec, sequence.len() as u64)?;

        debug!(region = %region, contig_length = sequence.len(), "Loaded reference window");
        return ReferenceWindow::from_contig(region, sequence);
    }

    Err(HhgaError::OutOfBounds(format!(
        "contig '{}' not found in {label}",
        spec.contig
    )))
}
