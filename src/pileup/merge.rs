//! K-way merge of per-file read streams into one coordinate-ordered stream.
//!
//! Each source is read lazily and independently; the merger keeps at most one
//! pending read per source and a min-heap keyed on
//! `(start, source index, record index)`, so ties always resolve the same way.
//!
//! A source that can seek is first moved to the region. A coordinate-sorted
//! source stops being read once its records pass the region end.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::{debug, info, warn};

use crate::core::{AlignedRead, Operation, Region, Strand};
use crate::pileup::{HhgaError, ReadError, SkippedRead};
use crate::utils::validation::MAX_CONSECUTIVE_MALFORMED;

/// Which mapped reads to keep. Filtered reads are not warnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadFilter {
    pub min_mapping_quality: u8,
    pub skip_duplicates: bool,
    pub skip_secondary: bool,
    pub skip_supplementary: bool,
}

impl ReadFilter {
    fn keeps(&self, record: &SourceRecord) -> bool {
        let flags = record.flags;
        if flags.duplicate && self.skip_duplicates
            || flags.secondary && self.skip_secondary
            || flags.supplementary && self.skip_supplementary
        {
            return false;
        }
        // Unknown mapping quality only passes a zero threshold
        record
            .mapping_quality
            .map_or(self.min_mapping_quality == 0, |q| q >= self.min_mapping_quality)
    }
}

/// The SAM flag bits the merger looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadFlags {
    pub unmapped: bool,
    pub reverse: bool,
    pub secondary: bool,
    pub supplementary: bool,
    pub duplicate: bool,
}

/// One record as read from an alignment file, before admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// Position of the record within its file
    pub record_index: usize,
    pub name: Option<String>,
    /// Header index of the reference sequence the record is placed on
    pub contig_id: Option<usize>,
    pub flags: ReadFlags,
    /// 0-based alignment start
    pub start: Option<u64>,
    pub operations: Vec<Operation>,
    pub bases: Vec<u8>,
    pub qualities: Vec<u8>,
    pub mapping_quality: Option<u8>,
}

/// One item of an alignment source: `Err` for fatal I/O failures,
/// `Ok(Err(_))` for a record that could not be decoded.
pub type SourceItem = Result<Result<SourceRecord, ReadError>, HhgaError>;

/// A lazily read alignment file.
pub trait AlignmentSource: Iterator<Item = SourceItem> {
    /// Name used in log messages, usually the file path.
    fn label(&self) -> &str;

    /// Header index of `contig`, None if the source has no such reference sequence.
    fn contig_id(&self, contig: &str) -> Option<usize>;

    /// Whether records come in coordinate order.
    fn is_coordinate_sorted(&self) -> bool {
        false
    }

    /// Skip ahead to the first record that can overlap `region`, where the
    /// source supports it. Sources that cannot seek read from the start.
    ///
    /// # Errors
    ///
    /// Returns an error if the source has an index that cannot be used.
    fn seek(&mut self, _contig_id: usize, _region: &Region) -> Result<(), HhgaError> {
        Ok(())
    }
}

struct SourceState<S> {
    source: S,
    contig_id: Option<usize>,
    pending: Option<AlignedRead>,
    last_start: Option<u64>,
    sorted: bool,
    unsorted: bool,
    exhausted: bool,
    consecutive_malformed: usize,
}

impl<S: AlignmentSource> SourceState<S> {
    /// Whether a sorted source has moved past every record that can overlap `region`.
    fn is_past(&self, record: &SourceRecord, region: &Region) -> bool {
        if !self.sorted || self.unsorted {
            return false;
        }
        match (record.contig_id, self.contig_id) {
            (Some(id), Some(region_id)) if id > region_id => true,
            (Some(id), Some(region_id)) if id == region_id => {
                record.start.is_some_and(|start| start >= region.end)
            }
            _ => false,
        }
    }
}

enum Admission {
    Keep(AlignedRead),
    Drop,
    Malformed(ReadError),
}

/// Reads overlapping a region, from every source, in `(start, source, file order)` order.
pub struct MergedReads<S> {
    sources: Vec<SourceState<S>>,
    heap: BinaryHeap<Reverse<(u64, usize, usize)>>,
    region: Region,
    filter: ReadFilter,
    warnings: Vec<SkippedRead>,
    failed: bool,
}

impl<S: AlignmentSource> MergedReads<S> {
    /// Resolve the region's contig in every source, seek to it, and read
    /// the first admissible record of each.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot seek or fails while reading its
    /// first records.
    pub fn new(sources: Vec<S>, region: Region, filter: ReadFilter) -> Result<Self, HhgaError> {
        let sources = sources
            .into_iter()
            .map(|mut source| -> Result<SourceState<S>, HhgaError> {
                let contig_id = source.contig_id(&region.contig);
                match contig_id {
                    Some(id) => source.seek(id, &region)?,
                    None => info!(
                        source = source.label(),
                        contig = %region.contig,
                        "Source has no such reference sequence, contributing no reads"
                    ),
                }
                Ok(SourceState {
                    sorted: source.is_coordinate_sorted(),
                    source,
                    contig_id,
                    pending: None,
                    last_start: None,
                    unsorted: false,
                    exhausted: contig_id.is_none(),
                    consecutive_malformed: 0,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut merged = Self {
            heap: BinaryHeap::with_capacity(sources.len()),
            sources,
            region,
            filter,
            warnings: Vec::new(),
            failed: false,
        };

        for index in 0..merged.sources.len() {
            merged.refill(index)?;
        }

        Ok(merged)
    }

    /// Reads skipped so far.
    #[must_use]
    pub fn warnings(&self) -> &[SkippedRead] {
        &self.warnings
    }

    #[must_use]
    pub fn into_warnings(self) -> Vec<SkippedRead> {
        self.warnings
    }

    fn admit(&self, index: usize, record: SourceRecord) -> Admission {
        let state = &self.sources[index];

        if record.flags.unmapped {
            return Admission::Drop;
        }
        if state.contig_id.is_none() || record.contig_id != state.contig_id {
            return Admission::Drop;
        }
        let Some(start) = record.start else {
            return Admission::Malformed(ReadError::MalformedAlignment(
                "mapped record without a start position".to_string(),
            ));
        };
        if !self.filter.keeps(&record) {
            return Admission::Drop;
        }
        if record.operations.is_empty() {
            return Admission::Malformed(ReadError::MalformedAlignment(
                "mapped record without CIGAR operations".to_string(),
            ));
        }
        if !record.qualities.is_empty() && record.qualities.len() != record.bases.len() {
            return Admission::Malformed(ReadError::MalformedAlignment(format!(
                "{} qualities for {} bases",
                record.qualities.len(),
                record.bases.len()
            )));
        }

        let read = AlignedRead {
            source_index: index,
            record_index: record.record_index,
            name: record.name.unwrap_or_else(|| "*".to_string()),
            start,
            operations: record.operations,
            bases: record.bases,
            qualities: record.qualities,
            mapping_quality: record.mapping_quality,
            strand: if record.flags.reverse {
                Strand::Reverse
            } else {
                Strand::Forward
            },
        };

        if self.region.overlaps(read.start, read.end()) {
            Admission::Keep(read)
        } else {
            Admission::Drop
        }
    }

    /// Pull records from source `index` until one is admitted or the source
    /// has nothing more for the region.
    fn refill(&mut self, index: usize) -> Result<(), HhgaError> {
        if self.sources[index].exhausted {
            return Ok(());
        }

        while let Some(item) = self.sources[index].source.next() {
            let record = match item? {
                Ok(record) => record,
                Err(error) => {
                    self.skip(index, None, error)?;
                    continue;
                }
            };

            let state = &mut self.sources[index];
            state.consecutive_malformed = 0;
            if state.is_past(&record, &self.region) {
                debug!(source = state.source.label(), "Source passed the region end");
                state.exhausted = true;
                return Ok(());
            }

            let name = record.name.clone();
            let record_start = record.start.filter(|_| record.contig_id == state.contig_id);
            match self.admit(index, record) {
                Admission::Keep(read) => {
                    self.check_order(index, read.start);
                    self.heap.push(Reverse(read.sort_key()));
                    self.sources[index].pending = Some(read);
                    return Ok(());
                }
                Admission::Drop => {
                    if let Some(start) = record_start {
                        self.check_order(index, start);
                    }
                }
                Admission::Malformed(error) => self.skip(index, name, error)?,
            }
        }

        let state = &mut self.sources[index];
        state.exhausted = true;
        debug!(source = state.source.label(), "Source exhausted");
        Ok(())
    }

    fn skip(
        &mut self,
        index: usize,
        name: Option<String>,
        error: ReadError,
    ) -> Result<(), HhgaError> {
        let state = &mut self.sources[index];
        warn!(source = state.source.label(), read = ?name, %error, "Skipping record");
        self.warnings.push(SkippedRead {
            source_index: index,
            name,
            error,
        });

        state.consecutive_malformed += 1;
        if state.consecutive_malformed >= MAX_CONSECUTIVE_MALFORMED {
            return Err(HhgaError::ReadFailed {
                path: state.source.label().to_string(),
                reason: format!("{MAX_CONSECUTIVE_MALFORMED} consecutive malformed records"),
            });
        }
        Ok(())
    }

    fn check_order(&mut self, index: usize, start: u64) {
        let state = &mut self.sources[index];
        if let Some(last) = state.last_start {
            if start < last && !state.unsorted {
                state.unsorted = true;
                warn!(
                    source = state.source.label(),
                    "Records are not sorted by coordinate; output order follows file order"
                );
            }
        }
        state.last_start = Some(start);
    }
}

impl<S: AlignmentSource> Iterator for MergedReads<S> {
    type Item = Result<AlignedRead, HhgaError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let Reverse((_, index, _)) = self.heap.pop()?;
        let read = self.sources[index].pending.take()?;

        if let Err(e) = self.refill(index) {
            self.failed = true;
            return Some(Err(e));
        }

        Some(Ok(read))
    }
}
