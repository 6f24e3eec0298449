//! Dense rows x columns layout of decoded reads.
//!
//! Columns are fixed before any row is written: pass 1 finds the widest
//! insertion at every anchor, pass 2 fills rows against that layout. A row
//! written in pass 2 is never shifted afterwards.

use serde::Serialize;
use tracing::debug;

use crate::core::{AlignedRead, ReferenceWindow, Region, Strand};
use crate::pileup::decode::{DecodedEvent, Placement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Reference(u64),
    Insertion { anchor: u64, offset: usize },
}

/// Ordered columns spanning a region: one per reference position, each
/// followed by the insertion columns anchored there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    region: Region,
    columns: Vec<Column>,
    /// Column of each reference position, indexed by `position - region.start`
    reference_columns: Vec<usize>,
}

impl ColumnIndex {
    /// Lay out columns given the insertion width after each reference position.
    ///
    /// `widths` is indexed by `position - region.start` and must be
    /// `region.len()` long.
    #[must_use]
    pub fn new(region: Region, widths: &[usize]) -> Self {
        let inserted: usize = widths.iter().sum();
        let mut columns = Vec::with_capacity(widths.len() + inserted);
        let mut reference_columns = Vec::with_capacity(widths.len());

        for (position, &width) in (region.start..region.end).zip(widths) {
            reference_columns.push(columns.len());
            columns.push(Column::Reference(position));
            columns.extend((0..width).map(|offset| Column::Insertion {
                anchor: position,
                offset,
            }));
        }

        Self {
            region,
            columns,
            reference_columns,
        }
    }

    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of insertion columns.
    #[must_use]
    pub fn insertion_count(&self) -> usize {
        self.columns.len() - self.reference_columns.len()
    }

    /// Column holding a reference position.
    #[must_use]
    pub fn reference_column(&self, position: u64) -> Option<usize> {
        if !self.region.contains(position) {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)] // bounded by the region length
        self.reference_columns
            .get((position - self.region.start) as usize)
            .copied()
    }

    /// Column holding the `offset`-th base inserted after `anchor`.
    #[must_use]
    pub fn insertion_column(&self, anchor: u64, offset: usize) -> Option<usize> {
        let column = self.reference_column(anchor)? + 1 + offset;
        match self.columns.get(column) {
            Some(Column::Insertion { anchor: a, .. }) if *a == anchor => Some(column),
            _ => None,
        }
    }

    /// Columns from the reference column of `position` up to, not including,
    /// the reference column of `position + length`. Clipped to the region.
    #[must_use]
    pub fn span(&self, position: u64, length: u64) -> Option<std::ops::Range<usize>> {
        let first = self.reference_column(position)?;
        let last = self
            .reference_column(position + length)
            .unwrap_or(self.columns.len());
        Some(first..last)
    }

    fn column_of(&self, placement: Placement) -> Option<usize> {
        match placement {
            Placement::Reference(position) => self.reference_column(position),
            Placement::Insertion {
                anchor: Some(anchor),
                offset,
            } => self.insertion_column(anchor, offset),
            Placement::Insertion { anchor: None, .. } | Placement::Clip => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    NoCoverage,
    Observed(DecodedEvent),
}

impl Cell {
    #[must_use]
    pub fn event(&self) -> Option<&DecodedEvent> {
        match self {
            Self::NoCoverage => None,
            Self::Observed(event) => Some(event),
        }
    }

    /// Character used for this cell in a rendered row.
    #[must_use]
    pub fn symbol(&self) -> char {
        match self {
            Self::NoCoverage => ' ',
            Self::Observed(event) => event.symbol(),
        }
    }
}

/// A read together with its fully decoded events.
#[derive(Debug, Clone)]
pub struct DecodedRead {
    pub read: AlignedRead,
    pub events: Vec<DecodedEvent>,
}

/// One matrix row: read metadata and exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub name: String,
    pub source_index: usize,
    pub strand: Strand,
    pub mapping_quality: Option<u8>,
    pub soft_clipped: usize,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentMatrix {
    /// Reference bases, one per reference column
    pub reference: Vec<u8>,
    pub columns: ColumnIndex,
    pub rows: Vec<Row>,
}

impl AlignmentMatrix {
    #[must_use]
    pub fn region(&self) -> &Region {
        self.columns.region()
    }

    /// Reference base shown in a column; insertion columns have none.
    #[must_use]
    pub fn reference_base(&self, column: Column) -> Option<u8> {
        match column {
            Column::Reference(position) => {
                #[allow(clippy::cast_possible_truncation)] // bounded by the region length
                self.reference
                    .get((position - self.region().start) as usize)
                    .copied()
            }
            Column::Insertion { .. } => None,
        }
    }
}

/// Insertion width after each reference position of the region (pass 1).
fn insertion_widths(region: &Region, reads: &[DecodedRead]) -> Vec<usize> {
    #[allow(clippy::cast_possible_truncation)] // regions are bounded well below usize::MAX
    let mut widths = vec![0usize; region.len() as usize];

    for decoded in reads {
        for event in &decoded.events {
            if let Placement::Insertion {
                anchor: Some(anchor),
                offset,
            } = event.placement
            {
                if region.contains(anchor) {
                    #[allow(clippy::cast_possible_truncation)]
                    let slot = &mut widths[(anchor - region.start) as usize];
                    *slot = (*slot).max(offset + 1);
                }
            }
        }
    }

    widths
}

/// Lay decoded reads out against the window's region.
///
/// Rows keep the order of `reads`. A read with no event inside the region
/// produces no row.
#[must_use]
pub fn build_matrix(window: &ReferenceWindow, reads: &[DecodedRead]) -> AlignmentMatrix {
    let region = window.region().clone();
    let widths = insertion_widths(&region, reads);
    let columns = ColumnIndex::new(region, &widths);

    debug!(
        reference = widths.len(),
        insertion = columns.insertion_count(),
        "Fixed column layout"
    );

    let mut rows = Vec::with_capacity(reads.len());
    for decoded in reads {
        let mut cells = vec![Cell::NoCoverage; columns.len()];
        let mut covered = false;

        for event in &decoded.events {
            if let Some(column) = columns.column_of(event.placement) {
                cells[column] = Cell::Observed(*event);
                covered = true;
            }
        }

        if !covered {
            debug!(read = %decoded.read.name, "No events inside region, dropping row");
            continue;
        }

        let read = &decoded.read;
        rows.push(Row {
            name: read.name.clone(),
            source_index: read.source_index,
            strand: read.strand,
            mapping_quality: read.mapping_quality,
            soft_clipped: read.soft_clipped(),
            cells,
        });
    }

    AlignmentMatrix {
        reference: window.bases().to_vec(),
        columns,
        rows,
    }
}
