//! Per-position depth and error counts over a finished matrix.
//!
//! | Count | Rows counted |
//! |-------|--------------|
//! | `depth` | aligned at the position (match, mismatch or deletion), or inserting after it |
//! | `insertions` | with any inserted base anchored at the position |
//! | `errors` | with a mismatch, deletion or insertion there, once per row |

use serde::Serialize;

use crate::pileup::decode::{DecodedEvent, EventKind};
use crate::pileup::matrix::{AlignmentMatrix, Cell, Column};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnStats {
    pub position: u64,
    pub reference: char,
    pub depth: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub errors: usize,
}

impl ColumnStats {
    fn new(position: u64, reference: char) -> Self {
        Self {
            position,
            reference,
            depth: 0,
            matches: 0,
            mismatches: 0,
            insertions: 0,
            deletions: 0,
            errors: 0,
        }
    }

    /// Fraction of covering rows that disagree with the reference; 0 without coverage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // counts are far below 2^52
    pub fn error_rate(&self) -> f64 {
        if self.depth == 0 {
            0.0
        } else {
            self.errors as f64 / self.depth as f64
        }
    }

    /// Count one row, given its reference cell followed by its insertion cells.
    fn add_row(&mut self, reference: &Cell, inserted: &[Cell]) {
        let inserted = inserted.iter().filter_map(Cell::event);
        let inserts = inserted.clone().next().is_some();
        let kind = reference.event().map(|event| event.kind);

        let aligned = match kind {
            Some(EventKind::Match) => {
                self.matches += 1;
                true
            }
            Some(EventKind::Mismatch) => {
                self.mismatches += 1;
                true
            }
            Some(EventKind::Deletion) => {
                self.deletions += 1;
                true
            }
            _ => false,
        };

        if inserts {
            self.insertions += 1;
        }
        if aligned || inserts {
            self.depth += 1;
        }
        let mut events = reference.event().into_iter().chain(inserted);
        if events.any(DecodedEvent::is_error) {
            self.errors += 1;
        }
    }
}

/// One entry per reference position of the matrix region, in order.
#[must_use]
pub fn column_stats(matrix: &AlignmentMatrix) -> Vec<ColumnStats> {
    let columns = matrix.columns.columns();
    let mut stats = Vec::with_capacity(matrix.reference.len());
    let mut index = 0;

    while index < columns.len() {
        let column = columns[index];
        let end = columns[index + 1..]
            .iter()
            .position(|c| matches!(c, Column::Reference(_)))
            .map_or(columns.len(), |offset| index + 1 + offset);

        if let Column::Reference(position) = column {
            let reference = matrix.reference_base(column).map_or('N', char::from);
            let mut entry = ColumnStats::new(position, reference);
            for row in &matrix.rows {
                entry.add_row(&row.cells[index], &row.cells[index + 1..end]);
            }
            stats.push(entry);
        }

        index = end;
    }

    stats
}
