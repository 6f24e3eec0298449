//! Text and JSON serialization of a [`Pileup`].
//!
//! Both renderers are pure: the same pileup always yields the same output.
//! Skipped-read warnings are never part of the rendered report.

use std::fmt::Write as _;

use serde::Serialize;

use crate::core::Variant;
use crate::pileup::matrix::{AlignmentMatrix, Column, Row};
use crate::pileup::overlay::{AlleleCall, VariantAnnotation};
use crate::pileup::stats::ColumnStats;
use crate::pileup::Pileup;

/// Shown in reference-line insertion columns and for absent read fields.
const MISSING: char = '*';

fn reference_line(matrix: &AlignmentMatrix) -> String {
    matrix
        .columns
        .columns()
        .iter()
        .map(|&column| matrix.reference_base(column).map_or(MISSING, char::from))
        .collect()
}

fn row_cells(row: &Row) -> String {
    row.cells.iter().map(|cell| cell.symbol()).collect()
}

fn variant_markers(annotations: &[VariantAnnotation]) -> String {
    annotations
        .iter()
        .map(|a| a.variant.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

fn call_markers(annotations: &[VariantAnnotation], row: usize) -> String {
    annotations
        .iter()
        .map(|a| format!("{}:{}", a.variant.position, a.calls[row].token()))
        .collect::<Vec<_>>()
        .join(";")
}

/// Render the tab-separated text report, without a trailing newline.
#[must_use]
pub fn render_text(pileup: &Pileup) -> String {
    let matrix = &pileup.matrix;
    let annotations = &pileup.annotations;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "#region\t{}", matrix.region());
    let _ = writeln!(
        out,
        "#columns\t{}\treference={}\tinsertion={}",
        matrix.columns.len(),
        matrix.reference.len(),
        matrix.columns.insertion_count()
    );
    let _ = writeln!(out, "#reads\t{}", matrix.rows.len());

    let _ = write!(out, "reference\t*\t*\t*\t{}", reference_line(matrix));
    if !annotations.is_empty() {
        let _ = write!(out, "\t{}", variant_markers(annotations));
    }
    out.push('\n');

    for (index, row) in matrix.rows.iter().enumerate() {
        let mapq = row
            .mapping_quality
            .map_or_else(|| MISSING.to_string(), |q| q.to_string());
        let _ = write!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            row.name,
            row.source_index,
            row.strand.symbol(),
            mapq,
            row_cells(row)
        );
        if !annotations.is_empty() {
            let _ = write!(out, "\t{}", call_markers(annotations, index));
        }
        out.push('\n');
    }

    out.push_str("#position\tref\tdepth\tmatch\tmismatch\tinsertion\tdeletion\terror_rate");
    for s in &pileup.stats {
        let _ = write!(
            out,
            "\n{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.4}",
            s.position,
            s.reference,
            s.depth,
            s.matches,
            s.mismatches,
            s.insertions,
            s.deletions,
            s.error_rate()
        );
    }

    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    region: String,
    columns: &'a [Column],
    reference: String,
    rows: Vec<JsonRow<'a>>,
    variants: Vec<JsonVariant<'a>>,
    stats: Vec<JsonStats<'a>>,
}

#[derive(Serialize)]
struct JsonRow<'a> {
    name: &'a str,
    source: usize,
    strand: char,
    mapping_quality: Option<u8>,
    soft_clipped: usize,
    cells: String,
}

#[derive(Serialize)]
struct JsonVariant<'a> {
    column: usize,
    #[serde(flatten)]
    variant: &'a Variant,
    calls: &'a [AlleleCall],
}

#[derive(Serialize)]
struct JsonStats<'a> {
    #[serde(flatten)]
    stats: &'a ColumnStats,
    error_rate: f64,
}

/// Render the report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(pileup: &Pileup) -> Result<String, serde_json::Error> {
    let matrix = &pileup.matrix;

    let report = JsonReport {
        region: matrix.region().to_string(),
        columns: matrix.columns.columns(),
        reference: reference_line(matrix),
        rows: matrix
            .rows
            .iter()
            .map(|row| JsonRow {
                name: &row.name,
                source: row.source_index,
                strand: row.strand.symbol(),
                mapping_quality: row.mapping_quality,
                soft_clipped: row.soft_clipped,
                cells: row_cells(row),
            })
            .collect(),
        variants: pileup
            .annotations
            .iter()
            .map(|a| JsonVariant {
                column: a.column,
                variant: &a.variant,
                calls: &a.calls,
            })
            .collect(),
        stats: pileup
            .stats
            .iter()
            .map(|s| JsonStats {
                stats: s,
                error_rate: s.error_rate(),
            })
            .collect(),
    };

    serde_json::to_string_pretty(&report)
}
