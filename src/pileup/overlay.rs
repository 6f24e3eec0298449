//! Annotation of matrix columns with known variants.

use serde::Serialize;
use tracing::debug;

use crate::core::Variant;
use crate::pileup::matrix::{AlignmentMatrix, Cell, Column, Row};

/// Which allele a read shows at a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlleleCall {
    Reference,
    /// Index into the variant's alternate alleles
    Alternate(usize),
    /// Covered, but matches no listed allele
    Other,
    /// The read does not span the reference allele
    NoCoverage,
}

impl AlleleCall {
    /// VCF-style allele token: `0` reference, `1..` alternates, `?` other, `.` uncovered.
    #[must_use]
    pub fn token(self) -> String {
        match self {
            Self::Reference => "0".to_string(),
            Self::Alternate(i) => (i + 1).to_string(),
            Self::Other => "?".to_string(),
            Self::NoCoverage => ".".to_string(),
        }
    }
}

/// A variant attached to its reference column, with one call per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantAnnotation {
    pub column: usize,
    pub variant: Variant,
    pub calls: Vec<AlleleCall>,
}

/// The allele a row shows across `columns`, or None if a reference column is uncovered.
fn observed_allele(
    matrix: &AlignmentMatrix,
    row: &Row,
    columns: std::ops::Range<usize>,
) -> Option<String> {
    let mut allele = String::new();

    for index in columns {
        let column = matrix.columns.columns()[index];
        match (column, &row.cells[index]) {
            (Column::Reference(_), Cell::NoCoverage) => return None,
            (Column::Insertion { .. }, Cell::NoCoverage) => {}
            (_, Cell::Observed(event)) => {
                if let Some(base) = event.base {
                    allele.push(char::from(base.to_ascii_uppercase()));
                }
            }
        }
    }

    Some(allele)
}

fn call_allele(variant: &Variant, observed: Option<&str>) -> AlleleCall {
    let Some(observed) = observed else {
        return AlleleCall::NoCoverage;
    };

    if observed.eq_ignore_ascii_case(&variant.reference) {
        return AlleleCall::Reference;
    }

    variant
        .alternates
        .iter()
        .position(|alt| observed.eq_ignore_ascii_case(alt))
        .map_or(AlleleCall::Other, AlleleCall::Alternate)
}

/// Attach each variant inside the matrix region to its reference column.
///
/// Matrix cells are not modified. Variants outside the region are ignored.
/// A variant whose reference allele runs past the region end cannot be
/// observed in full, so every row is called [`AlleleCall::NoCoverage`].
/// Annotations are ordered by column, keeping input order within a column.
pub fn annotate<V>(matrix: &AlignmentMatrix, variants: V) -> Vec<VariantAnnotation>
where
    V: IntoIterator<Item = Variant>,
{
    let mut annotations = Vec::new();

    for variant in variants {
        let length = variant.reference.len().max(1) as u64;
        let Some(span) = matrix.columns.span(variant.position, length) else {
            debug!(variant = %variant, "Variant outside region, ignoring");
            continue;
        };

        let complete = variant.end() <= matrix.region().end;
        if !complete {
            debug!(variant = %variant, "Variant runs past the region end, calling no coverage");
        }

        let calls = matrix
            .rows
            .iter()
            .map(|row| {
                let observed = complete
                    .then(|| observed_allele(matrix, row, span.clone()))
                    .flatten();
                call_allele(&variant, observed.as_deref())
            })
            .collect();

        annotations.push(VariantAnnotation {
            column: span.start,
            variant,
            calls,
        });
    }

    annotations.sort_by_key(|a| a.column);
    annotations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::tests::read;
    use crate::core::{ReferenceWindow, Region};
    use crate::pileup::decode::decode_read;
    use crate::pileup::matrix::{build_matrix, DecodedRead};

    fn matrix(reads: Vec<crate::core::AlignedRead>) -> AlignmentMatrix {
        let window =
            ReferenceWindow::new(Region::new("chr1", 100, 110).unwrap(), b"ACGTACGTAC".to_vec())
                .unwrap();
        let decoded: Vec<DecodedRead> = reads
            .into_iter()
            .map(|read| {
                let events = decode_read(&read, &window).unwrap();
                DecodedRead { read, events }
            })
            .collect();
        build_matrix(&window, &decoded)
    }

    fn snv() -> Variant {
        Variant::new(104, "A", vec!["G".to_string()])
    }

    #[test]
    fn test_snv_calls() {
        let m = matrix(vec![
            read("alt", 100, "10M", "ACGTGCGTAC"),
            read("ref", 100, "10M", "ACGTACGTAC"),
            read("other", 100, "10M", "ACGTTCGTAC"),
            read("short", 100, "3M", "ACG"),
        ]);

        let annotations = annotate(&m, vec![snv()]);
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].column, 4);
        assert_eq!(
            annotations[0].calls,
            vec![
                AlleleCall::Alternate(0),
                AlleleCall::Reference,
                AlleleCall::Other,
                AlleleCall::NoCoverage,
            ]
        );
    }

    #[test]
    fn test_annotation_leaves_cells_untouched() {
        let m = matrix(vec![read("alt", 100, "10M", "ACGTGCGTAC")]);
        let before = m.clone();
        let _ = annotate(&m, vec![snv()]);
        assert_eq!(m, before);
    }

    #[test]
    fn test_insertion_allele() {
        let m = matrix(vec![
            read("ins", 100, "5M2I5M", "ACGTATTCGTAC"),
            read("plain", 100, "10M", "ACGTACGTAC"),
        ]);
        let variant = Variant::new(104, "A", vec!["ATT".to_string()]);

        let annotations = annotate(&m, vec![variant]);
        assert_eq!(
            annotations[0].calls,
            vec![AlleleCall::Alternate(0), AlleleCall::Reference]
        );
    }

    #[test]
    fn test_deletion_allele() {
        let m = matrix(vec![
            read("del", 100, "5M2D3M", "ACGTATAC"),
            read("plain", 100, "10M", "ACGTACGTAC"),
        ]);
        let variant = Variant::new(104, "ACG", vec!["A".to_string()]);

        let annotations = annotate(&m, vec![variant]);
        assert_eq!(
            annotations[0].calls,
            vec![AlleleCall::Alternate(0), AlleleCall::Reference]
        );
    }

    #[test]
    fn test_allele_past_region_end_is_uncovered() {
        let m = matrix(vec![read("plain", 100, "10M", "ACGTACGTAC")]);

        let clipped = Variant::new(108, "ACG", vec!["A".to_string()]);
        let annotations = annotate(&m, vec![clipped]);
        assert_eq!(annotations[0].column, 8);
        assert_eq!(annotations[0].calls, vec![AlleleCall::NoCoverage]);

        let at_edge = Variant::new(108, "AC", vec!["A".to_string()]);
        let annotations = annotate(&m, vec![at_edge]);
        assert_eq!(annotations[0].calls, vec![AlleleCall::Reference]);
    }

    #[test]
    fn test_multiallelic_and_ordering() {
        let m = matrix(vec![read("t", 100, "10M", "ACTTACGTAC")]);
        let variants = vec![
            snv(),
            Variant::new(102, "G", vec!["A".to_string(), "T".to_string()]),
            Variant::new(300, "A", vec!["C".to_string()]),
        ];

        let annotations = annotate(&m, variants);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].variant.position, 102);
        assert_eq!(annotations[0].calls, vec![AlleleCall::Alternate(1)]);
        assert_eq!(annotations[1].variant.position, 104);
        assert_eq!(annotations[1].calls, vec![AlleleCall::Reference]);
    }

    #[test]
    fn test_tokens() {
        assert_eq!(AlleleCall::Reference.token(), "0");
        assert_eq!(AlleleCall::Alternate(0).token(), "1");
        assert_eq!(AlleleCall::Alternate(2).token(), "3");
        assert_eq!(AlleleCall::Other.token(), "?");
        assert_eq!(AlleleCall::NoCoverage.token(), ".");
    }
}
