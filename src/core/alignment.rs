use serde::{Deserialize, Serialize};

/// One run-length alignment operation, as found in a CIGAR string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Alignment match or mismatch (`M`, `=`, `X`)
    Match(usize),
    /// Bases present in the read but not the reference (`I`)
    Insertion(usize),
    /// Reference bases absent from the read (`D`)
    Deletion(usize),
    /// Skipped reference region, e.g. an intron (`N`)
    Skip(usize),
    /// Read bases present in the record but not aligned (`S`)
    SoftClip(usize),
    /// Bases removed from the record entirely (`H`)
    HardClip(usize),
    /// Silent padding (`P`)
    Pad(usize),
}

impl Operation {
    #[must_use]
    pub fn len(self) -> usize {
        match self {
            Self::Match(n)
            | Self::Insertion(n)
            | Self::Deletion(n)
            | Self::Skip(n)
            | Self::SoftClip(n)
            | Self::HardClip(n)
            | Self::Pad(n) => n,
        }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Whether the operation advances the reference cursor.
    #[must_use]
    pub fn consumes_reference(self) -> bool {
        matches!(self, Self::Match(_) | Self::Deletion(_) | Self::Skip(_))
    }

    /// Whether the operation advances the read-base cursor.
    #[must_use]
    pub fn consumes_read(self) -> bool {
        matches!(
            self,
            Self::Match(_) | Self::Insertion(_) | Self::SoftClip(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Self::Forward => '+',
            Self::Reverse => '-',
        }
    }
}

/// A mapped read, already aligned to the reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRead {
    /// Which input file the read came from
    pub source_index: usize,
    /// Position of the record within its input file
    pub record_index: usize,
    pub name: String,
    /// 0-based reference position of the first aligned base
    pub start: u64,
    pub operations: Vec<Operation>,
    pub bases: Vec<u8>,
    /// Phred qualities, one per base; empty when the record carries none
    pub qualities: Vec<u8>,
    pub mapping_quality: Option<u8>,
    pub strand: Strand,
}

impl AlignedRead {
    /// Number of reference positions covered by the alignment.
    #[must_use]
    pub fn reference_span(&self) -> u64 {
        self.operations
            .iter()
            .filter(|op| op.consumes_reference())
            .map(|op| op.len() as u64)
            .sum()
    }

    /// Exclusive 0-based end of the alignment on the reference.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.start + self.reference_span()
    }

    /// Number of read bases the operations account for.
    #[must_use]
    pub fn read_span(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| op.consumes_read())
            .map(|op| op.len())
            .sum()
    }

    /// Total soft-clipped bases at either end.
    #[must_use]
    pub fn soft_clipped(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::SoftClip(_)))
            .map(|op| op.len())
            .sum()
    }

    /// Merge key: start, then input file, then file order.
    #[must_use]
    pub fn sort_key(&self) -> (u64, usize, usize) {
        (self.start, self.source_index, self.record_index)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Parse a CIGAR string such as `5M2I5M`.
    ///
    /// Returns None for `*`, an empty string, or any malformed text.
    pub(crate) fn parse_cigar(text: &str) -> Option<Vec<Operation>> {
        if text.is_empty() || text == "*" {
            return None;
        }

        let mut ops = Vec::new();
        let mut len: Option<usize> = None;

        for c in text.chars() {
            if let Some(digit) = c.to_digit(10) {
                len = Some(len.unwrap_or(0).checked_mul(10)?.checked_add(digit as usize)?);
                continue;
            }

            let n = len.take()?;
            let op = match c {
                'M' | '=' | 'X' => Operation::Match(n),
                'I' => Operation::Insertion(n),
                'D' => Operation::Deletion(n),
                'N' => Operation::Skip(n),
                'S' => Operation::SoftClip(n),
                'H' => Operation::HardClip(n),
                'P' => Operation::Pad(n),
                _ => return None,
            };
            ops.push(op);
        }

        if len.is_some() {
            return None;
        }

        Some(ops)
    }

    /// Build a read from CIGAR text for tests.
    pub(crate) fn read(name: &str, start: u64, cigar: &str, bases: &str) -> AlignedRead {
        AlignedRead {
            source_index: 0,
            record_index: 0,
            name: name.to_string(),
            start,
            operations: parse_cigar(cigar).unwrap(),
            bases: bases.as_bytes().to_vec(),
            qualities: vec![30; bases.len()],
            mapping_quality: Some(60),
            strand: Strand::Forward,
        }
    }

    #[test]
    fn test_parse_cigar() {
        let ops = parse_cigar("3S5M2I4D1=1X10N2H").unwrap();
        assert_eq!(
            ops,
            vec![
                Operation::SoftClip(3),
                Operation::Match(5),
                Operation::Insertion(2),
                Operation::Deletion(4),
                Operation::Match(1),
                Operation::Match(1),
                Operation::Skip(10),
                Operation::HardClip(2),
            ]
        );
    }

    #[test]
    fn test_parse_cigar_invalid() {
        assert!(parse_cigar("*").is_none());
        assert!(parse_cigar("").is_none());
        assert!(parse_cigar("M5").is_none());
        assert!(parse_cigar("5M3").is_none());
        assert!(parse_cigar("5Q").is_none());
    }

    #[test]
    fn test_spans_account_for_read_and_reference() {
        let r = read("r1", 100, "2S5M2I3D5M1H", "NNACGTATTACGTA");

        // reference-consuming: 5 + 3 + 5
        assert_eq!(r.reference_span(), 13);
        assert_eq!(r.end(), 113);

        // read-consuming: 2 + 5 + 2 + 5
        assert_eq!(r.read_span(), 14);
        assert_eq!(r.read_span(), r.bases.len());
        assert_eq!(r.soft_clipped(), 2);
    }

    #[test]
    fn test_sort_key_orders_by_start_then_source() {
        let mut a = read("a", 100, "5M", "ACGTA");
        let mut b = read("b", 100, "5M", "ACGTA");
        a.source_index = 1;
        b.source_index = 0;
        assert!(b.sort_key() < a.sort_key());

        let c = read("c", 99, "5M", "ACGTA");
        assert!(c.sort_key() < b.sort_key());
    }
}
