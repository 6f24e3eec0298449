//! Centralized validation and helper functions.

/// Maximum number of reference bases a single region may span.
///
/// Every decoded read for the region is buffered before the matrix is laid
/// out, so the window has to stay small.
pub const MAX_REGION_LENGTH: u64 = 1_000_000;

/// Consecutive undecodable records after which a source is treated as corrupt.
pub const MAX_CONSECUTIVE_MALFORMED: usize = 1_000;

/// Check whether a region of `length` bases may be built.
///
/// Returns an error message if the length exceeds the limit, None if safe.
///
/// # Example
/// ```
/// use hhga::utils::validation::check_region_length;
///
/// assert!(check_region_length(10).is_none());
/// assert!(check_region_length(2_000_000).is_some());
/// ```
#[must_use]
pub fn check_region_length(length: u64) -> Option<String> {
    if length > MAX_REGION_LENGTH {
        Some(format!(
            "Region spans {length} bases, exceeding maximum of {MAX_REGION_LENGTH}"
        ))
    } else {
        None
    }
}

/// Validate that a string is a usable allele: non-empty, nucleotide letters only.
///
/// Symbolic alleles (`<DEL>`), breakends and the spanning-deletion `*` are
/// not sequence alleles and fail this check.
///
/// # Examples
///
/// ```
/// use hhga::utils::validation::is_sequence_allele;
///
/// assert!(is_sequence_allele("ACGT"));
/// assert!(is_sequence_allele("n"));
/// assert!(!is_sequence_allele("<DEL>"));
/// assert!(!is_sequence_allele("*"));
/// assert!(!is_sequence_allele(""));
/// ```
#[must_use]
pub fn is_sequence_allele(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'N'))
}

/// Case-insensitive comparison of two bases.
#[inline]
#[must_use]
pub fn bases_equal(a: u8, b: u8) -> bool {
    a.eq_ignore_ascii_case(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_region_length() {
        assert!(check_region_length(1).is_none());
        assert!(check_region_length(MAX_REGION_LENGTH).is_none());

        let msg = check_region_length(MAX_REGION_LENGTH + 1).unwrap();
        assert!(msg.contains("1000001"));
    }

    #[test]
    fn test_is_sequence_allele() {
        assert!(is_sequence_allele("A"));
        assert!(is_sequence_allele("acgtn"));
        assert!(!is_sequence_allele("<INS>"));
        assert!(!is_sequence_allele("A]chr2:100]"));
        assert!(!is_sequence_allele("."));
    }

    #[test]
    fn test_bases_equal() {
        assert!(bases_equal(b'a', b'A'));
        assert!(bases_equal(b'G', b'G'));
        assert!(!bases_equal(b'A', b'T'));
    }
}
