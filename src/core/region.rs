use serde::{Deserialize, Serialize};

use crate::pileup::HhgaError;

/// A half-open, 0-based span `[start, end)` of a reference contig.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub contig: String,
    pub start: u64,
    pub end: u64,
}

impl Region {
    /// Build a region, rejecting empty or inverted spans.
    ///
    /// # Errors
    ///
    /// Returns `HhgaError::InvalidRegion` if `start >= end`.
    pub fn new(contig: impl Into<String>, start: u64, end: u64) -> Result<Self, HhgaError> {
        let contig = contig.into();
        if start >= end {
            return Err(HhgaError::InvalidRegion(format!(
                "{contig}:{start}-{end} is empty (start must be less than end)"
            )));
        }
        Ok(Self { contig, start, end })
    }

    /// Number of reference positions in the region.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[must_use]
    pub fn contains(&self, position: u64) -> bool {
        position >= self.start && position < self.end
    }

    /// Whether the half-open span `[start, end)` shares any position with this region.
    #[must_use]
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        start < self.end && end > self.start
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.contig, self.start, self.end)
    }
}

/// A region as written on the command line, before the contig length is known.
///
/// Accepted forms (0-based, end exclusive):
///
/// | Form | Meaning |
/// |------|---------|
/// | `chr1` | whole contig |
/// | `chr1:100` | position 100 to the end of the contig |
/// | `chr1:100-110` | positions 100..110 |
/// | `chr1:100..110` | same as above |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSpec {
    pub contig: String,
    pub start: u64,
    pub end: Option<u64>,
}

impl RegionSpec {
    /// Parse a region string.
    ///
    /// # Errors
    ///
    /// Returns `HhgaError::InvalidRegion` if the contig is empty or a
    /// coordinate is not a non-negative integer.
    pub fn parse(text: &str) -> Result<Self, HhgaError> {
        let text = text.trim();
        let invalid = |why: &str| HhgaError::InvalidRegion(format!("'{text}': {why}"));

        // Contig names may themselves contain ':', so split on the last one
        let (contig, span) = match text.rsplit_once(':') {
            Some((contig, span)) if span.chars().next().is_some_and(|c| c.is_ascii_digit()) => {
                (contig, Some(span))
            }
            _ => (text, None),
        };

        if contig.is_empty() {
            return Err(invalid("missing contig name"));
        }

        let Some(span) = span else {
            return Ok(Self {
                contig: contig.to_string(),
                start: 0,
                end: None,
            });
        };

        let (start, end) = match span.split_once("..").or_else(|| span.split_once('-')) {
            Some((start, end)) => (start, Some(end)),
            None => (span, None),
        };

        let parse_coord = |s: &str| {
            s.replace(',', "")
                .parse::<u64>()
                .map_err(|_| invalid(&format!("invalid coordinate '{s}'")))
        };

        let start = parse_coord(start)?;
        let end = end.map(parse_coord).transpose()?;

        Ok(Self {
            contig: contig.to_string(),
            start,
            end,
        })
    }

    /// Resolve against the contig length, filling in an open end.
    ///
    /// # Errors
    ///
    /// Returns `HhgaError::OutOfBounds` if the span runs past the contig, or
    /// `HhgaError::InvalidRegion` if it is empty.
    pub fn resolve(&self, contig_length: u64) -> Result<Region, HhgaError> {
        let end = self.end.unwrap_or(contig_length);
        if end > contig_length {
            return Err(HhgaError::OutOfBounds(format!(
                "{}:{}-{} exceeds contig length {contig_length}",
                self.contig, self.start, end
            )));
        }
        Region::new(self.contig.clone(), self.start, end)
    }
}

impl std::str::FromStr for RegionSpec {
    type Err = HhgaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_region() {
        let spec = RegionSpec::parse("chr1:100-110").unwrap();
        assert_eq!(spec.contig, "chr1");
        assert_eq!(spec.start, 100);
        assert_eq!(spec.end, Some(110));

        let spec = RegionSpec::parse("chr1:100..110").unwrap();
        assert_eq!(spec.end, Some(110));

        let spec = RegionSpec::parse("chr1:1,000-2,000").unwrap();
        assert_eq!(spec.start, 1000);
        assert_eq!(spec.end, Some(2000));
    }

    #[test]
    fn test_parse_open_regions() {
        let spec = RegionSpec::parse("chrM").unwrap();
        assert_eq!(spec.contig, "chrM");
        assert_eq!(spec.start, 0);
        assert!(spec.end.is_none());

        let spec = RegionSpec::parse("2:500").unwrap();
        assert_eq!(spec.contig, "2");
        assert_eq!(spec.start, 500);
        assert!(spec.end.is_none());
    }

    #[test]
    fn test_parse_contig_with_colon() {
        let spec = RegionSpec::parse("HLA-A*01:01:01:01:5-10").unwrap();
        assert_eq!(spec.contig, "HLA-A*01:01:01:01");
        assert_eq!(spec.start, 5);
        assert_eq!(spec.end, Some(10));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(RegionSpec::parse("").is_err());
        assert!(RegionSpec::parse(":100-200").is_err());
        assert!(RegionSpec::parse("chr1:100-abc").is_err());
    }

    #[test]
    fn test_resolve() {
        let region = RegionSpec::parse("chr1:100-110").unwrap().resolve(1000).unwrap();
        assert_eq!(region, Region::new("chr1", 100, 110).unwrap());
        assert_eq!(region.len(), 10);
        assert_eq!(region.to_string(), "chr1:100-110");

        let region = RegionSpec::parse("chr1:990").unwrap().resolve(1000).unwrap();
        assert_eq!(region.end, 1000);

        assert!(matches!(
            RegionSpec::parse("chr1:100-2000").unwrap().resolve(1000),
            Err(HhgaError::OutOfBounds(_))
        ));
        assert!(matches!(
            RegionSpec::parse("chr1:110-100").unwrap().resolve(1000),
            Err(HhgaError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_overlaps() {
        let region = Region::new("chr1", 100, 110).unwrap();
        assert!(region.overlaps(95, 101));
        assert!(region.overlaps(109, 120));
        assert!(!region.overlaps(90, 100));
        assert!(!region.overlaps(110, 120));
        assert!(region.contains(100));
        assert!(!region.contains(110));
    }
}
