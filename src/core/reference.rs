use crate::core::region::Region;
use crate::pileup::HhgaError;

/// The reference bases covering a region. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceWindow {
    region: Region,
    bases: Vec<u8>,
}

impl ReferenceWindow {
    /// Wrap bases for `region`, upper-casing them.
    ///
    /// # Errors
    ///
    /// Returns `HhgaError::OutOfBounds` if the number of bases differs from
    /// the region length.
    pub fn new(region: Region, bases: impl Into<Vec<u8>>) -> Result<Self, HhgaError> {
        let mut bases = bases.into();
        if bases.len() as u64 != region.len() {
            return Err(HhgaError::OutOfBounds(format!(
                "{region} needs {} reference bases, got {}",
                region.len(),
                bases.len()
            )));
        }
        bases.make_ascii_uppercase();
        Ok(Self { region, bases })
    }

    /// Cut the window for `region` out of a full contig sequence.
    ///
    /// # Errors
    ///
    /// Returns `HhgaError::OutOfBounds` if the region ends past the sequence.
    pub fn from_contig(region: Region, contig: &[u8]) -> Result<Self, HhgaError> {
        let length = contig.len() as u64;
        if region.end > length {
            return Err(HhgaError::OutOfBounds(format!(
                "{region} exceeds contig length {length}"
            )));
        }

        #[allow(clippy::cast_possible_truncation)] // bounded by contig.len()
        let bases = contig[region.start as usize..region.end as usize].to_vec();
        Self::new(region, bases)
    }

    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    #[must_use]
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    /// Reference base at an absolute 0-based position, if inside the window.
    #[must_use]
    pub fn base_at(&self, position: u64) -> Option<u8> {
        if !self.region.contains(position) {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)] // bounded by the region length
        self.bases.get((position - self.region.start) as usize).copied()
    }
}
