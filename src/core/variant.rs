use serde::{Deserialize, Serialize};

/// A known variant at a single reference position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// 0-based position of the first reference allele base
    pub position: u64,
    pub reference: String,
    pub alternates: Vec<String>,
}

impl Variant {
    pub fn new(position: u64, reference: impl Into<String>, alternates: Vec<String>) -> Self {
        Self {
            position,
            reference: reference.into(),
            alternates,
        }
    }

    /// Exclusive end of the reference allele on the reference.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.position + self.reference.len().max(1) as u64
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}>{}",
            self.position,
            self.reference,
            self.alternates.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_end() {
        let v = Variant::new(104, "AT", vec!["A".to_string(), "ATT".to_string()]);
        assert_eq!(v.to_string(), "104:AT>A,ATT");
        assert_eq!(v.end(), 106);
    }
}
