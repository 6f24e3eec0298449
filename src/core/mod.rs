//! Core data types for alignment matrix construction.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`Region`]: A half-open span of a reference contig, and [`RegionSpec`] for parsing one
//! - [`ReferenceWindow`]: The reference bases covering a region
//! - [`AlignedRead`], [`Operation`], [`Strand`]: A mapped read and its CIGAR operations
//! - [`Variant`]: A known variant supplied for overlay
//!
//! ## Coordinates
//!
//! All positions are **0-based**, and spans are half-open:
//!
//! | Input | Stored as |
//! |-------|-----------|
//! | SAM/BAM `POS` (1-based) | `POS - 1` |
//! | VCF `POS` (1-based) | `POS - 1` |
//! | Region `chr1:100-110` | start 100, end 110 (10 bases) |

pub mod alignment;
pub mod reference;
pub mod region;
pub mod variant;

pub use alignment::{AlignedRead, Operation, Strand};
pub use reference::ReferenceWindow;
pub use region::{Region, RegionSpec};
pub use variant::Variant;
