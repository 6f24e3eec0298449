//! Expansion of a read's CIGAR operations into per-position events.

use serde::Serialize;

use crate::core::{AlignedRead, Operation, ReferenceWindow};
use crate::pileup::ReadError;
use crate::utils::validation::bases_equal;

/// Placeholder shown for bases absent from a read.
pub const GAP: u8 = b'-';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Match,
    Mismatch,
    Insertion,
    Deletion,
    Skip,
    Clip,
}

/// Where an event lands relative to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// At a 0-based reference position
    Reference(u64),
    /// Between reference positions, after `anchor`; `offset` counts bases
    /// into the inserted run. The anchor is None for an insertion ahead of
    /// reference position 0.
    Insertion { anchor: Option<u64>, offset: usize },
    /// Soft-clipped, not aligned anywhere
    Clip,
}

/// One read base, or one deleted reference base, in alignment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecodedEvent {
    pub placement: Placement,
    /// None for deletions and skips
    pub base: Option<u8>,
    pub quality: Option<u8>,
    pub kind: EventKind,
}

impl DecodedEvent {
    /// Character used for this event in a rendered row.
    #[must_use]
    pub fn symbol(&self) -> char {
        match (self.kind, self.base) {
            (EventKind::Skip, _) => '>',
            (_, Some(base)) => char::from(base.to_ascii_uppercase()),
            (_, None) => char::from(GAP),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self.kind,
            EventKind::Mismatch | EventKind::Insertion | EventKind::Deletion
        )
    }
}

/// Lazy walk over a read's operations.
///
/// Each call to [`decode`] starts a fresh walk, so the sequence can be
/// replayed as often as needed. The iterator stops after the first error.
pub struct Events<'a> {
    read: &'a AlignedRead,
    window: &'a ReferenceWindow,
    op_index: usize,
    op_offset: usize,
    ref_cursor: u64,
    read_cursor: usize,
    insert_offset: usize,
    done: bool,
}

/// Start decoding `read`, comparing its bases against `window`.
#[must_use]
pub fn decode<'a>(read: &'a AlignedRead, window: &'a ReferenceWindow) -> Events<'a> {
    Events {
        read,
        window,
        op_index: 0,
        op_offset: 0,
        ref_cursor: read.start,
        read_cursor: 0,
        insert_offset: 0,
        done: false,
    }
}

impl Events<'_> {
    fn length_mismatch(&self) -> ReadError {
        ReadError::CigarLengthMismatch {
            cigar: self.read.read_span(),
            bases: self.read.bases.len(),
        }
    }

    fn quality(&self) -> Option<u8> {
        self.read.qualities.get(self.read_cursor).copied()
    }

    fn reference_event(&mut self, kind: EventKind, base: Option<u8>) -> DecodedEvent {
        let position = self.ref_cursor;
        let quality = base.and_then(|_| self.quality());

        let kind = match (kind, base, self.window.base_at(position)) {
            (EventKind::Match, Some(base), Some(reference)) if !bases_equal(base, reference) => {
                EventKind::Mismatch
            }
            (kind, ..) => kind,
        };

        self.ref_cursor += 1;
        if base.is_some() {
            self.read_cursor += 1;
        }
        self.insert_offset = 0;

        DecodedEvent {
            placement: Placement::Reference(position),
            base,
            quality,
            kind,
        }
    }
}

impl Iterator for Events<'_> {
    type Item = Result<DecodedEvent, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let Some(&op) = self.read.operations.get(self.op_index) else {
                self.done = true;
                if self.read_cursor != self.read.bases.len() {
                    return Some(Err(self.length_mismatch()));
                }
                return None;
            };

            if self.op_offset >= op.len() {
                self.op_index += 1;
                self.op_offset = 0;
                continue;
            }

            if op.consumes_read() && self.read_cursor >= self.read.bases.len() {
                self.done = true;
                return Some(Err(self.length_mismatch()));
            }

            self.op_offset += 1;

            let event = match op {
                Operation::Match(_) => {
                    let base = self.read.bases[self.read_cursor];
                    self.reference_event(EventKind::Match, Some(base))
                }
                Operation::Deletion(_) => self.reference_event(EventKind::Deletion, None),
                Operation::Skip(_) => self.reference_event(EventKind::Skip, None),
                Operation::Insertion(_) => {
                    let event = DecodedEvent {
                        placement: Placement::Insertion {
                            anchor: self.ref_cursor.checked_sub(1),
                            offset: self.insert_offset,
                        },
                        base: Some(self.read.bases[self.read_cursor]),
                        quality: self.quality(),
                        kind: EventKind::Insertion,
                    };
                    self.insert_offset += 1;
                    self.read_cursor += 1;
                    event
                }
                Operation::SoftClip(_) => {
                    let event = DecodedEvent {
                        placement: Placement::Clip,
                        base: Some(self.read.bases[self.read_cursor]),
                        quality: self.quality(),
                        kind: EventKind::Clip,
                    };
                    self.read_cursor += 1;
                    event
                }
                Operation::HardClip(_) | Operation::Pad(_) => {
                    self.op_offset = op.len();
                    continue;
                }
            };

            return Some(Ok(event));
        }
    }
}

/// Check record-level consistency that the walk itself cannot see.
///
/// # Errors
///
/// Returns `ReadError::MalformedAlignment` for a read without operations or
/// with a quality string that does not match its bases.
pub fn validate(read: &AlignedRead) -> Result<(), ReadError> {
    if read.operations.is_empty() {
        return Err(ReadError::MalformedAlignment(
            "mapped read has no CIGAR operations".to_string(),
        ));
    }

    if !read.qualities.is_empty() && read.qualities.len() != read.bases.len() {
        return Err(ReadError::MalformedAlignment(format!(
            "{} quality scores for {} bases",
            read.qualities.len(),
            read.bases.len()
        )));
    }

    Ok(())
}

/// Validate and fully decode one read.
///
/// # Errors
///
/// Returns the first `ReadError` found.
pub fn decode_read(
    read: &AlignedRead,
    window: &ReferenceWindow,
) -> Result<Vec<DecodedEvent>, ReadError> {
    validate(read)?;
    decode(read, window).collect()
}
