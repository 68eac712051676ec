//! Logical entry types shared by the two container codecs.

use crate::payload::ImageKind;
use serde::Serialize;

/// Stable identity of an entry inside a container.
///
/// Indexed packs label entries by name; sector libraries number them.
/// Identity is never a byte offset, so re-layout during rebuild cannot
/// invalidate a caller's reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum EntryLabel {
    Name(String),
    Id(u16),
}

impl EntryLabel {
    /// Whether a caller-supplied label string refers to this entry.
    /// Numbered entries match their decimal representation.
    pub fn matches(&self, label: &str) -> bool {
        match self {
            EntryLabel::Name(name) => name == label,
            EntryLabel::Id(id) => label.parse::<u16>() == Ok(*id),
        }
    }
}

impl std::fmt::Display for EntryLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryLabel::Name(name) => write!(f, "{}", name),
            EntryLabel::Id(id) => write!(f, "{}", id),
        }
    }
}

/// One logical image occupying a byte range inside a container.
///
/// Owned by exactly one in-memory container snapshot while being edited;
/// it has no lifecycle of its own outside that snapshot.
#[derive(Debug, Clone)]
pub struct Entry {
    pub label: EntryLabel,
    pub kind: ImageKind,
    /// Declared pixel dimensions, zero when the payload is not sniffable.
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Entry metadata without payload bytes, as returned by `list`.
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub label: String,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
    pub length: usize,
    /// Starting sector for sector-library entries; `None` for indexed packs.
    pub start_sector: Option<u16>,
}
