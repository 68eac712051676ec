use crate::payload::Violation;
use thiserror::Error;

/// Structural corruption detected while decoding a container.
///
/// Any of these means the byte sequence is not a valid container of the
/// requested kind; the operation that raised it is terminal.
#[derive(Error, Debug)]
pub enum MalformedError {
    #[error("bad magic: expected {expected:02X?}, found {found:02X?}")]
    BadMagic { expected: Vec<u8>, found: Vec<u8> },

    #[error("container truncated: need at least {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    #[error("container length {length} is not a whole number of {sector_size}-byte sectors")]
    UnalignedLength { length: usize, sector_size: usize },

    #[error("entry count mismatch: header declares {declared} entries, container holds at most {possible}")]
    CountMismatch { declared: usize, possible: usize },

    #[error("table record {index} does not contain a valid label")]
    BadLabel { index: usize },

    #[error("duplicate label '{label}' in offset table")]
    DuplicateLabel { label: String },

    #[error("label '{label}' exceeds the {max}-byte label field")]
    LabelTooLong { label: String, max: usize },

    #[error("entry '{label}' out of bounds: offset {offset} + length {length} exceeds container size {size}")]
    EntryOutOfBounds {
        label: String,
        offset: u64,
        length: u64,
        size: usize,
    },

    #[error("entries '{first}' and '{second}' declare overlapping byte ranges")]
    EntryOverlap { first: String, second: String },

    #[error("entry '{label}' does not fit the u32 offset space: container would be {required} bytes")]
    AddressSpaceExhausted { label: String, required: u64 },

    #[error("entry {id} has a bad sector address: {reason}")]
    BadSectorAddress { id: u16, reason: String },

    #[error("entry {id} is {length} bytes, over the {ceiling}-byte per-entry ceiling")]
    EntryTooLong {
        id: u16,
        length: usize,
        ceiling: usize,
    },

    #[error("declared capacity is {capacity} sectors but the container holds {actual}")]
    CapacityMismatch { capacity: u16, actual: usize },
}

/// The complete list of constraints a single replacement payload violated.
#[derive(Debug)]
pub struct EntryFailure {
    /// Label (or decimal id) of the replacement target.
    pub label: String,
    pub violations: Vec<Violation>,
}

impl std::fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}': ", self.label)?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

fn format_failures(failures: &[EntryFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// The primary error type for all container operations.
///
/// The four domain conditions (`Malformed`, `ValidationFailed`,
/// `UnknownLabel`, `CapacityExceeded`) are all terminal: the codec never
/// partially recovers, auto-strips metadata, or transcodes payloads, since
/// that would hide a firmware-visible failure from the operator.
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("malformed container: {0}")]
    Malformed(#[from] MalformedError),

    /// One or more replacement payloads violated the target entry's
    /// constraints. Every violation is listed, never just the first.
    #[error("payload validation failed: {}", format_failures(.0))]
    ValidationFailed(Vec<EntryFailure>),

    #[error("unknown label '{0}': not present in the container table")]
    UnknownLabel(String),

    #[error("capacity exceeded: rebuild needs {required} sectors, container is declared for {available}")]
    CapacityExceeded { required: usize, available: usize },

    /// I/O errors only occur in file plumbing around the codec (the CLI);
    /// the library itself operates on in-memory bytes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using the crate's error type.
pub type Result<T> = std::result::Result<T, ContainerError>;
