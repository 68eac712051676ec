//! Icon pack codec: labeled entries behind an offset table.
//!
//! Composes the offset table codec and the payload validator. `parse`
//! yields the pack's entries in table order with each payload's sniffed
//! format class and dimensions; `rebuild` swaps payloads by label while
//! preserving table order and every untouched entry's bytes exactly.

use std::collections::BTreeMap;

use tracing::debug;

use crate::entry::{Entry, EntryLabel};
use crate::error::{ContainerError, EntryFailure, Result};
use crate::kind::KindDescriptor;
use crate::payload::{self, Expectation, Mode};
use crate::table;

/// Parse a pack into its ordered, labeled entries.
pub fn parse(bytes: &[u8], desc: &KindDescriptor) -> Result<Vec<Entry>> {
    let (header, records) = table::decode(bytes, desc)?;
    debug!(
        class = desc.name,
        entries = header.entry_count,
        "parsed icon pack"
    );

    let entries = records
        .into_iter()
        .map(|record| {
            let start = record.offset as usize;
            let payload = bytes[start..start + record.length as usize].to_vec();
            let (kind, width, height) = payload::sniff(&payload);
            Entry {
                label: EntryLabel::Name(record.label),
                kind,
                width,
                height,
                bytes: payload,
            }
        })
        .collect();

    Ok(entries)
}

/// Build a pack from scratch out of ordered `(label, payload)` pairs.
pub fn build(desc: &KindDescriptor, entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    table::encode(desc, entries)
}

/// Rebuild a pack with the given label→payload replacements.
///
/// Every replacement is validated against the replaced entry's recorded
/// format class and dimensions before any output is produced; a single
/// violation anywhere fails the whole operation with the complete
/// diagnostic list. Labels absent from the table are rejected; the table
/// never grows implicitly.
pub fn rebuild(
    bytes: &[u8],
    desc: &KindDescriptor,
    replacements: &BTreeMap<String, Vec<u8>>,
) -> Result<Vec<u8>> {
    let entries = parse(bytes, desc)?;

    for label in replacements.keys() {
        if !entries.iter().any(|e| e.label.matches(label)) {
            return Err(ContainerError::UnknownLabel(label.clone()));
        }
    }

    let ceiling = entry_ceiling(desc, entries.len());
    let mut failures = Vec::new();
    for (label, blob) in replacements {
        let entry = entries
            .iter()
            .find(|e| e.label.matches(label))
            .expect("presence checked above");
        let expectation = Expectation {
            kind: entry.kind,
            width: entry.width,
            height: entry.height,
            ceiling,
        };
        let report = payload::validate(blob, &expectation, Mode::CollectAll);
        if !report.is_ok() {
            failures.push(EntryFailure {
                label: label.clone(),
                violations: report.into_violations(),
            });
        }
    }
    if !failures.is_empty() {
        return Err(ContainerError::ValidationFailed(failures));
    }

    debug!(
        class = desc.name,
        replaced = replacements.len(),
        "rebuilding icon pack"
    );

    let pairs: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|entry| {
            let label = match &entry.label {
                EntryLabel::Name(name) => name.as_str(),
                EntryLabel::Id(_) => unreachable!("pack entries are named"),
            };
            let payload = replacements
                .get(label)
                .map(|blob| blob.as_slice())
                .unwrap_or(&entry.bytes);
            (label, payload)
        })
        .collect();

    table::encode(desc, &pairs)
}

/// Per-entry byte ceiling for a pack: whatever the offset table's u32
/// address space leaves after the header and records, unless the kind
/// documents a tighter value.
pub fn entry_ceiling(desc: &KindDescriptor, entry_count: usize) -> usize {
    desc.entry_ceiling
        .unwrap_or_else(|| u32::MAX as usize - table::data_start(desc, entry_count))
}
