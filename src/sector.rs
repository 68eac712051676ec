//! Sector library codec: fixed-size, boundary-aligned allocation units.
//!
//! Sector 0 is the header: `[magic: "DGUS_3"][capacity: u16 LE]
//! [slot table: one {start_sector: u16 LE, length: u32 LE} slot per id]
//! [zeros to end of sector]`. A zero slot means the id is absent. Data
//! sectors start at sector 1; each entry occupies `ceil(length /
//! sector_size)` consecutive sectors from a sector boundary, with the
//! unused tail of its last sector zero-filled.
//!
//! Rebuilding re-packs the entire sector run in id order, the way a
//! compacting allocator would: growing one entry shifts every downstream
//! entry's starting sector.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ContainerError, EntryFailure, MalformedError, Result};
use crate::kind::KindDescriptor;
use crate::payload::{self, Expectation, Mode};

/// Width of one header index slot: start sector (u16) + byte length (u32).
pub const SLOT_WIDTH: usize = 6;

/// Width of the declared-capacity field following the magic.
const CAPACITY_LEN: usize = 2;

/// One stored image with its sector address.
#[derive(Debug, Clone)]
pub struct SectorEntry {
    pub id: u16,
    pub start_sector: u16,
    pub kind: payload::ImageKind,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl SectorEntry {
    /// Whole sectors this entry occupies.
    pub fn sectors(&self, sector_size: usize) -> usize {
        sectors_for(self.bytes.len(), sector_size)
    }
}

fn sectors_for(length: usize, sector_size: usize) -> usize {
    length.div_ceil(sector_size)
}

fn header_len(desc: &KindDescriptor) -> usize {
    desc.magic.len() + CAPACITY_LEN + desc.slot_count() * SLOT_WIDTH
}

/// Parse a sector library into its ordered entries, validating magic,
/// sector addressing, bounds, overlap, and the per-entry ceiling.
pub fn parse(bytes: &[u8], desc: &KindDescriptor) -> Result<Vec<SectorEntry>> {
    let sector_size = desc.sector_size;
    debug_assert!(
        header_len(desc) <= sector_size,
        "slot table must fit the header sector"
    );
    if bytes.len() < sector_size {
        return Err(MalformedError::Truncated {
            needed: sector_size,
            have: bytes.len(),
        }
        .into());
    }
    if bytes.len() % sector_size != 0 {
        return Err(MalformedError::UnalignedLength {
            length: bytes.len(),
            sector_size,
        }
        .into());
    }

    let magic_len = desc.magic.len();
    if &bytes[..magic_len] != desc.magic {
        return Err(MalformedError::BadMagic {
            expected: desc.magic.to_vec(),
            found: bytes[..magic_len].to_vec(),
        }
        .into());
    }

    let capacity = u16::from_le_bytes([bytes[magic_len], bytes[magic_len + 1]]);
    let total_sectors = bytes.len() / sector_size;
    if total_sectors > capacity as usize {
        return Err(MalformedError::CapacityMismatch {
            capacity,
            actual: total_sectors,
        }
        .into());
    }

    let ceiling = desc
        .entry_ceiling
        .unwrap_or(usize::MAX);
    let slots_at = magic_len + CAPACITY_LEN;
    let mut entries = Vec::new();
    for slot in 0..desc.slot_count() {
        let id = desc.id_min + slot as u16;
        let at = slots_at + slot * SLOT_WIDTH;
        let start_sector = u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let length = u32::from_le_bytes([
            bytes[at + 2],
            bytes[at + 3],
            bytes[at + 4],
            bytes[at + 5],
        ]) as usize;

        if start_sector == 0 && length == 0 {
            continue; // absent id
        }
        if start_sector == 0 {
            return Err(MalformedError::BadSectorAddress {
                id,
                reason: "nonzero length stored in the header sector".to_string(),
            }
            .into());
        }
        if length == 0 {
            return Err(MalformedError::BadSectorAddress {
                id,
                reason: "zero length at a nonzero sector".to_string(),
            }
            .into());
        }
        if length > ceiling {
            return Err(MalformedError::EntryTooLong {
                id,
                length,
                ceiling,
            }
            .into());
        }
        let end_sector = start_sector as usize + sectors_for(length, sector_size);
        if end_sector > total_sectors {
            return Err(MalformedError::BadSectorAddress {
                id,
                reason: format!(
                    "entry ends at sector {} but the container holds {}",
                    end_sector, total_sectors
                ),
            }
            .into());
        }

        let data_at = start_sector as usize * sector_size;
        let payload = bytes[data_at..data_at + length].to_vec();
        let (kind, width, height) = payload::sniff(&payload);
        entries.push(SectorEntry {
            id,
            start_sector,
            kind,
            width,
            height,
            bytes: payload,
        });
    }

    check_overlap(&entries, sector_size)?;

    debug!(
        class = desc.name,
        entries = entries.len(),
        sectors = total_sectors,
        "parsed sector library"
    );

    Ok(entries)
}

fn check_overlap(entries: &[SectorEntry], sector_size: usize) -> Result<()> {
    let mut ranges: Vec<(usize, usize, u16)> = entries
        .iter()
        .map(|e| {
            let start = e.start_sector as usize;
            (start, start + e.sectors(sector_size), e.id)
        })
        .collect();
    ranges.sort_unstable();
    for window in ranges.windows(2) {
        let (_, first_end, first) = window[0];
        let (second_start, _, second) = window[1];
        if second_start < first_end {
            return Err(MalformedError::EntryOverlap {
                first: first.to_string(),
                second: second.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// Build a library from scratch out of `(id, payload)` pairs, packed in
/// id order with the kind's default declared capacity.
pub fn build(desc: &KindDescriptor, entries: &BTreeMap<u16, Vec<u8>>) -> Result<Vec<u8>> {
    build_with_capacity(desc, entries, desc.sector_capacity)
}

/// Build a library with an explicit declared sector capacity.
pub fn build_with_capacity(
    desc: &KindDescriptor,
    entries: &BTreeMap<u16, Vec<u8>>,
    capacity: u16,
) -> Result<Vec<u8>> {
    for (&id, blob) in entries {
        if !desc.id_in_range(id) {
            return Err(MalformedError::BadSectorAddress {
                id,
                reason: format!(
                    "id outside the documented range {}..={}",
                    desc.id_min, desc.id_max
                ),
            }
            .into());
        }
        if blob.is_empty() {
            return Err(MalformedError::BadSectorAddress {
                id,
                reason: "empty payload".to_string(),
            }
            .into());
        }
    }

    let sector_size = desc.sector_size;
    // header sector plus each entry's rounded-up run, in id order
    let mut cursor = 1usize;
    let mut slots: Vec<(u16, usize, usize)> = Vec::with_capacity(entries.len());
    for (&id, blob) in entries {
        slots.push((id, cursor, blob.len()));
        cursor += sectors_for(blob.len(), sector_size);
    }
    let required = cursor;
    if required > capacity as usize {
        return Err(ContainerError::CapacityExceeded {
            required,
            available: capacity as usize,
        });
    }

    let mut out = vec![0u8; required * sector_size];
    let magic_len = desc.magic.len();
    out[..magic_len].copy_from_slice(desc.magic);
    out[magic_len..magic_len + CAPACITY_LEN].copy_from_slice(&capacity.to_le_bytes());

    let slots_at = magic_len + CAPACITY_LEN;
    for &(id, start, length) in &slots {
        let slot = (id - desc.id_min) as usize;
        let at = slots_at + slot * SLOT_WIDTH;
        out[at..at + 2].copy_from_slice(&(start as u16).to_le_bytes());
        out[at + 2..at + 6].copy_from_slice(&(length as u32).to_le_bytes());
    }
    for (&(_, start, _), (_, blob)) in slots.iter().zip(entries.iter()) {
        let data_at = start * sector_size;
        out[data_at..data_at + blob.len()].copy_from_slice(blob);
        // tail of the last sector is already zero-filled
    }

    Ok(out)
}

/// Rebuild a library with the given id→payload replacements.
///
/// Validates every replacement against the replaced entry's recorded
/// format class and dimensions, then re-packs the whole sector run in id
/// order. Fails with `CapacityExceeded` when the repacked run needs more
/// sectors than the header declares.
pub fn rebuild(
    bytes: &[u8],
    desc: &KindDescriptor,
    replacements: &BTreeMap<u16, Vec<u8>>,
) -> Result<Vec<u8>> {
    let entries = parse(bytes, desc)?;

    for &id in replacements.keys() {
        if !entries.iter().any(|e| e.id == id) {
            return Err(ContainerError::UnknownLabel(id.to_string()));
        }
    }

    let ceiling = desc.entry_ceiling.unwrap_or(usize::MAX);
    let mut failures = Vec::new();
    for (&id, blob) in replacements {
        let entry = entries
            .iter()
            .find(|e| e.id == id)
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
                label: id.to_string(),
                violations: report.into_violations(),
            });
        }
    }
    if !failures.is_empty() {
        return Err(ContainerError::ValidationFailed(failures));
    }

    let magic_len = desc.magic.len();
    let capacity = u16::from_le_bytes([bytes[magic_len], bytes[magic_len + 1]]);

    debug!(
        class = desc.name,
        replaced = replacements.len(),
        capacity,
        "repacking sector library"
    );

    let merged: BTreeMap<u16, Vec<u8>> = entries
        .into_iter()
        .map(|entry| {
            let payload = replacements.get(&entry.id).cloned().unwrap_or(entry.bytes);
            (entry.id, payload)
        })
        .collect();

    build_with_capacity(desc, &merged, capacity)
}
