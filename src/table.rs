//! Offset table codec for indexed-pack containers.
//!
//! Layout: `[magic:4][entry_count:2 LE][record × count][entry bytes]`,
//! where each record is `[label: N bytes, NUL-padded][offset: u32 LE]
//! [length: u32 LE]`. Offsets address the whole container; table order
//! need not match byte order. Encoding is canonical and deterministic:
//! records in table order, payloads packed contiguously in the same order
//! directly after the table, no padding. Re-encoding an unmodified
//! canonical parse is a byte-for-byte round trip.

use crate::error::{MalformedError, Result};
use crate::kind::KindDescriptor;

/// Width of the magic field.
pub const MAGIC_LEN: usize = 4;

/// Width of the entry-count field.
pub const COUNT_LEN: usize = 2;

/// Fixed-layout header of an indexed pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackHeader {
    pub magic: [u8; MAGIC_LEN],
    pub entry_count: u16,
}

/// One fixed-width table record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    pub label: String,
    pub offset: u32,
    pub length: u32,
}

/// Width of one table record for the given kind.
pub fn record_width(desc: &KindDescriptor) -> usize {
    desc.label_width + 8
}

/// Byte offset where entry data starts for a table of `count` records.
pub fn data_start(desc: &KindDescriptor, count: usize) -> usize {
    MAGIC_LEN + COUNT_LEN + count * record_width(desc)
}

/// Decode the header and offset table, validating every structural
/// invariant: magic, declared count vs container size, per-record bounds,
/// range overlap, label integrity.
pub fn decode(bytes: &[u8], desc: &KindDescriptor) -> Result<(PackHeader, Vec<TableRecord>)> {
    let header_len = MAGIC_LEN + COUNT_LEN;
    if bytes.len() < header_len {
        return Err(MalformedError::Truncated {
            needed: header_len,
            have: bytes.len(),
        }
        .into());
    }

    if &bytes[..MAGIC_LEN] != desc.magic {
        return Err(MalformedError::BadMagic {
            expected: desc.magic.to_vec(),
            found: bytes[..MAGIC_LEN].to_vec(),
        }
        .into());
    }

    let mut magic = [0u8; MAGIC_LEN];
    magic.copy_from_slice(&bytes[..MAGIC_LEN]);
    let entry_count = u16::from_le_bytes([bytes[4], bytes[5]]);

    let count = entry_count as usize;
    let table_end = data_start(desc, count);
    if table_end > bytes.len() {
        return Err(MalformedError::CountMismatch {
            declared: count,
            possible: (bytes.len() - header_len) / record_width(desc),
        }
        .into());
    }

    let mut records = Vec::with_capacity(count);
    let mut seen = std::collections::HashSet::new();
    for index in 0..count {
        let record_at = header_len + index * record_width(desc);
        let label_bytes = &bytes[record_at..record_at + desc.label_width];
        let label_end = label_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(desc.label_width);
        let label = std::str::from_utf8(&label_bytes[..label_end])
            .map_err(|_| MalformedError::BadLabel { index })?
            .to_string();
        if label.is_empty() {
            return Err(MalformedError::BadLabel { index }.into());
        }
        if !seen.insert(label.clone()) {
            return Err(MalformedError::DuplicateLabel { label }.into());
        }

        let field_at = record_at + desc.label_width;
        let offset = u32::from_le_bytes([
            bytes[field_at],
            bytes[field_at + 1],
            bytes[field_at + 2],
            bytes[field_at + 3],
        ]);
        let length = u32::from_le_bytes([
            bytes[field_at + 4],
            bytes[field_at + 5],
            bytes[field_at + 6],
            bytes[field_at + 7],
        ]);

        let start = offset as u64;
        let end = start + length as u64;
        if start < table_end as u64 || end > bytes.len() as u64 {
            return Err(MalformedError::EntryOutOfBounds {
                label,
                offset: start,
                length: length as u64,
                size: bytes.len(),
            }
            .into());
        }

        records.push(TableRecord {
            label,
            offset,
            length,
        });
    }

    check_overlap(&records)?;

    Ok((
        PackHeader {
            magic,
            entry_count,
        },
        records,
    ))
}

/// Reject any two records whose declared `(offset, length)` ranges
/// intersect. Zero-length entries occupy no range and cannot overlap.
fn check_overlap(records: &[TableRecord]) -> Result<()> {
    let mut ranges: Vec<(u64, u64, &str)> = records
        .iter()
        .filter(|r| r.length > 0)
        .map(|r| (r.offset as u64, r.offset as u64 + r.length as u64, r.label.as_str()))
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

/// Encode a pack canonically from ordered `(label, payload)` pairs.
///
/// Deterministic: identical input always produces byte-identical output.
pub fn encode(desc: &KindDescriptor, entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    if entries.len() > u16::MAX as usize {
        return Err(MalformedError::CountMismatch {
            declared: entries.len(),
            possible: u16::MAX as usize,
        }
        .into());
    }
    for (label, _) in entries {
        if label.len() > desc.label_width {
            return Err(MalformedError::LabelTooLong {
                label: label.to_string(),
                max: desc.label_width,
            }
            .into());
        }
    }

    let start = data_start(desc, entries.len());
    // every offset must stay addressable as a u32, cumulatively
    let mut end = start as u64;
    for (label, bytes) in entries {
        end += bytes.len() as u64;
        if end > u32::MAX as u64 {
            return Err(MalformedError::AddressSpaceExhausted {
                label: label.to_string(),
                required: end,
            }
            .into());
        }
    }
    let mut out = Vec::with_capacity(end as usize);

    out.extend_from_slice(desc.magic);
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());

    let mut offset = start as u64;
    for (label, bytes) in entries {
        let mut field = vec![0u8; desc.label_width];
        field[..label.len()].copy_from_slice(label.as_bytes());
        out.extend_from_slice(&field);
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        offset += bytes.len() as u64;
    }
    for (_, bytes) in entries {
        out.extend_from_slice(bytes);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ContainerError, MalformedError};
    use crate::kind::T5UIC1;

    fn sample_pack() -> Vec<u8> {
        encode(
            &T5UIC1,
            &[
                ("000-ICON_LOGO", b"payload-a".as_slice()),
                ("001-ICON_OK", b"bb".as_slice()),
                ("002-ICON_NO", b"".as_slice()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let bytes = sample_pack();
        let (header, records) = decode(&bytes, &T5UIC1).unwrap();
        assert_eq!(&header.magic, b"DICO");
        assert_eq!(header.entry_count, 3);
        assert_eq!(records[0].label, "000-ICON_LOGO");
        assert_eq!(records[0].length, 9);
        assert_eq!(records[1].label, "001-ICON_OK");
        assert_eq!(records[2].length, 0);

        // re-encoding the unmodified parse is byte-identical
        let payloads: Vec<(&str, &[u8])> = records
            .iter()
            .map(|r| {
                (
                    r.label.as_str(),
                    &bytes[r.offset as usize..(r.offset + r.length) as usize],
                )
            })
            .collect();
        assert_eq!(encode(&T5UIC1, &payloads).unwrap(), bytes);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample_pack();
        bytes[0] = b'X';
        assert!(matches!(
            decode(&bytes, &T5UIC1),
            Err(ContainerError::Malformed(MalformedError::BadMagic { .. }))
        ));
    }

    #[test]
    fn test_declared_count_exceeds_container() {
        let mut bytes = sample_pack();
        bytes[4..6].copy_from_slice(&100u16.to_le_bytes());
        assert!(matches!(
            decode(&bytes, &T5UIC1),
            Err(ContainerError::Malformed(MalformedError::CountMismatch { .. }))
        ));
    }

    #[test]
    fn test_out_of_bounds_entry() {
        let mut bytes = sample_pack();
        // point the first record past the end of the container
        let field_at = MAGIC_LEN + COUNT_LEN + T5UIC1.label_width;
        let bad = (bytes.len() as u32).to_le_bytes();
        bytes[field_at..field_at + 4].copy_from_slice(&bad);
        assert!(matches!(
            decode(&bytes, &T5UIC1),
            Err(ContainerError::Malformed(
                MalformedError::EntryOutOfBounds { .. }
            ))
        ));
    }

    #[test]
    fn test_offset_inside_table_rejected() {
        let mut bytes = sample_pack();
        let field_at = MAGIC_LEN + COUNT_LEN + T5UIC1.label_width;
        bytes[field_at..field_at + 4].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            decode(&bytes, &T5UIC1),
            Err(ContainerError::Malformed(
                MalformedError::EntryOutOfBounds { .. }
            ))
        ));
    }

    #[test]
    fn test_overlapping_entries_rejected() {
        let mut bytes = sample_pack();
        // make the second record cover the first record's range
        let first_field = MAGIC_LEN + COUNT_LEN + T5UIC1.label_width;
        let first_offset = u32::from_le_bytes([
            bytes[first_field],
            bytes[first_field + 1],
            bytes[first_field + 2],
            bytes[first_field + 3],
        ]);
        let second_field = MAGIC_LEN + COUNT_LEN + record_width(&T5UIC1) + T5UIC1.label_width;
        bytes[second_field..second_field + 4].copy_from_slice(&first_offset.to_le_bytes());
        bytes[second_field + 4..second_field + 8].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            decode(&bytes, &T5UIC1),
            Err(ContainerError::Malformed(MalformedError::EntryOverlap { .. }))
        ));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let bytes = encode(
            &T5UIC1,
            &[("logo", b"a".as_slice()), ("logo", b"b".as_slice())],
        )
        .unwrap();
        assert!(matches!(
            decode(&bytes, &T5UIC1),
            Err(ContainerError::Malformed(MalformedError::DuplicateLabel { .. }))
        ));
    }

    #[test]
    fn test_label_too_long() {
        let label = "a".repeat(T5UIC1.label_width + 1);
        assert!(matches!(
            encode(&T5UIC1, &[(label.as_str(), b"x".as_slice())]),
            Err(ContainerError::Malformed(MalformedError::LabelTooLong { .. }))
        ));
    }

    #[test]
    fn test_cumulative_size_past_u32_rejected() {
        // 1025 records sharing one 4 MiB payload add up past u32::MAX
        let payload = vec![0u8; 4 << 20];
        let labels: Vec<String> = (0..1025).map(|i| format!("{:04}", i)).collect();
        let entries: Vec<(&str, &[u8])> = labels
            .iter()
            .map(|label| (label.as_str(), payload.as_slice()))
            .collect();
        match encode(&T5UIC1, &entries) {
            Err(ContainerError::Malformed(MalformedError::AddressSpaceExhausted {
                label,
                required,
            })) => {
                assert_eq!(label, "1024");
                assert!(required > u32::MAX as u64);
            }
            other => panic!("expected AddressSpaceExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            decode(b"DIC", &T5UIC1),
            Err(ContainerError::Malformed(MalformedError::Truncated { .. }))
        ));
    }

    #[test]
    fn test_table_order_need_not_match_byte_order() {
        // hand-build a pack whose byte order is reversed relative to table order
        let desc = &T5UIC1;
        let payload_a = b"aaaa";
        let payload_b = b"bbbbbb";
        let start = data_start(desc, 2);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(desc.magic);
        bytes.extend_from_slice(&2u16.to_le_bytes());
        // record 0 points past payload_b
        let mut label = vec![0u8; desc.label_width];
        label[..1].copy_from_slice(b"a");
        bytes.extend_from_slice(&label);
        bytes.extend_from_slice(&((start + payload_b.len()) as u32).to_le_bytes());
        bytes.extend_from_slice(&(payload_a.len() as u32).to_le_bytes());
        // record 1 points at the data start
        let mut label = vec![0u8; desc.label_width];
        label[..1].copy_from_slice(b"b");
        bytes.extend_from_slice(&label);
        bytes.extend_from_slice(&(start as u32).to_le_bytes());
        bytes.extend_from_slice(&(payload_b.len() as u32).to_le_bytes());
        bytes.extend_from_slice(payload_b);
        bytes.extend_from_slice(payload_a);

        let (_, records) = decode(&bytes, desc).unwrap();
        assert_eq!(records[0].label, "a");
        assert_eq!(records[0].offset as usize, start + payload_b.len());
        assert_eq!(records[1].label, "b");
    }
}
