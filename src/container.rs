//! Container façade: one surface over both container families.
//!
//! A `Container` is an immutable snapshot of a parsed firmware asset
//! file. `replace` never mutates; it yields a freshly rebuilt and
//! re-parsed snapshot, so a failed replacement leaves the original handle
//! fully usable. `serialize` on an unmodified snapshot returns the exact
//! bytes it was opened from.

use std::collections::BTreeMap;

use tracing::info;

use crate::entry::{Entry, EntryInfo, EntryLabel};
use crate::error::{ContainerError, Result};
use crate::icon_pack;
use crate::kind::{ContainerKind, KindDescriptor};
use crate::sector::{self, SectorEntry};

enum Parsed {
    IndexedPack(Vec<Entry>),
    SectorLibrary(Vec<SectorEntry>),
}

/// An opened container: the bytes it came from plus their parsed form.
pub struct Container {
    desc: &'static KindDescriptor,
    bytes: Vec<u8>,
    parsed: Parsed,
}

impl Container {
    /// Parse `bytes` as a container of the given screen class. The whole
    /// input is validated up front; a handle is only ever well-formed.
    pub fn open(bytes: Vec<u8>, desc: &'static KindDescriptor) -> Result<Self> {
        let parsed = match desc.kind {
            ContainerKind::IndexedPack => Parsed::IndexedPack(icon_pack::parse(&bytes, desc)?),
            ContainerKind::SectorLibrary => {
                Parsed::SectorLibrary(sector::parse(&bytes, desc)?)
            }
        };
        Ok(Container { desc, bytes, parsed })
    }

    /// The screen class this container was opened as.
    pub fn descriptor(&self) -> &'static KindDescriptor {
        self.desc
    }

    /// Entry metadata in stored order, without payload bytes.
    pub fn list(&self) -> Vec<EntryInfo> {
        match &self.parsed {
            Parsed::IndexedPack(entries) => entries
                .iter()
                .map(|e| EntryInfo {
                    label: e.label.to_string(),
                    kind: e.kind,
                    width: e.width,
                    height: e.height,
                    length: e.bytes.len(),
                    start_sector: None,
                })
                .collect(),
            Parsed::SectorLibrary(entries) => entries
                .iter()
                .map(|e| EntryInfo {
                    label: e.id.to_string(),
                    kind: e.kind,
                    width: e.width,
                    height: e.height,
                    length: e.bytes.len(),
                    start_sector: Some(e.start_sector),
                })
                .collect(),
        }
    }

    /// Payload bytes of the named entry.
    pub fn extract(&self, label: &str) -> Result<&[u8]> {
        match &self.parsed {
            Parsed::IndexedPack(entries) => entries
                .iter()
                .find(|e| e.label.matches(label))
                .map(|e| e.bytes.as_slice()),
            Parsed::SectorLibrary(entries) => entries
                .iter()
                .find(|e| EntryLabel::Id(e.id).matches(label))
                .map(|e| e.bytes.as_slice()),
        }
        .ok_or_else(|| ContainerError::UnknownLabel(label.to_string()))
    }

    /// Rebuild with `label` swapped for `blob`, returning the new
    /// snapshot. Validation happens before any bytes are produced, so an
    /// error leaves `self` untouched and still valid.
    pub fn replace(&self, label: &str, blob: Vec<u8>) -> Result<Container> {
        self.replace_all(BTreeMap::from([(label.to_string(), blob)]))
    }

    /// Rebuild with several replacements applied atomically. All
    /// replacements are validated first; one bad payload fails the whole
    /// batch with the complete diagnostic list.
    pub fn replace_all(&self, replacements: BTreeMap<String, Vec<u8>>) -> Result<Container> {
        let rebuilt = match self.desc.kind {
            ContainerKind::IndexedPack => {
                icon_pack::rebuild(&self.bytes, self.desc, &replacements)?
            }
            ContainerKind::SectorLibrary => {
                let by_id = replacements
                    .into_iter()
                    .map(|(label, blob)| {
                        let id: u16 = label.parse().map_err(|_| {
                            ContainerError::UnknownLabel(label.clone())
                        })?;
                        Ok((id, blob))
                    })
                    .collect::<Result<BTreeMap<u16, Vec<u8>>>>()?;
                sector::rebuild(&self.bytes, self.desc, &by_id)?
            }
        };
        info!(class = self.desc.name, "rebuilt container");
        Container::open(rebuilt, self.desc)
    }

    /// The container's bytes. For a handle that has not been replaced
    /// into, this is byte-identical to the input `open` was given.
    pub fn serialize(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the snapshot, yielding its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("class", &self.desc.name)
            .field("len", &self.bytes.len())
            .field("entries", &self.list().len())
            .finish()
    }
}

/// Pick the container kind a byte buffer looks like, by magic.
pub fn sniff_kind(bytes: &[u8]) -> Option<&'static KindDescriptor> {
    crate::kind::REGISTRY
        .iter()
        .copied()
        .find(|desc| bytes.starts_with(desc.magic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::T5UIC1;
    use crate::payload::fixtures;

    fn sample_pack() -> Vec<u8> {
        let logo = fixtures::baseline_jpeg(130, 17);
        let ok_icon = fixtures::bmp(26, 26);
        icon_pack::build(
            &T5UIC1,
            &[
                ("000-ICON_LOGO", logo.as_slice()),
                ("001-ICON_OK", ok_icon.as_slice()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_open_serialize_is_identity() {
        let bytes = sample_pack();
        let container = Container::open(bytes.clone(), &T5UIC1).unwrap();
        assert_eq!(container.serialize(), bytes.as_slice());
    }

    #[test]
    fn test_list_and_extract() {
        let container = Container::open(sample_pack(), &T5UIC1).unwrap();
        let infos = container.list();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].label, "000-ICON_LOGO");
        assert_eq!((infos[0].width, infos[0].height), (130, 17));
        assert!(infos[0].start_sector.is_none());

        let blob = container.extract("001-ICON_OK").unwrap();
        assert_eq!(blob, fixtures::bmp(26, 26).as_slice());
        assert!(matches!(
            container.extract("nope"),
            Err(ContainerError::UnknownLabel(_))
        ));
    }

    #[test]
    fn test_replace_returns_new_snapshot() {
        let container = Container::open(sample_pack(), &T5UIC1).unwrap();
        let replacement = fixtures::baseline_jpeg(130, 17);
        let updated = container
            .replace("000-ICON_LOGO", replacement.clone())
            .unwrap();

        assert_eq!(updated.extract("000-ICON_LOGO").unwrap(), replacement);
        // the original handle still serves its own bytes
        assert_eq!(
            container.extract("001-ICON_OK").unwrap(),
            updated.extract("001-ICON_OK").unwrap()
        );
    }

    #[test]
    fn test_failed_replace_leaves_handle_usable() {
        let container = Container::open(sample_pack(), &T5UIC1).unwrap();
        let err = container
            .replace("000-ICON_LOGO", fixtures::progressive_jpeg(130, 17))
            .unwrap_err();
        assert!(matches!(err, ContainerError::ValidationFailed(_)));
        assert_eq!(container.list().len(), 2);
    }

    #[test]
    fn test_sniff_kind() {
        assert_eq!(sniff_kind(b"DICOxxxx").map(|d| d.name), Some("T5UIC1"));
        assert_eq!(sniff_kind(b"DGUS_3\0\0").map(|d| d.name), Some("T5L"));
        assert_eq!(sniff_kind(b"PNG").map(|d| d.name), None);
    }
}
