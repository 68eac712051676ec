//! Container kind descriptors and the screen-class registry.
//!
//! A [`KindDescriptor`] holds the per-family constants that cannot be
//! inferred from a container's own bytes: magic, field widths, sector size,
//! the per-entry byte ceiling, and the valid entry-id range. Known screen
//! classes live in a fixed read-only registry; callers with an undocumented
//! display can construct their own descriptor.

use serde::Serialize;

/// The two container families used by DWIN display firmware.
///
/// They share only the list/replace/serialize contract, not layout, so the
/// codec treats them as a tagged variant rather than a class hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContainerKind {
    /// Header + explicit `{label, offset, length}` table + entry bytes.
    IndexedPack,
    /// `DGUS_3` header sector + fixed-size, boundary-aligned sectors.
    SectorLibrary,
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerKind::IndexedPack => write!(f, "indexed pack"),
            ContainerKind::SectorLibrary => write!(f, "sector library"),
        }
    }
}

/// Static metadata describing one container family for one screen class.
///
/// Constructed once (the registry entries are `const`) and read-only
/// thereafter. Sector fields are meaningful for [`ContainerKind::SectorLibrary`]
/// only; label width is meaningful for [`ContainerKind::IndexedPack`] only.
#[derive(Debug, Clone, Serialize)]
pub struct KindDescriptor {
    /// Screen class this descriptor belongs to, e.g. `"T5UIC1"`.
    pub name: &'static str,
    pub kind: ContainerKind,
    /// Fixed magic bytes at the start of the container.
    pub magic: &'static [u8],
    /// Width of the NUL-padded label field in each table record.
    pub label_width: usize,
    /// Allocation unit for sector libraries, in bytes.
    pub sector_size: usize,
    /// Documented per-entry byte ceiling. `None` means the ceiling is
    /// bounded only by the offset table's u32 address space.
    pub entry_ceiling: Option<usize>,
    /// Default declared sector capacity for newly built libraries
    /// (including the header sector).
    pub sector_capacity: u16,
    /// First valid entry id (sector library).
    pub id_min: u16,
    /// Last valid entry id, inclusive (sector library).
    pub id_max: u16,
}

impl KindDescriptor {
    /// Number of id slots in a sector library's header index.
    pub fn slot_count(&self) -> usize {
        (self.id_max - self.id_min + 1) as usize
    }

    /// Whether `id` falls in this family's documented entry-id range.
    pub fn id_in_range(&self, id: u16) -> bool {
        id >= self.id_min && id <= self.id_max
    }
}

/// T5UIC1-class icon packs (`9.ICO` on Ender-3 V2 era displays).
///
/// Entries are labeled JPEG icons; the per-entry ceiling is derived from
/// the offset table's address space at rebuild time.
pub const T5UIC1: KindDescriptor = KindDescriptor {
    name: "T5UIC1",
    kind: ContainerKind::IndexedPack,
    magic: b"DICO",
    label_width: 16,
    sector_size: 0,
    entry_ceiling: None,
    sector_capacity: 0,
    id_min: 0,
    id_max: 0,
};

/// Sector size for T5L image libraries: 256 KiB.
pub const T5L_SECTOR_SIZE: usize = 262_144;

/// Documented per-entry ceiling for T5L libraries: 252 KiB.
pub const T5L_ENTRY_CEILING: usize = 258_048;

/// T5L-class sector-packed image libraries (`.icl` on CR6 era displays).
pub const T5L: KindDescriptor = KindDescriptor {
    name: "T5L",
    kind: ContainerKind::SectorLibrary,
    magic: b"DGUS_3",
    label_width: 0,
    sector_size: T5L_SECTOR_SIZE,
    entry_ceiling: Some(T5L_ENTRY_CEILING),
    sector_capacity: 64,
    id_min: 16,
    id_max: 63,
};

/// The fixed registry of known screen classes.
pub const REGISTRY: &[&KindDescriptor] = &[&T5UIC1, &T5L];

/// Look up a screen class by name (case-insensitive).
pub fn screen_class(name: &str) -> Option<&'static KindDescriptor> {
    REGISTRY
        .iter()
        .find(|desc| desc.name.eq_ignore_ascii_case(name))
        .copied()
}
