//! Codec for DWIN LCD firmware asset containers.
//!
//! DWIN smart displays (the screens on Creality and similar 3D printers)
//! ship their icon art in two binary container families:
//!
//! * **indexed packs** (`.ICO`): a magic header, an explicit
//!   `{label, offset, length}` table, then the raw image payloads;
//! * **sector libraries** (`.icl`): images packed into fixed 256 KiB
//!   sectors behind a `DGUS_3` header sector.
//!
//! The crate parses both into labeled entries, validates replacement
//! payloads against the hardware's decoder limits (baseline JPEG only, no
//! metadata segments, exact dimensions), and rebuilds containers
//! deterministically. Opening then serializing a well-formed container is
//! byte-identical.
//!
//! ```no_run
//! use dwin_pack::{screen_class, Container};
//!
//! # fn main() -> dwin_pack::Result<()> {
//! let desc = screen_class("T5UIC1").unwrap();
//! let bytes = std::fs::read("9.ICO")?;
//! let pack = Container::open(bytes, desc)?;
//! for entry in pack.list() {
//!     println!("{} {}x{}", entry.label, entry.width, entry.height);
//! }
//! let icon = std::fs::read("logo.jpg")?;
//! let updated = pack.replace("000-ICON_LOGO", icon)?;
//! std::fs::write("9.ICO", updated.serialize())?;
//! # Ok(())
//! # }
//! ```

pub mod container;
pub mod entry;
pub mod error;
pub mod icon_pack;
pub mod kind;
pub mod payload;
pub mod sector;
pub mod table;

pub use container::{sniff_kind, Container};
pub use entry::{Entry, EntryInfo, EntryLabel};
pub use error::{ContainerError, EntryFailure, MalformedError, Result};
pub use kind::{screen_class, ContainerKind, KindDescriptor, T5L, T5UIC1};
pub use payload::{ImageKind, Violation};
