//! Payload validation for candidate image blobs.
//!
//! The validator never decodes pixels; it scans header structures only
//! (JPEG marker segments, the BMP info header) and checks them against what
//! the target firmware's decoder can actually render. Payload bytes are
//! otherwise opaque.

use serde::Serialize;
use thiserror::Error;

// JPEG marker bytes
const M_SOF0: u8 = 0xC0;
const M_SOF2: u8 = 0xC2;
const M_DHT: u8 = 0xC4;
const M_JPG: u8 = 0xC8;
const M_DAC: u8 = 0xCC;
const M_RST0: u8 = 0xD0;
const M_RST7: u8 = 0xD7;
const M_SOI: u8 = 0xD8;
const M_EOI: u8 = 0xD9;
const M_SOS: u8 = 0xDA;
const M_APP1: u8 = 0xE1;
const M_APP2: u8 = 0xE2;
const M_APP13: u8 = 0xED;

// Progressive-DCT frame markers (Huffman and arithmetic, plus their
// differential forms). The firmware decoder renders none of them.
const PROGRESSIVE_SOFS: [u8; 4] = [M_SOF2, 0xC6, 0xCA, 0xCE];

/// Signature of a JPEG stream: SOI marker.
pub const JPEG_SIGNATURE: [u8; 2] = [0xFF, M_SOI];

/// Signature of a BMP file: `BM`.
pub const BMP_SIGNATURE: [u8; 2] = [0x42, 0x4D];

/// Format class of an entry's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageKind {
    Jpeg,
    Bmp,
    /// Anything that is neither JPEG nor BMP. Raw payloads carry no
    /// sniffable dimensions and are checked against the size ceiling only.
    RawIcon,
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageKind::Jpeg => write!(f, "JPEG"),
            ImageKind::Bmp => write!(f, "BMP"),
            ImageKind::RawIcon => write!(f, "raw icon"),
        }
    }
}

/// One violated payload constraint.
///
/// The firmware decoder misrenders rather than rejects bad payloads
/// (partial draws, static, noise), so each variant spells out what the
/// operator must fix at the source.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Violation {
    #[error("signature does not match expected {expected} payload")]
    WrongSignature { expected: ImageKind },

    #[error("JPEG stream is progressive DCT; the firmware decoder renders baseline only")]
    ProgressiveJpeg,

    #[error("unsupported JPEG frame type (SOF marker 0x{marker:02X}); only baseline DCT is renderable")]
    UnsupportedJpegFrame { marker: u8 },

    #[error("{segment} metadata segment present; the firmware decoder does not skip it safely")]
    MetadataSegment { segment: &'static str },

    #[error("dimensions {found_width}x{found_height} do not match expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("payload is {length} bytes, over the {ceiling}-byte ceiling")]
    OversizedPayload { length: usize, ceiling: usize },

    #[error("payload ends before its header structures are complete")]
    TruncatedPayload,
}

/// Result of validating one payload: `ok` or the list of violated
/// constraints. Created per call, surfaced to the caller, never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }
}

/// Whether to stop at the first violated constraint or collect them all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Stop at the first failure.
    ShortCircuit,
    /// Run every check and report the complete list, for actionable
    /// diagnostics.
    CollectAll,
}

/// What a replacement payload must look like, derived from the entry it
/// replaces plus the container's per-entry ceiling.
#[derive(Debug, Clone)]
pub struct Expectation {
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
    pub ceiling: usize,
}

/// Validate `blob` against `expectation`. Pure function over bytes.
///
/// Checks run in a fixed order: signature, encoding (baseline vs
/// progressive), metadata segments, dimensions, byte-size ceiling.
pub fn validate(blob: &[u8], expectation: &Expectation, mode: Mode) -> ValidationReport {
    let mut report = ValidationReport::default();

    if blob.is_empty() {
        report.push(Violation::TruncatedPayload);
        return report;
    }

    match expectation.kind {
        ImageKind::Jpeg => validate_jpeg(blob, expectation, mode, &mut report),
        ImageKind::Bmp => validate_bmp(blob, expectation, mode, &mut report),
        ImageKind::RawIcon => {}
    }

    if !report.is_ok() && mode == Mode::ShortCircuit {
        return report;
    }

    if blob.len() > expectation.ceiling {
        report.push(Violation::OversizedPayload {
            length: blob.len(),
            ceiling: expectation.ceiling,
        });
    }

    report
}

fn validate_jpeg(blob: &[u8], expectation: &Expectation, mode: Mode, report: &mut ValidationReport) {
    if !blob.starts_with(&JPEG_SIGNATURE) {
        report.push(Violation::WrongSignature {
            expected: ImageKind::Jpeg,
        });
        // nothing further to scan without a JPEG stream
        return;
    }

    let scan = match scan_jpeg(blob) {
        Some(scan) => scan,
        None => {
            report.push(Violation::TruncatedPayload);
            return;
        }
    };

    match scan.frame_marker {
        Some(marker) if PROGRESSIVE_SOFS.contains(&marker) => {
            report.push(Violation::ProgressiveJpeg);
        }
        Some(M_SOF0) => {}
        Some(marker) => {
            report.push(Violation::UnsupportedJpegFrame { marker });
        }
        None => {
            report.push(Violation::TruncatedPayload);
            return;
        }
    }
    if !report.is_ok() && mode == Mode::ShortCircuit {
        return;
    }

    for segment in &scan.metadata {
        report.push(Violation::MetadataSegment { segment });
        if mode == Mode::ShortCircuit {
            return;
        }
    }

    check_dimensions(scan.width, scan.height, expectation, report);
}

fn validate_bmp(blob: &[u8], expectation: &Expectation, mode: Mode, report: &mut ValidationReport) {
    if !blob.starts_with(&BMP_SIGNATURE) {
        report.push(Violation::WrongSignature {
            expected: ImageKind::Bmp,
        });
        return;
    }

    let (width, height) = match bmp_dimensions(blob) {
        Some(dims) => dims,
        None => {
            report.push(Violation::TruncatedPayload);
            return;
        }
    };
    if !report.is_ok() && mode == Mode::ShortCircuit {
        return;
    }

    check_dimensions(width, height, expectation, report);
}

fn check_dimensions(width: u32, height: u32, expectation: &Expectation, report: &mut ValidationReport) {
    // exact match in the same orientation; a transposed blob never passes
    if width != expectation.width || height != expectation.height {
        report.push(Violation::DimensionMismatch {
            expected_width: expectation.width,
            expected_height: expectation.height,
            found_width: width,
            found_height: height,
        });
    }
}

/// Classify a stored payload and read its declared dimensions.
///
/// Used at parse time to record each entry's format class, which later
/// becomes the [`Expectation`] for a replacement of that entry. Unreadable
/// streams classify as [`ImageKind::RawIcon`].
pub fn sniff(blob: &[u8]) -> (ImageKind, u32, u32) {
    if blob.starts_with(&JPEG_SIGNATURE) {
        if let Some(scan) = scan_jpeg(blob) {
            if scan.frame_marker.is_some() {
                return (ImageKind::Jpeg, scan.width, scan.height);
            }
        }
        return (ImageKind::RawIcon, 0, 0);
    }
    if blob.starts_with(&BMP_SIGNATURE) {
        if let Some((width, height)) = bmp_dimensions(blob) {
            return (ImageKind::Bmp, width, height);
        }
        return (ImageKind::RawIcon, 0, 0);
    }
    (ImageKind::RawIcon, 0, 0)
}

/// What one pass over a JPEG's marker segments found.
struct JpegScan {
    frame_marker: Option<u8>,
    width: u32,
    height: u32,
    metadata: Vec<&'static str>,
}

/// Walk the marker segments from SOI to SOS. Returns `None` when the
/// stream is truncated or a segment length runs past the buffer.
fn scan_jpeg(blob: &[u8]) -> Option<JpegScan> {
    let len = blob.len();
    let mut scan = JpegScan {
        frame_marker: None,
        width: 0,
        height: 0,
        metadata: Vec::new(),
    };
    let mut pos = 2usize; // past SOI

    loop {
        // markers are 0xFF followed by a non-fill byte
        if pos >= len || blob[pos] != 0xFF {
            return None;
        }
        while pos < len && blob[pos] == 0xFF {
            pos += 1;
        }
        if pos >= len {
            return None;
        }
        let marker = blob[pos];
        pos += 1;

        match marker {
            0x00 | M_RST0..=M_RST7 | M_SOI => continue,
            M_EOI => return None, // EOI before any scan data
            M_SOS => return Some(scan),
            _ => {}
        }

        if pos + 2 > len {
            return None;
        }
        let seg = u16::from_be_bytes([blob[pos], blob[pos + 1]]) as usize;
        if seg < 2 || pos + seg > len {
            return None;
        }
        let body = &blob[pos + 2..pos + seg];

        match marker {
            // frame markers: C0..CF minus DHT (C4), JPG (C8), DAC (CC)
            0xC0..=0xCF if marker != M_DHT && marker != M_JPG && marker != M_DAC => {
                if body.len() < 5 {
                    return None;
                }
                scan.frame_marker = Some(marker);
                scan.height = u16::from_be_bytes([body[1], body[2]]) as u32;
                scan.width = u16::from_be_bytes([body[3], body[4]]) as u32;
            }
            M_APP1 => {
                if body.starts_with(b"Exif\0") {
                    scan.metadata.push("EXIF");
                } else if body.starts_with(b"http://ns.adobe.com/xap/") {
                    scan.metadata.push("XMP");
                }
            }
            M_APP2 => {
                if body.starts_with(b"ICC_PROFILE\0") {
                    scan.metadata.push("ICC profile");
                }
            }
            M_APP13 => {
                if body.starts_with(b"Photoshop 3.0\0") {
                    scan.metadata.push("IPTC");
                }
            }
            _ => {}
        }

        pos += seg;
    }
}

/// Read declared dimensions from a BMP info header. Negative heights
/// (top-down rows) compare by magnitude.
fn bmp_dimensions(blob: &[u8]) -> Option<(u32, u32)> {
    if blob.len() < 26 {
        return None;
    }
    let width = i32::from_le_bytes([blob[18], blob[19], blob[20], blob[21]]);
    let height = i32::from_le_bytes([blob[22], blob[23], blob[24], blob[25]]);
    Some((width.unsigned_abs(), height.unsigned_abs()))
}
