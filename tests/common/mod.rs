//! Shared synthetic image payloads for integration tests.

#![allow(dead_code)]

/// Minimal JPEG: SOI, SOF with the given marker, SOS, stub scan data, EOI.
pub fn jpeg_with_sof(sof_marker: u8, width: u16, height: u16) -> Vec<u8> {
    let mut blob = vec![0xFF, 0xD8];
    blob.extend_from_slice(&[0xFF, sof_marker, 0x00, 0x0B, 0x08]);
    blob.extend_from_slice(&height.to_be_bytes());
    blob.extend_from_slice(&width.to_be_bytes());
    blob.extend_from_slice(&[0x01, 0x01, 0x11, 0x00]);
    blob.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    blob.extend_from_slice(&[0x12, 0x34, 0x56]);
    blob.extend_from_slice(&[0xFF, 0xD9]);
    blob
}

pub fn baseline_jpeg(width: u16, height: u16) -> Vec<u8> {
    jpeg_with_sof(0xC0, width, height)
}

pub fn progressive_jpeg(width: u16, height: u16) -> Vec<u8> {
    jpeg_with_sof(0xC2, width, height)
}

/// Minimal 24-bit BMP header with no pixel data beyond the headers.
pub fn bmp(width: i32, height: i32) -> Vec<u8> {
    let mut blob = Vec::with_capacity(64);
    blob.extend_from_slice(b"BM");
    blob.extend_from_slice(&64u32.to_le_bytes());
    blob.extend_from_slice(&0u32.to_le_bytes());
    blob.extend_from_slice(&54u32.to_le_bytes());
    blob.extend_from_slice(&40u32.to_le_bytes());
    blob.extend_from_slice(&width.to_le_bytes());
    blob.extend_from_slice(&height.to_le_bytes());
    blob.extend_from_slice(&1u16.to_le_bytes());
    blob.extend_from_slice(&24u16.to_le_bytes());
    blob.resize(64, 0);
    blob
}
