//! Embedded preview extraction from TIFF-based RAW files.
//!
//! Camera RAW files (ARW, NEF, DNG and friends) are TIFF containers that
//! embed a camera-rendered JPEG preview alongside the sensor mosaic. This
//! module extracts that JPEG without touching the mosaic, which is the fast
//! path for getting something on screen.
//!
//! The preview is searched in the locations cameras actually use, in order:
//! SubIFD (usually the largest preview), IFD1 (the standard EXIF thumbnail),
//! IFD0 itself, and finally a raw scan for JPEG markers as a fallback.

use std::io::{Cursor, Read, Seek, SeekFrom};

use super::jpeg::decode_jpeg;
use super::DecodeError;
use crate::buffer::PixelBuffer;

// TIFF constants
const TIFF_MAGIC_LE: [u8; 4] = [0x49, 0x49, 0x2A, 0x00]; // II + 42
const TIFF_MAGIC_BE: [u8; 4] = [0x4D, 0x4D, 0x00, 0x2A]; // MM + 42

// TIFF tag IDs
const TAG_STRIP_OFFSETS: u16 = 0x0111;
const TAG_STRIP_BYTE_COUNTS: u16 = 0x0117;
const TAG_JPEG_OFFSET: u16 = 0x0201; // JpegInterchangeFormat
const TAG_JPEG_LENGTH: u16 = 0x0202; // JpegInterchangeFormatLength
const TAG_SUBIFD: u16 = 0x014A;
const TAG_COMPRESSION: u16 = 0x0103;

const COMPRESSION_JPEG: u16 = 6;
const COMPRESSION_JPEG_OLD: u16 = 7;

const JPEG_START: [u8; 2] = [0xFF, 0xD8];
const JPEG_END: [u8; 2] = [0xFF, 0xD9];

/// SubIFD previews smaller than this are likely tiny thumbnails, not the
/// camera-rendered preview; keep looking.
const MIN_SUBIFD_PREVIEW: usize = 10_000;

/// Check if a byte slice looks like the start of a TIFF-based RAW container.
pub fn is_raw_container(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && (bytes[..4] == TIFF_MAGIC_LE || bytes[..4] == TIFF_MAGIC_BE)
}

/// Extract the embedded JPEG preview from a RAW file without decoding it.
///
/// # Errors
///
/// - `DecodeError::UnsupportedFormat` - not a TIFF-based container
/// - `DecodeError::CorruptData` - container damaged, or no preview present
pub fn extract_raw_preview(bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut cursor = Cursor::new(bytes);

    let mut header = [0u8; 4];
    cursor
        .read_exact(&mut header)
        .map_err(|e| DecodeError::CorruptData(format!("failed to read header: {}", e)))?;

    let little_endian = if header == TIFF_MAGIC_LE {
        true
    } else if header == TIFF_MAGIC_BE {
        false
    } else {
        return Err(DecodeError::UnsupportedFormat);
    };

    let ifd0_offset = read_u32(&mut cursor, little_endian)?;
    cursor
        .seek(SeekFrom::Start(ifd0_offset as u64))
        .map_err(|e| DecodeError::CorruptData(format!("failed to seek to IFD0: {}", e)))?;

    let (entries, next_ifd) = parse_ifd(&mut cursor, little_endian, bytes.len())?;

    let subifd_offset = entries
        .iter()
        .find(|e| e.tag == TAG_SUBIFD && e.count > 0)
        .map(|e| e.value_offset);

    // SubIFD usually holds the full-size preview for mirrorless cameras
    if let Some(offset) = subifd_offset {
        if let Ok(jpeg) = extract_jpeg_from_ifd(&mut cursor, offset, little_endian, bytes) {
            if jpeg.len() > MIN_SUBIFD_PREVIEW {
                return Ok(jpeg);
            }
        }
    }

    // IFD1 is the standard EXIF thumbnail location
    if next_ifd != 0 {
        if let Ok(jpeg) = extract_jpeg_from_ifd(&mut cursor, next_ifd, little_endian, bytes) {
            return Ok(jpeg);
        }
    }

    // Some files put the preview tags straight into IFD0
    if let Ok(jpeg) = extract_jpeg_from_entries(&entries, bytes) {
        return Ok(jpeg);
    }

    // Last resort: scan for JPEG markers in the body of the file
    if let Some(jpeg) = scan_for_jpeg(bytes) {
        return Ok(jpeg);
    }

    Err(DecodeError::CorruptData(
        "no embedded preview found".to_string(),
    ))
}

/// Extract and decode the embedded preview from a RAW file in one step.
pub fn decode_raw_preview(bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
    let jpeg_bytes = extract_raw_preview(bytes)?;
    decode_jpeg(&jpeg_bytes)
}

struct IfdEntry {
    tag: u16,
    count: u32,
    value_offset: u32,
}

fn read_u16<R: Read>(reader: &mut R, little_endian: bool) -> Result<u16, DecodeError> {
    let mut buf = [0u8; 2];
    reader
        .read_exact(&mut buf)
        .map_err(|e| DecodeError::CorruptData(format!("failed to read u16: {}", e)))?;
    Ok(if little_endian {
        u16::from_le_bytes(buf)
    } else {
        u16::from_be_bytes(buf)
    })
}

fn read_u32<R: Read>(reader: &mut R, little_endian: bool) -> Result<u32, DecodeError> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|e| DecodeError::CorruptData(format!("failed to read u32: {}", e)))?;
    Ok(if little_endian {
        u32::from_le_bytes(buf)
    } else {
        u32::from_be_bytes(buf)
    })
}

fn parse_ifd<R: Read + Seek>(
    reader: &mut R,
    little_endian: bool,
    file_size: usize,
) -> Result<(Vec<IfdEntry>, u32), DecodeError> {
    let entry_count = read_u16(reader, little_endian)?;

    if entry_count > 1000 {
        return Err(DecodeError::CorruptData("too many IFD entries".to_string()));
    }

    let mut entries = Vec::with_capacity(entry_count as usize);

    for _ in 0..entry_count {
        let tag = read_u16(reader, little_endian)?;
        let _typ = read_u16(reader, little_endian)?;
        let count = read_u32(reader, little_endian)?;
        let value_offset = read_u32(reader, little_endian)?;

        // Skip entries whose offsets point past the end of the file
        if value_offset as usize > file_size {
            continue;
        }

        entries.push(IfdEntry {
            tag,
            count,
            value_offset,
        });
    }

    let next_ifd = read_u32(reader, little_endian).unwrap_or(0);

    Ok((entries, next_ifd))
}

fn extract_jpeg_from_ifd<R: Read + Seek>(
    reader: &mut R,
    ifd_offset: u32,
    little_endian: bool,
    file_bytes: &[u8],
) -> Result<Vec<u8>, DecodeError> {
    reader
        .seek(SeekFrom::Start(ifd_offset as u64))
        .map_err(|e| DecodeError::CorruptData(format!("failed to seek to IFD: {}", e)))?;

    let (entries, _) = parse_ifd(reader, little_endian, file_bytes.len())?;

    extract_jpeg_from_entries(&entries, file_bytes)
}

fn extract_jpeg_from_entries(
    entries: &[IfdEntry],
    file_bytes: &[u8],
) -> Result<Vec<u8>, DecodeError> {
    let mut jpeg_offset: Option<u32> = None;
    let mut jpeg_length: Option<u32> = None;
    let mut strip_offsets: Option<u32> = None;
    let mut strip_byte_counts: Option<u32> = None;
    let mut compression: Option<u16> = None;

    for entry in entries {
        match entry.tag {
            TAG_JPEG_OFFSET => jpeg_offset = Some(entry.value_offset),
            TAG_JPEG_LENGTH => jpeg_length = Some(entry.value_offset),
            TAG_STRIP_OFFSETS => strip_offsets = Some(entry.value_offset),
            TAG_STRIP_BYTE_COUNTS => strip_byte_counts = Some(entry.value_offset),
            TAG_COMPRESSION => compression = Some(entry.value_offset as u16),
            _ => {}
        }
    }

    // JPEG interchange format tags are the common case for previews
    if let (Some(offset), Some(length)) = (jpeg_offset, jpeg_length) {
        if let Some(data) = extract_jpeg_data(file_bytes, offset, length) {
            return Ok(data);
        }
    }

    // Strip-based JPEG storage, used by some camera makes
    if let (Some(offset), Some(length)) = (strip_offsets, strip_byte_counts) {
        let is_jpeg = compression
            .map(|c| c == COMPRESSION_JPEG || c == COMPRESSION_JPEG_OLD)
            .unwrap_or(false);

        if is_jpeg {
            if let Some(data) = extract_jpeg_data(file_bytes, offset, length) {
                return Ok(data);
            }
        }
    }

    Err(DecodeError::CorruptData(
        "no embedded preview in IFD".to_string(),
    ))
}

/// Extract a JPEG byte range if it is in bounds and carries the JPEG magic.
fn extract_jpeg_data(file_bytes: &[u8], offset: u32, length: u32) -> Option<Vec<u8>> {
    let offset = offset as usize;
    let length = length as usize;
    if length == 0 || offset.checked_add(length)? > file_bytes.len() {
        return None;
    }
    let data = &file_bytes[offset..offset + length];
    if data.len() >= 2 && data[0] == JPEG_START[0] && data[1] == JPEG_START[1] {
        Some(data.to_vec())
    } else {
        None
    }
}

/// Fallback: scan the file body for JPEG start/end markers.
fn scan_for_jpeg(bytes: &[u8]) -> Option<Vec<u8>> {
    // Skip the first few KB to avoid the main TIFF structure
    let start_offset = 8192.min(bytes.len());
    const MIN_PREVIEW_SIZE: usize = 50_000;

    for i in start_offset..bytes.len().saturating_sub(2) {
        if bytes[i] == JPEG_START[0] && bytes[i + 1] == JPEG_START[1] {
            for j in (i + 2)..bytes.len().saturating_sub(1) {
                if bytes[j] == JPEG_END[0] && bytes[j + 1] == JPEG_END[1] {
                    let jpeg_data = &bytes[i..j + 2];
                    // Preview JPEGs are substantial; tiny matches are noise
                    if jpeg_data.len() > MIN_PREVIEW_SIZE {
                        return Some(jpeg_data.to_vec());
                    }
                }
            }
        }
    }

    None
}
