//! PVR v3 and KTX container envelopes.
//!
//! Both formats wrap the block payload in a fixed-layout little-endian
//! header. PVR v3 files are read and written; KTX files are read only.

use crate::error::BlockDataError;
use crate::mip;
use crate::size::Size;

/// PVR v3 magic word ("PVR\x03" on disk).
pub const PVR_MAGIC: u32 = 0x0352_5650;

/// KTX 11-byte identifier's first word.
pub const KTX_MAGIC: u32 = 0x5854_4BAB;

/// Fixed PVR v3 header length, excluding metadata.
pub const PVR_HEADER_LEN: usize = 52;

/// Fixed KTX header length, excluding key/value data.
pub const KTX_HEADER_LEN: usize = 68;

/// A recognised container: image dimensions, mip level count, and where
/// the block payload starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Base level dimensions.
    pub size: Size,
    /// Number of mip levels in the payload.
    pub levels: u32,
    /// Byte offset of the first block word.
    pub data_offset: usize,
}

#[inline]
fn word(data: &[u8], index: usize) -> Result<u32, BlockDataError> {
    let offset = index * 4;
    let bytes = data
        .get(offset..offset + 4)
        .ok_or(BlockDataError::Truncated)?;
    Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
}

/// Recognises the envelope at the start of `data` by its magic word.
pub fn parse_envelope(data: &[u8]) -> Result<Envelope, BlockDataError> {
    match word(data, 0)? {
        PVR_MAGIC => {
            let envelope = Envelope {
                size: Size::new(word(data, 7)?, word(data, 6)?),
                levels: word(data, 11)?,
                data_offset: PVR_HEADER_LEN + word(data, 12)? as usize,
            };
            if data.len() < envelope.data_offset {
                return Err(BlockDataError::Truncated);
            }
            Ok(envelope)
        }
        KTX_MAGIC => {
            let envelope = Envelope {
                size: Size::new(word(data, 9)?, word(data, 10)?),
                levels: word(data, 14)?.max(1),
                data_offset: KTX_HEADER_LEN + word(data, 15)? as usize,
            };
            if data.len() < envelope.data_offset {
                return Err(BlockDataError::Truncated);
            }
            Ok(envelope)
        }
        magic => Err(BlockDataError::UnsupportedEnvelope { magic }),
    }
}

/// Writes the 13-word PVR v3 header for an ETC payload.
///
/// Pixel format stays at 6 (the ETC1 slot) even when ETC2 extension blocks
/// are present; strict ETC2 readers expect 22 there.
pub fn write_pvr_header(dst: &mut [u8], size: Size, levels: u32) {
    let fields: [u32; 13] = [
        PVR_MAGIC, // version
        0,         // flags
        6,         // pixel format word 0
        0,         // pixel format word 1
        0,         // colour space
        0,         // channel type
        size.y,    // height
        size.x,    // width
        1,         // depth
        1,         // num surfaces
        1,         // num faces
        levels,    // mipmap count
        0,         // metadata size
    ];
    for (i, field) in fields.iter().enumerate() {
        dst[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
    }
}

/// Total PVR v3 file length for an image with the given mip level count.
pub fn pvr_file_len(size: Size, levels: u32) -> usize {
    PVR_HEADER_LEN + mip::chain_payload_len(size, levels)
}
