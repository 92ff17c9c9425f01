//! Owner of a compressed block stream and its container.
//!
//! A [`BlockData`] instance is backed either by a memory-mapped PVR/KTX
//! file or by an anonymous in-memory buffer with the same layout. Encoding
//! writes block words straight into the backing storage; decoding and
//! dissection read them back.

use core::alloc::Layout;
use core::ptr;
use std::path::Path;

use lightweight_mmap::handles::{ReadOnlyFileHandle, ReadWriteFileHandle};
use lightweight_mmap::mmap::{ReadOnlyMmap, ReadWriteMmap};
use safe_allocator_api::RawAlloc;

use crate::bitmap::Bitmap;
use crate::block::byteswap_halves;
use crate::color::Color8888;
use crate::container;
use crate::decode::{decode_block, decode_block_color, Etc2Mode};
use crate::encode::{self, select_kernel, Channels};
use crate::error::BlockDataError;
use crate::mip;
use crate::size::Size;

/// Backing storage of a block stream.
///
/// The mapped variants erase the mapping's borrow of its file handle; the
/// handle is boxed so its address is stable, and the mapping field is
/// declared first so it drops (unmaps) before the handle closes.
enum Storage {
    ReadMapped {
        mapping: ReadOnlyMmap<'static>,
        _handle: Box<ReadOnlyFileHandle>,
    },
    WriteMapped {
        mapping: ReadWriteMmap<'static>,
        _handle: Box<ReadWriteFileHandle>,
    },
    Owned(RawAlloc),
}

impl core::fmt::Debug for Storage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Storage::ReadMapped { .. } => f.write_str("Storage::ReadMapped"),
            Storage::WriteMapped { .. } => f.write_str("Storage::WriteMapped"),
            Storage::Owned(_) => f.write_str("Storage::Owned"),
        }
    }
}

/// A compressed ETC block stream together with its dimensions and mipmap
/// chain, backed by a file mapping or an owned buffer.
#[derive(Debug)]
pub struct BlockData {
    data: *mut u8,
    len: usize,
    size: Size,
    levels: u32,
    data_offset: usize,
    writable: bool,
    _storage: Storage,
}

// SAFETY: the raw data pointer targets storage owned by this instance.
// Concurrent mutation happens only through `process`, whose safety contract
// restricts simultaneous callers to disjoint aligned block ranges.
unsafe impl Send for BlockData {}
unsafe impl Sync for BlockData {}

impl BlockData {
    /// Maps an existing PVR v3 or KTX file read-only.
    pub fn open(path: &Path) -> Result<Self, BlockDataError> {
        let handle = Box::new(ReadOnlyFileHandle::open(path.to_str().unwrap())?);
        let len = handle.size()? as usize;
        // SAFETY: the mapping borrows the boxed handle stored in the same
        // variant; see the `Storage` drop-order note.
        let mapping = unsafe {
            core::mem::transmute::<ReadOnlyMmap<'_>, ReadOnlyMmap<'static>>(ReadOnlyMmap::new(
                &handle, 0, len,
            )?)
        };

        let envelope = container::parse_envelope(mapping.as_slice())?;
        // SAFETY: `mapping` is a valid mapping of `len` bytes for the
        // lifetime of this `BlockData`, matching the struct's invariant.
        let data = unsafe { mapping.data() } as *mut u8;
        Ok(Self {
            data,
            len,
            size: envelope.size,
            levels: envelope.levels,
            data_offset: envelope.data_offset,
            writable: false,
            _storage: Storage::ReadMapped {
                mapping,
                _handle: handle,
            },
        })
    }

    /// Creates a PVR v3 file sized for `size` (plus a full mipmap chain if
    /// `mipmap` is set), maps it read-write and writes the header.
    ///
    /// The file is stretched to its final length before mapping; the block
    /// payload starts out zeroed.
    pub fn create(path: &Path, size: Size, mipmap: bool) -> Result<Self, BlockDataError> {
        if !size.is_block_aligned() {
            return Err(BlockDataError::InvalidSize(size));
        }

        let levels = if mipmap { mip::num_mip_levels(size) } else { 1 };
        let len = container::pvr_file_len(size, levels);

        let handle = Box::new(ReadWriteFileHandle::create_preallocated(
            path.to_str().unwrap(),
            len as i64,
        )?);
        // SAFETY: as in `open`.
        let mut mapping = unsafe {
            core::mem::transmute::<ReadWriteMmap<'_>, ReadWriteMmap<'static>>(ReadWriteMmap::new(
                &handle, 0, len,
            )?)
        };
        container::write_pvr_header(mapping.as_mut_slice(), size, levels);

        let data = mapping.data();
        Ok(Self {
            data,
            len,
            size,
            levels,
            data_offset: container::PVR_HEADER_LEN,
            writable: true,
            _storage: Storage::WriteMapped {
                mapping,
                _handle: handle,
            },
        })
    }

    /// Creates an anonymous in-memory block stream with the same layout as
    /// [`BlockData::create`], with no backing file.
    pub fn create_in_memory(size: Size, mipmap: bool) -> Result<Self, BlockDataError> {
        if !size.is_block_aligned() {
            return Err(BlockDataError::InvalidSize(size));
        }

        let levels = if mipmap { mip::num_mip_levels(size) } else { 1 };
        let len = container::pvr_file_len(size, levels);

        let layout = Layout::from_size_align(len, 64)?;
        let mut alloc = RawAlloc::new(layout)?;
        let data = alloc.as_mut_ptr();
        // SAFETY: `data` spans the `len` bytes just allocated.
        unsafe { ptr::write_bytes(data, 0, len) };
        container::write_pvr_header(
            // SAFETY: same allocation, exclusively owned here.
            unsafe { core::slice::from_raw_parts_mut(data, len) },
            size,
            levels,
        );

        Ok(Self {
            data,
            len,
            size,
            levels,
            data_offset: container::PVR_HEADER_LEN,
            writable: true,
            _storage: Storage::Owned(alloc),
        })
    }

    /// Base level dimensions.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Number of mip levels in the payload.
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Byte offset of the first block word within the container.
    pub fn data_offset(&self) -> usize {
        self.data_offset
    }

    /// Total container length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the container holds no block payload.
    pub fn is_empty(&self) -> bool {
        self.len <= self.data_offset
    }

    /// The block payload bytes (all mip levels).
    pub fn payload(&self) -> &[u8] {
        // SAFETY: in-bounds view of the owned storage.
        unsafe {
            core::slice::from_raw_parts(self.data.add(self.data_offset), self.len - self.data_offset)
        }
    }

    /// Encodes `blocks` consecutive tiles from `src` into the payload at
    /// block-word offset `offset`.
    ///
    /// `src` points at the first pixel of the range's first block within a
    /// row-major image whose row stride is `width` pixels. The kernel is
    /// chosen from `channels`, `dithered`, `etc2` and the CPU's AVX2
    /// capability; alpha-as-luma input is never dithered.
    ///
    /// Callers may invoke this concurrently on one instance to parallelise
    /// encoding, partitioning the stream into disjoint ranges that start at
    /// block-row boundaries.
    ///
    /// # Panics
    ///
    /// Panics if the instance is read-only, if `width` is not a non-zero
    /// multiple of 4, or if the destination or source range is out of
    /// bounds.
    ///
    /// # Safety
    ///
    /// - Concurrent calls must target disjoint `offset..offset + blocks`
    ///   ranges.
    /// - No other thread may read the payload (`decode`, `dissect`,
    ///   `payload`) until all `process` calls have completed.
    pub unsafe fn process(
        &self,
        src: &[u32],
        blocks: u32,
        offset: usize,
        width: usize,
        channels: Channels,
        dithered: bool,
        etc2: bool,
    ) {
        assert!(self.writable, "cannot encode into a read-only container");
        assert!(width != 0 && width % 4 == 0);

        let payload_words = (self.len - self.data_offset) / 8;
        assert!(offset + blocks as usize <= payload_words);

        let blocks_per_row = width / 4;
        let full_rows = blocks as usize / blocks_per_row;
        let tail = blocks as usize % blocks_per_row;
        let needed = full_rows * 4 * width + if tail > 0 { 3 * width + tail * 4 } else { 0 };
        assert!(src.len() >= needed);

        let kernel = select_kernel(channels, etc2, dithered);
        let dst = (self.data.add(self.data_offset) as *mut u64).add(offset);
        encode::process_blocks(src.as_ptr(), dst, blocks, width, channels, kernel);
    }

    /// Decodes the base mip level into a full-size bitmap.
    pub fn decode(&self) -> Bitmap {
        let mut bmp = Bitmap::new(self.size);
        let blocks_x = self.size.x / 4;
        let width = self.size.x as usize;

        // The payload starts 52 bytes in, so the words are read unaligned.
        let src = unsafe { self.data.add(self.data_offset) } as *const u64;

        for by in 0..self.size.y / 4 {
            for bx in 0..blocks_x {
                let index = (by * blocks_x + bx) as usize;
                let word = unsafe { src.add(index).read_unaligned() };
                let pixels = decode_block(word);

                let data = bmp.data_mut();
                for row in 0..4 {
                    let base = (by as usize * 4 + row) * width + bx as usize * 4;
                    data[base..base + 4].copy_from_slice(&pixels[row * 4..row * 4 + 4]);
                }
            }
        }
        bmp
    }

    /// Produces the three diagnostic maps visualising per-block mode,
    /// endpoints and table codewords.
    pub fn dissect(&self) -> Dissection {
        let blocks = Size::new(self.size.x / 4, self.size.y / 4);
        let mut block_type = Bitmap::new(blocks);
        let mut endpoints = Bitmap::new(self.size);
        let mut selectors = Bitmap::new(blocks);

        let src = unsafe { self.data.add(self.data_offset) } as *const u64;
        let width = self.size.x as usize;

        for by in 0..blocks.y {
            for bx in 0..blocks.x {
                let index = (by * blocks.x + bx) as usize;
                let d = byteswap_halves(unsafe { src.add(index).read_unaligned() });
                let (mode, mut c) = decode_block_color(d);

                block_type.data_mut()[index] = match mode {
                    Etc2Mode::None => match d & 0x3 {
                        0 => 0xFF00_0088, // individual, 2x4 sub-blocks
                        1 => 0xFF00_8800, // individual, 4x2 sub-blocks
                        2 => 0xFF00_00FF, // differential, 2x4 sub-blocks
                        _ => 0xFF00_FF00, // differential, 4x2 sub-blocks
                    },
                    Etc2Mode::Planar => 0xFFFF_0000,
                    // T and H have no decoder; flag them loudly.
                    Etc2Mode::T | Etc2Mode::H => 0xFFFF_00FF,
                };

                selectors.data_mut()[index] =
                    0xFF00_0000 | ((d as u32 & 0xE0) << 8) | ((d as u32 & 0x1C) << 3);

                if mode != Etc2Mode::None {
                    // Extension modes never fill the second endpoint.
                    c.r2 = c.r1;
                    c.g2 = c.g1;
                    c.b2 = c.b1;
                }
                let first = Color8888::new(c.r1 as u8, c.g1 as u8, c.b1 as u8, 0xFF).to_u32();
                let second = Color8888::new(c.r2 as u8, c.g2 as u8, c.b2 as u8, 0xFF).to_u32();

                let data = endpoints.data_mut();
                for row in 0..4usize {
                    for col in 0..4usize {
                        let use_second = if d & 0x1 != 0 { row >= 2 } else { col >= 2 };
                        let px = if use_second { second } else { first };
                        data[(by as usize * 4 + row) * width + bx as usize * 4 + col] = px;
                    }
                }
            }
        }

        Dissection {
            block_type,
            endpoints,
            selectors,
        }
    }
}

/// The three diagnostic bitmaps produced by [`BlockData::dissect`].
pub struct Dissection {
    /// One pixel per block, color-coding the block's mode and flip bit.
    pub block_type: Bitmap,
    /// Full-size map painting each sub-block with its base color.
    pub endpoints: Bitmap,
    /// One pixel per block, encoding the two table codewords in G and R.
    pub selectors: Bitmap,
}

impl Dissection {
    /// Writes the three maps under their fixed file names into `dir`.
    pub fn write_files(&self, dir: &Path) -> Result<(), BlockDataError> {
        self.block_type.write_png(&dir.join("out_block_type.png"))?;
        self.endpoints.write_png(&dir.join("out_block_color.png"))?;
        self.selectors.write_png(&dir.join("out_block_selectors.png"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_prelude::*;

    #[test]
    fn in_memory_roundtrip_preserves_dimensions() {
        let size = Size::new(8, 8);
        let data = BlockData::create_in_memory(size, false).unwrap();
        let src = vec![0xFF40_8020u32; size.pixels()];
        unsafe {
            data.process(&src, 4, 0, 8, Channels::Rgb, false, false);
        }
        let bmp = data.decode();
        assert_eq!(bmp.size(), size);
        assert!(bmp.data().iter().all(|px| px >> 24 == 0xFF));
    }

    #[test]
    fn solid_image_encodes_identical_blocks_and_decodes_exactly() {
        // Two 4x4 blocks of a color on the 4-bit grid reproduce exactly.
        let size = Size::new(8, 4);
        let data = BlockData::create_in_memory(size, false).unwrap();
        let src = vec![0xFF11_2233u32; size.pixels()];
        unsafe {
            data.process(&src, 2, 0, 8, Channels::Rgb, false, false);
        }

        let words: Vec<u64> = data
            .payload()
            .chunks_exact(8)
            .take(2)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(words[0], words[1]);

        let bmp = data.decode();
        for y in 0..4 {
            for x in 0..8 {
                let px = bmp.pixel(x, y);
                assert_eq!(px >> 24, 0xFF);
                for ch in 0..3 {
                    let want = (0xFF11_2233u32 >> (ch * 8) & 0xFF) as i32;
                    let got = (px >> (ch * 8) & 0xFF) as i32;
                    assert!((want - got).abs() <= 2);
                }
            }
        }
    }

    #[rstest]
    fn alpha_as_luma_decodes_gray(#[values(false, true)] etc2: bool) {
        let size = Size::new(4, 4);
        let data = BlockData::create_in_memory(size, false).unwrap();
        let src: Vec<u32> = (0..16).map(|i| (i as u32 * 16) << 24).collect();
        unsafe {
            data.process(&src, 1, 0, 4, Channels::AlphaAsLuma, false, etc2);
        }
        let bmp = data.decode();
        for &px in bmp.data() {
            let r = px & 0xFF;
            assert_eq!(r, px >> 8 & 0xFF);
            assert_eq!(r, px >> 16 & 0xFF);
        }
    }

    #[test]
    fn mipmapped_instance_has_chain_sized_payload() {
        let size = Size::new(16, 16);
        let data = BlockData::create_in_memory(size, true).unwrap();
        assert_eq!(data.levels(), 5);
        assert_eq!(data.len(), 52 + 128 + 32 + 8 + 8 + 8);
    }

    #[test]
    fn invalid_size_is_rejected() {
        let err = BlockData::create_in_memory(Size::new(6, 4), false).unwrap_err();
        assert!(matches!(err, BlockDataError::InvalidSize(_)));
    }

    #[test]
    fn dissect_classifies_solid_etc1_blocks() {
        let size = Size::new(8, 4);
        let data = BlockData::create_in_memory(size, false).unwrap();
        let src = vec![0xFF80_8080u32; size.pixels()];
        unsafe {
            data.process(&src, 2, 0, 8, Channels::Rgb, false, false);
        }

        let dissection = data.dissect();
        assert_eq!(dissection.block_type.size(), Size::new(2, 1));
        assert_eq!(dissection.endpoints.size(), size);
        // A solid block always codes differentially (delta zero).
        for &px in dissection.block_type.data() {
            assert!(px == 0xFF00_00FF || px == 0xFF00_FF00);
        }
    }
}
