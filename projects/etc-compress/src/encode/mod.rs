//! Image-to-blocks encoding pipeline: kernel selection and tile gathering.

pub mod etc1;
pub mod etc2;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod avx2;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
use crate::cpu_detect::has_avx2;
use crate::dither::dither;

pub use etc1::process_rgb;
pub use etc2::process_rgb_etc2;

/// Which source channels feed the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    /// Encode the RGB channels as-is.
    Rgb,
    /// Replicate the alpha channel into RGB and encode that.
    AlphaAsLuma,
}

/// A block kernel: consumes a gathered 4x4 tile (mutating it when a dither
/// pre-pass is composed in) and returns the persisted 64-bit block word.
pub type KernelFn = fn(&mut [u32; 16]) -> u64;

fn k_rgb(tile: &mut [u32; 16]) -> u64 {
    process_rgb(tile)
}

fn k_rgb_dither(tile: &mut [u32; 16]) -> u64 {
    dither(tile);
    process_rgb(tile)
}

fn k_rgb_etc2(tile: &mut [u32; 16]) -> u64 {
    process_rgb_etc2(tile)
}

fn k_rgb_etc2_dither(tile: &mut [u32; 16]) -> u64 {
    dither(tile);
    process_rgb_etc2(tile)
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod accelerated {
    use super::*;

    // The selector hands these out only after a positive AVX2 probe.

    pub(super) fn k_rgb_avx2(tile: &mut [u32; 16]) -> u64 {
        unsafe { avx2::process_rgb_avx2(tile) }
    }

    pub(super) fn k_rgb_dither_avx2(tile: &mut [u32; 16]) -> u64 {
        dither(tile);
        unsafe { avx2::process_rgb_avx2(tile) }
    }

    pub(super) fn k_rgb_etc2_avx2(tile: &mut [u32; 16]) -> u64 {
        unsafe { avx2::process_rgb_etc2_avx2(tile) }
    }

    pub(super) fn k_rgb_etc2_dither_avx2(tile: &mut [u32; 16]) -> u64 {
        dither(tile);
        unsafe { avx2::process_rgb_etc2_avx2(tile) }
    }
}

/// Picks the block kernel for one `process` invocation.
///
/// Alpha-as-luma input is never dithered; the AVX2 variants substitute for
/// their scalar counterparts when the CPU supports them.
pub fn select_kernel(channels: Channels, etc2: bool, dithered: bool) -> KernelFn {
    let dithered = dithered && channels == Channels::Rgb;

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    if has_avx2() {
        return match (etc2, dithered) {
            (false, false) => accelerated::k_rgb_avx2,
            (false, true) => accelerated::k_rgb_dither_avx2,
            (true, false) => accelerated::k_rgb_etc2_avx2,
            (true, true) => accelerated::k_rgb_etc2_dither_avx2,
        };
    }

    match (etc2, dithered) {
        (false, false) => k_rgb,
        (false, true) => k_rgb_dither,
        (true, false) => k_rgb_etc2,
        (true, true) => k_rgb_etc2_dither,
    }
}

/// Encodes `blocks` consecutive 4x4 tiles, walking left to right across
/// block rows of a `width`-pixel-wide source.
///
/// Pixels are gathered column-major into the tile buffer, transformed per
/// `channels`, and each kernel result is stored as one unaligned 64-bit
/// write. `src` must point at the first pixel of the range's first block,
/// and the range must start at a block-row boundary so the row-skip
/// arithmetic lines up with the image.
///
/// # Safety
///
/// - `src` must be valid for reads covering every pixel the walk touches:
///   all rows of the block rows spanned by the range.
/// - `dst` must be valid for writes of `blocks * 8` bytes.
/// - `width` must be a non-zero multiple of 4.
pub(crate) unsafe fn process_blocks(
    mut src: *const u32,
    mut dst: *mut u64,
    blocks: u32,
    width: usize,
    channels: Channels,
    kernel: KernelFn,
) {
    debug_assert!(width != 0 && width % 4 == 0);

    let lift: fn(u32) -> u32 = match channels {
        Channels::Rgb => |px| px,
        Channels::AlphaAsLuma => |px| {
            let a = px >> 24;
            a | a << 8 | a << 16
        },
    };

    let mut buf = [0u32; 16];
    let mut w = 0;
    for _ in 0..blocks {
        for c in 0..4 {
            for r in 0..4 {
                buf[c * 4 + r] = lift(*src.add(r * width + c));
            }
        }

        src = src.add(4);
        w += 1;
        if w == width / 4 {
            // Skip the three rows already consumed with this block row.
            src = src.add(width * 3);
            w = 0;
        }

        dst.write_unaligned(kernel(&mut buf));
        dst = dst.add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_prelude::*;

    #[test]
    fn alpha_as_luma_never_dithers() {
        let reference = select_kernel(Channels::AlphaAsLuma, false, false);
        let requested = select_kernel(Channels::AlphaAsLuma, false, true);
        assert_eq!(reference as usize, requested as usize);
    }

    #[test]
    fn gather_is_column_major() {
        // 8x4 image whose pixels encode their own (x, y) position.
        let width = 8usize;
        let src: Vec<u32> = (0..width * 4)
            .map(|i| (i % width) as u32 | ((i / width) as u32) << 8)
            .collect();

        let mut captured = [0u32; 16];
        let mut out = [0u64; 2];
        unsafe {
            process_blocks(
                src.as_ptr(),
                out.as_mut_ptr(),
                2,
                width,
                Channels::Rgb,
                |tile| tile.iter().sum::<u32>() as u64,
            );
        }
        for c in 0..4 {
            for r in 0..4 {
                captured[c * 4 + r] = src[r * width + c];
            }
        }
        assert_eq!(out[0], captured.iter().sum::<u32>() as u64);

        // Second block starts four pixels to the right.
        let second: u32 = (0..16).map(|i| src[(i % 4) * width + 4 + i / 4]).sum();
        assert_eq!(out[1], second as u64);
    }

    #[test]
    fn alpha_replication_produces_gray_tiles() {
        let width = 4usize;
        let src = vec![0x8000_0000u32; 16];
        let mut out = [0u64; 1];
        unsafe {
            process_blocks(
                src.as_ptr(),
                out.as_mut_ptr(),
                1,
                width,
                Channels::AlphaAsLuma,
                |tile| {
                    assert!(tile.iter().all(|&px| px == 0x0080_8080));
                    0
                },
            );
        }
    }

    #[test]
    fn row_advance_skips_consumed_rows() {
        // Two block rows of a 4-wide image: the second block must gather
        // from rows 4..8.
        let width = 4usize;
        let src: Vec<u32> = (0..width * 8).map(|i| (i / (width * 4)) as u32).collect();
        let mut out = [0u64; 2];
        unsafe {
            process_blocks(
                src.as_ptr(),
                out.as_mut_ptr(),
                2,
                width,
                Channels::Rgb,
                |tile| tile[0] as u64,
            );
        }
        assert_eq!(out, [0, 1]);
    }
}
