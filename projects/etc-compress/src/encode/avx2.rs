//! AVX2-accelerated block kernels.
//!
//! The sub-block channel sums feeding the endpoint search are computed with
//! 256-bit integer intrinsics; endpoint coding and the selector search share
//! the scalar path, so these kernels produce bit-identical output to their
//! scalar counterparts.

#![allow(missing_docs)]

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use crate::encode::etc1::encode_with_sums;
use crate::encode::etc2::encode_planar;

/// AVX2 variant of [`crate::encode::etc1::process_rgb`].
///
/// # Safety
///
/// The caller must ensure the CPU supports AVX2.
#[target_feature(enable = "avx2")]
pub unsafe fn process_rgb_avx2(tile: &[u32; 16]) -> u64 {
    encode_with_sums(tile, &subblock_sums_avx2(tile)).0
}

/// AVX2 variant of [`crate::encode::etc2::process_rgb_etc2`].
///
/// # Safety
///
/// The caller must ensure the CPU supports AVX2.
#[target_feature(enable = "avx2")]
pub unsafe fn process_rgb_etc2_avx2(tile: &[u32; 16]) -> u64 {
    let (etc1, etc1_err) = encode_with_sums(tile, &subblock_sums_avx2(tile));
    let (planar, planar_err) = encode_planar(tile);
    if planar_err < etc1_err {
        planar
    } else {
        etc1
    }
}

/// Channel sums of the four sub-blocks, matching the scalar
/// [`crate::encode::etc1::subblock_sums`] ordering.
///
/// # Safety
///
/// The caller must ensure the CPU supports AVX2.
#[target_feature(enable = "avx2")]
unsafe fn subblock_sums_avx2(tile: &[u32; 16]) -> [[i32; 3]; 4] {
    // Pixels 0..8 are the first 2x4 half in the column-major tile,
    // pixels 8..16 the second.
    let first = _mm256_loadu_si256(tile.as_ptr() as *const __m256i);
    let second = _mm256_loadu_si256(tile.as_ptr().add(8) as *const __m256i);

    // Rows 0 and 1 occupy the first two lanes of each four-lane column
    // group, so one mask splits both registers into the 4x2 halves.
    let top_mask = _mm256_set_epi32(0, 0, -1, -1, 0, 0, -1, -1);
    let top = [
        _mm256_and_si256(first, top_mask),
        _mm256_and_si256(second, top_mask),
    ];

    let sum_first = channel_sums(first);
    let sum_second = channel_sums(second);
    let sum_top = add3(channel_sums(top[0]), channel_sums(top[1]));
    let total = add3(sum_first, sum_second);
    let sum_bottom = [
        total[0] - sum_top[0],
        total[1] - sum_top[1],
        total[2] - sum_top[2],
    ];

    [sum_first, sum_second, sum_top, sum_bottom]
}

#[inline]
fn add3(a: [i32; 3], b: [i32; 3]) -> [i32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// Per-channel byte sums of eight packed pixels.
///
/// # Safety
///
/// The caller must ensure the CPU supports AVX2.
#[target_feature(enable = "avx2")]
unsafe fn channel_sums(v: __m256i) -> [i32; 3] {
    let zero = _mm256_setzero_si256();
    let r = _mm256_and_si256(v, _mm256_set1_epi32(0x0000_00FF));
    let g = _mm256_srli_epi32::<8>(_mm256_and_si256(v, _mm256_set1_epi32(0x0000_FF00)));
    let b = _mm256_srli_epi32::<16>(_mm256_and_si256(v, _mm256_set1_epi32(0x00FF_0000)));
    [
        horizontal_sum(_mm256_sad_epu8(r, zero)),
        horizontal_sum(_mm256_sad_epu8(g, zero)),
        horizontal_sum(_mm256_sad_epu8(b, zero)),
    ]
}

/// Adds the four 64-bit lanes produced by `_mm256_sad_epu8`.
///
/// # Safety
///
/// The caller must ensure the CPU supports AVX2.
#[target_feature(enable = "avx2")]
unsafe fn horizontal_sum(v: __m256i) -> i32 {
    let lo = _mm256_castsi256_si128(v);
    let hi = _mm256_extracti128_si256::<1>(v);
    let sum = _mm_add_epi64(lo, hi);
    (_mm_cvtsi128_si64(sum) + _mm_extract_epi64::<1>(sum)) as i32
}
