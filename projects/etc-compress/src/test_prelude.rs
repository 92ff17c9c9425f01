//! Common test imports and utilities.
//!
//! This module provides a common prelude for test modules to avoid
//! duplicate imports across the codebase.
#![allow(unused_imports)]

pub use rstest::rstest;

pub use crate::bitmap::Bitmap;
pub use crate::block::byteswap_halves;
pub use crate::block_data::BlockData;
pub use crate::container::*;
pub use crate::cpu_detect::has_avx2;
pub use crate::decode::decode_block;
pub use crate::encode::{process_rgb, process_rgb_etc2, select_kernel, Channels};
pub use crate::error::BlockDataError;
pub use crate::mip::*;
pub use crate::size::Size;

pub use super::*;

/// Asserts that two tiles match within `tolerance` per color channel,
/// ignoring alpha. `expected` is column-major as fed to the encoder,
/// `decoded` row-major as produced by the decoder.
pub(crate) fn assert_tile_close(expected: &[u32; 16], decoded: &[u32; 16], tolerance: i32) {
    for (k, &px) in expected.iter().enumerate() {
        let slot = (k % 4) * 4 + k / 4;
        for ch in 0..3 {
            let want = (px >> (ch * 8) & 0xFF) as i32;
            let got = (decoded[slot] >> (ch * 8) & 0xFF) as i32;
            assert!(
                (want - got).abs() <= tolerance,
                "pixel {k} channel {ch}: want {want}, got {got}"
            );
        }
    }
}

/// A smooth two-axis gradient tile in column-major order.
pub(crate) fn gradient_tile() -> [u32; 16] {
    core::array::from_fn(|k| {
        let val = 40 + (k as u32 / 4) * 12 + (k as u32 % 4) * 6;
        0xFF00_0000 | val << 16 | val << 8 | val
    })
}

/// A deterministic high-frequency tile in column-major order.
pub(crate) fn noise_tile() -> [u32; 16] {
    let mut state = 0x1234_5678u32;
    core::array::from_fn(|_| {
        // xorshift32
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state | 0xFF00_0000
    })
}
