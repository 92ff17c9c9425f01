//! Scalar ETC1 block encoder.
//!
//! Both sub-block partitions (2x4 and 4x2) are evaluated. Per sub-block, the
//! channel averages are coded differentially (5+3 bits) when all three
//! deltas fit the signed 3-bit range and individually (4+4 bits) otherwise;
//! each pixel then picks the least-error entry of the best modifier-table
//! row. The partition with the smaller summed error wins.

use crate::block::byteswap_halves;
use crate::color::clamp_u8;
use crate::decode::{expand4, expand5};
use crate::tables::MODIFIER_TABLE;

/// Tile indices of the two sub-blocks, per flip orientation. The tile is
/// column-major (`tile[c * 4 + r]`), so the non-flipped 2x4 halves are the
/// first and second eight entries, while the flipped 4x2 halves interleave.
const SUBBLOCK_PIXELS: [[[usize; 8]; 2]; 2] = [
    [[0, 1, 2, 3, 4, 5, 6, 7], [8, 9, 10, 11, 12, 13, 14, 15]],
    [[0, 1, 4, 5, 8, 9, 12, 13], [2, 3, 6, 7, 10, 11, 14, 15]],
];

#[inline]
fn rgb(px: u32) -> [i32; 3] {
    [
        (px & 0xFF) as i32,
        ((px >> 8) & 0xFF) as i32,
        ((px >> 16) & 0xFF) as i32,
    ]
}

/// Channel sums of the four sub-blocks, ordered as the two non-flipped
/// halves followed by the two flipped halves.
pub(crate) fn subblock_sums(tile: &[u32; 16]) -> [[i32; 3]; 4] {
    let mut sums = [[0i32; 3]; 4];
    for (i, &px) in tile.iter().enumerate() {
        let p = rgb(px);
        let halves = [i / 8, 2 + (i % 4) / 2];
        for half in halves {
            for ch in 0..3 {
                sums[half][ch] += p[ch];
            }
        }
    }
    sums
}

struct Endpoints {
    /// The 24-bit base-color field segment (canonical bits 8..32).
    fields: u32,
    differential: bool,
    /// Expanded 8-bit bases of the two sub-blocks.
    base: [[i32; 3]; 2],
}

/// Codes two sub-block averages as differential endpoints when the deltas
/// fit, individual endpoints otherwise.
fn quantize_endpoints(avg: &[[i32; 3]; 2]) -> Endpoints {
    let q1 = avg[0].map(|v| (v * 31 + 127) / 255);
    let q2 = avg[1].map(|v| (v * 31 + 127) / 255);
    let delta = [q2[0] - q1[0], q2[1] - q1[1], q2[2] - q1[2]];

    if delta.iter().all(|d| (-4..=3).contains(d)) {
        let fields = (q1[0] as u32) << 27
            | ((delta[0] as u32) & 0x7) << 24
            | (q1[1] as u32) << 19
            | ((delta[1] as u32) & 0x7) << 16
            | (q1[2] as u32) << 11
            | ((delta[2] as u32) & 0x7) << 8;
        Endpoints {
            fields,
            differential: true,
            base: [
                q1.map(|v| expand5(v as u32) as i32),
                q2.map(|v| expand5(v as u32) as i32),
            ],
        }
    } else {
        let q1 = avg[0].map(|v| (v * 15 + 127) / 255);
        let q2 = avg[1].map(|v| (v * 15 + 127) / 255);
        let fields = (q1[0] as u32) << 28
            | (q2[0] as u32) << 24
            | (q1[1] as u32) << 20
            | (q2[1] as u32) << 16
            | (q1[2] as u32) << 12
            | (q2[2] as u32) << 8;
        Endpoints {
            fields,
            differential: false,
            base: [
                q1.map(|v| expand4(v as u32) as i32),
                q2.map(|v| expand4(v as u32) as i32),
            ],
        }
    }
}

#[inline]
fn pixel_error(p: [i32; 3], base: [i32; 3], m: i32) -> u64 {
    let mut err = 0u64;
    for ch in 0..3 {
        let d = p[ch] - clamp_u8(base[ch] + m) as i32;
        err += (d * d) as u64;
    }
    err
}

/// Finds the modifier-table row minimising the summed per-pixel error for
/// one sub-block, returning the codeword, the error and the chosen
/// selectors.
fn best_codeword(tile: &[u32; 16], idxs: &[usize; 8], base: [i32; 3]) -> (u64, u64, [u8; 8]) {
    let mut best = (0u64, u64::MAX, [0u8; 8]);

    for (cw, row) in MODIFIER_TABLE.iter().enumerate() {
        let mut err = 0u64;
        let mut sels = [0u8; 8];

        for (j, &k) in idxs.iter().enumerate() {
            let p = rgb(tile[k]);
            let mut px_best = u64::MAX;
            for (s, &m) in row.iter().enumerate() {
                let e = pixel_error(p, base, m);
                if e < px_best {
                    px_best = e;
                    sels[j] = s as u8;
                }
            }
            err += px_best;
        }

        if err < best.1 {
            best = (cw as u64, err, sels);
        }
    }
    best
}

/// Encodes a tile from precomputed sub-block channel sums, returning the
/// persisted block word and its approximation error. Shared by the scalar
/// and AVX2 kernels so both produce identical bits.
pub(crate) fn encode_with_sums(tile: &[u32; 16], sums: &[[i32; 3]; 4]) -> (u64, u64) {
    let mut best: Option<(u64, u64)> = None;

    for flip in 0..2usize {
        let avg = [
            sums[flip * 2].map(|s| (s + 4) >> 3),
            sums[flip * 2 + 1].map(|s| (s + 4) >> 3),
        ];
        let ep = quantize_endpoints(&avg);
        let idxs = &SUBBLOCK_PIXELS[flip];

        let (cw0, err0, sel0) = best_codeword(tile, &idxs[0], ep.base[0]);
        let (cw1, err1, sel1) = best_codeword(tile, &idxs[1], ep.base[1]);
        let err = err0 + err1;

        if best.map_or(true, |(_, e)| err < e) {
            let mut d = flip as u64
                | (ep.differential as u64) << 1
                | cw1 << 2
                | cw0 << 5
                | ep.fields as u64;
            for (half, sels) in [(0, &sel0), (1, &sel1)] {
                for (j, &k) in idxs[half].iter().enumerate() {
                    let s = sels[j] as u64;
                    d |= (s & 1) << (32 + k) | (s >> 1) << (48 + k);
                }
            }
            best = Some((byteswap_halves(d), err));
        }
    }

    best.unwrap()
}

/// Encodes a tile, returning the block word and its error.
pub(crate) fn encode_etc1(tile: &[u32; 16]) -> (u64, u64) {
    encode_with_sums(tile, &subblock_sums(tile))
}

/// Encodes a column-major 4x4 RGB tile as a single ETC1 block word in
/// persisted byte order.
pub fn process_rgb(tile: &[u32; 16]) -> u64 {
    encode_etc1(tile).0
}
