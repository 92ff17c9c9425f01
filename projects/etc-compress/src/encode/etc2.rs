//! ETC2 planar extension encoder.
//!
//! Fits a color plane through the tile by least squares over the normative
//! reconstruction `p(x, y) = O + x * (H - O) / 4 + y * (V - O) / 4`, packs
//! the three control points at the planar bit positions, and keeps the
//! result only when its reconstruction error beats the best ETC1 candidate.

use crate::block::byteswap_halves;
use crate::color::clamp_u8;
use crate::decode::{expand6, expand7};
use crate::encode::etc1::encode_etc1;

/// Encodes a column-major 4x4 RGB tile as a single block word in persisted
/// byte order, choosing between ETC1 modes and the ETC2 planar mode.
pub fn process_rgb_etc2(tile: &[u32; 16]) -> u64 {
    let (etc1, etc1_err) = encode_etc1(tile);
    let (planar, planar_err) = encode_planar(tile);
    if planar_err < etc1_err {
        planar
    } else {
        etc1
    }
}

/// One channel's control points, quantised and ready to pack.
struct PlanarChannel {
    o: u32,
    h: u32,
    v: u32,
}

/// Fits one channel's plane and quantises the control points to `bits`
/// bits (6 for red/blue, 7 for green).
fn fit_channel(tile: &[u32; 16], ch: u32, bits: u32) -> PlanarChannel {
    let mut sv = 0i32;
    let mut sxv = 0i32;
    let mut syv = 0i32;
    for (k, &px) in tile.iter().enumerate() {
        let val = ((px >> (ch * 8)) & 0xFF) as i32;
        sv += val;
        sxv += (k as i32 / 4) * val;
        syv += (k as i32 % 4) * val;
    }

    // Least squares on the regular 4x4 grid: both coordinate variances are
    // 20 and the coordinates are uncorrelated.
    let slope_x = (sxv as f32 - 1.5 * sv as f32) / 20.0;
    let slope_y = (syv as f32 - 1.5 * sv as f32) / 20.0;
    let origin = sv as f32 / 16.0 - 1.5 * (slope_x + slope_y);

    let max = ((1u32 << bits) - 1) as f32;
    let quant = |v: f32| (v.clamp(0.0, 255.0) * max / 255.0 + 0.5) as u32;

    PlanarChannel {
        o: quant(origin),
        h: quant(origin + 4.0 * slope_x),
        v: quant(origin + 4.0 * slope_y),
    }
}

/// Encodes the tile in planar mode, returning the block word and its
/// reconstruction error.
pub(crate) fn encode_planar(tile: &[u32; 16]) -> (u64, u64) {
    let r = fit_channel(tile, 0, 6);
    let g = fit_channel(tile, 1, 7);
    let b = fit_channel(tile, 2, 6);

    let word = pack_planar(&r, &g, &b);

    // Score against the actual decoder arithmetic.
    let ro = expand6(r.o);
    let rh = expand6(r.h);
    let rv = expand6(r.v);
    let go = expand7(g.o);
    let gh = expand7(g.h);
    let gv = expand7(g.v);
    let bo = expand6(b.o);
    let bh = expand6(b.h);
    let bv = expand6(b.v);

    let mut err = 0u64;
    for (k, &px) in tile.iter().enumerate() {
        let x = k as i32 / 4;
        let y = k as i32 % 4;
        let dec = [
            clamp_u8((x * (rh - ro) + y * (rv - ro) + 4 * ro + 2) >> 2),
            clamp_u8((x * (gh - go) + y * (gv - go) + 4 * go + 2) >> 2),
            clamp_u8((x * (bh - bo) + y * (bv - bo) + 4 * bo + 2) >> 2),
        ];
        for (ch, &d) in dec.iter().enumerate() {
            let delta = ((px >> (ch as u32 * 8)) & 0xFF) as i32 - d as i32;
            err += (delta * delta) as u64;
        }
    }

    (byteswap_halves(word), err)
}

/// Packs the control points into a canonical block word whose differential
/// fields overflow on blue and stay in range on red and green.
fn pack_planar(r: &PlanarChannel, g: &PlanarChannel, b: &PlanarChannel) -> u64 {
    let mut lo: u32 = 0x2;
    lo |= (r.h & 0x1) | (r.h >> 1) << 2;
    lo |= (b.o & 0x07) << 7 | ((b.o >> 3) & 0x3) << 11 | (b.o >> 5) << 16;
    lo |= (g.o & 0x3F) << 17 | (g.o >> 6) << 24;
    lo |= r.o << 25;
    lo |= overflow_guard(lo);

    let hi: u32 = b.v | g.v << 6 | r.v << 13 | b.h << 19 | g.h << 25;

    (hi as u64) << 32 | lo as u64
}

/// Chooses the spare low-half bits so that, read as a differential block,
/// the word underflows or overflows on the blue channel and on no other.
fn overflow_guard(lo: u32) -> u32 {
    let sext3 = |v: u32| if v & 0x4 != 0 { v as i32 - 8 } else { v as i32 };
    let mut guard = 0u32;

    // Bit 31 tops up the red base when its delta would underflow.
    let r_low = ((lo >> 27) & 0xF) as i32;
    if r_low + sext3((lo >> 24) & 0x7) < 0 {
        guard |= 1 << 31;
    }

    // Bit 23 does the same for green.
    let g_low = ((lo >> 19) & 0xF) as i32;
    if g_low + sext3((lo >> 16) & 0x7) < 0 {
        guard |= 1 << 23;
    }

    // Blue must leave the 5-bit range. Either push the base to the top and
    // keep the delta positive, or keep the base at the bottom and make the
    // delta negative; which one works depends on the data bits already in
    // the shared fields.
    let b_low = (lo >> 11) & 0x3;
    let db_low = (lo >> 8) & 0x3;
    if b_low + db_low >= 4 {
        guard |= 0x7 << 13;
    } else {
        guard |= 1 << 10;
    }
    guard
}
