//! Mipmap chain geometry and downsampling.
//!
//! A full chain has `floor(log2(max(w, h))) + 1` levels ending at 1x1.
//! Levels smaller than a block in either dimension still occupy whole
//! blocks on disk, so their payload length is computed from dimensions
//! padded up to 4.

use crate::bitmap::Bitmap;
use crate::size::Size;

/// Number of levels in a full mipmap chain for an image of `size`.
pub fn num_mip_levels(size: Size) -> u32 {
    32 - size.x.max(size.y).max(1).leading_zeros()
}

/// Dimensions of mip level `level` (level 0 is the base image).
pub fn level_size(size: Size, level: u32) -> Size {
    Size::new((size.x >> level).max(1), (size.y >> level).max(1))
}

/// Encoded payload length in bytes for a single level of the given
/// dimensions, padding sub-block dimensions up to one whole block.
pub fn level_payload_len(size: Size) -> usize {
    size.x.max(4) as usize * size.y.max(4) as usize / 2
}

/// Total encoded payload length in bytes for `levels` levels starting at
/// the base dimensions `size`.
pub fn chain_payload_len(size: Size, levels: u32) -> usize {
    (0..levels)
        .map(|level| level_payload_len(level_size(size, level)))
        .sum()
}

/// Byte offset of mip level `level` within the block payload.
pub fn level_byte_offset(size: Size, level: u32) -> usize {
    chain_payload_len(size, level)
}

/// Halves an image with a 2x2 box filter.
///
/// Each output dimension is `max(1, dim / 2)`; source coordinates are
/// clamped at the edges so odd and sub-2 dimensions stay well defined.
pub fn downsample(src: &Bitmap) -> Bitmap {
    let size = src.size();
    let out_size = Size::new((size.x / 2).max(1), (size.y / 2).max(1));
    let mut out = Bitmap::new(out_size);

    for y in 0..out_size.y {
        for x in 0..out_size.x {
            let mut sum = [0u32; 4];
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let sx = (x * 2 + dx).min(size.x - 1);
                let sy = (y * 2 + dy).min(size.y - 1);
                let px = src.pixel(sx, sy);
                for (ch, acc) in sum.iter_mut().enumerate() {
                    *acc += (px >> (ch * 8)) & 0xFF;
                }
            }
            let mut px = 0u32;
            for (ch, acc) in sum.iter().enumerate() {
                px |= ((acc + 2) / 4) << (ch * 8);
            }
            out.data_mut()[(y * out_size.x + x) as usize] = px;
        }
    }
    out
}

/// Pads an image up to block-aligned dimensions by repeating the edge
/// pixels. Returns a clone when the image is already block aligned.
pub fn pad_to_blocks(src: &Bitmap) -> Bitmap {
    let size = src.size();
    if size.is_block_aligned() {
        return src.clone();
    }

    let out_size = Size::new(size.x.max(4).next_multiple_of(4), size.y.max(4).next_multiple_of(4));
    let mut out = Bitmap::new(out_size);
    for y in 0..out_size.y {
        for x in 0..out_size.x {
            let px = src.pixel(x.min(size.x - 1), y.min(size.y - 1));
            out.data_mut()[(y * out_size.x + x) as usize] = px;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::test_prelude::*;

    #[rstest]
    #[case(Size::new(4, 4), 3)]
    #[case(Size::new(16, 16), 5)]
    #[case(Size::new(64, 16), 7)]
    #[case(Size::new(1, 1), 1)]
    fn chain_length(#[case] size: Size, #[case] expected: u32) {
        assert_eq!(num_mip_levels(size), expected);
    }

    #[test]
    fn last_level_is_one_by_one() {
        let size = Size::new(64, 16);
        let levels = num_mip_levels(size);
        assert_eq!(level_size(size, levels - 1), Size::new(1, 1));
    }

    #[test]
    fn sub_block_levels_pad_to_whole_blocks() {
        assert_eq!(level_payload_len(Size::new(2, 2)), 8);
        assert_eq!(level_payload_len(Size::new(1, 1)), 8);
        assert_eq!(level_payload_len(Size::new(8, 2)), 32);
    }

    #[test]
    fn sixteen_square_chain_layout() {
        // 16x16 with a full chain: 128 + 32 + 8 + 8 + 8 payload bytes.
        let size = Size::new(16, 16);
        let levels = num_mip_levels(size);
        assert_eq!(levels, 5);
        assert_eq!(chain_payload_len(size, levels), 128 + 32 + 8 + 8 + 8);
        assert_eq!(level_byte_offset(size, 1), 128);
        assert_eq!(level_byte_offset(size, 2), 160);
        assert_eq!(level_byte_offset(size, 4), 176);
    }

    #[test]
    fn downsample_halves_and_averages() {
        let mut bmp = Bitmap::new(Size::new(4, 4));
        bmp.data_mut().fill(0xFF000000 | 100);
        bmp.data_mut()[0] = 0xFF000000 | 104;
        let half = downsample(&bmp);
        assert_eq!(half.size(), Size::new(2, 2));
        assert_eq!(half.pixel(0, 0) & 0xFF, 101);
        assert_eq!(half.pixel(1, 1) & 0xFF, 100);
    }

    #[test]
    fn pad_repeats_edges() {
        let bmp = Bitmap::from_pixels(Size::new(1, 1), vec![0xFF112233]);
        let padded = pad_to_blocks(&bmp);
        assert_eq!(padded.size(), Size::new(4, 4));
        assert!(padded.data().iter().all(|&px| px == 0xFF112233));
    }
}
