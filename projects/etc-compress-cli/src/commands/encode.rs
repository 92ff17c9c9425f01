//! Image to PVR compression.

use crate::error::CliError;
use argh::FromArgs;
use etc_compress::color::Color8888;
use etc_compress::mip::{downsample, level_byte_offset, num_mip_levels, pad_to_blocks};
use etc_compress::{Bitmap, BlockData, Channels, Size};
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "encode")]
/// Compress an image into an ETC block stream in a PVR v3 container
pub struct EncodeCmd {
    /// input image (any format the image crate reads)
    #[argh(positional)]
    input: PathBuf,

    /// output .pvr file
    #[argh(positional)]
    output: PathBuf,

    /// generate a full mipmap chain
    #[argh(switch, short = 'm')]
    mipmap: bool,

    /// apply ordered dithering before encoding
    #[argh(switch, short = 'd')]
    dither: bool,

    /// allow ETC2 planar blocks
    #[argh(switch, short = 'e')]
    etc2: bool,

    /// encode the alpha channel as luma instead of RGB
    #[argh(switch, short = 'a')]
    alpha: bool,

    /// worker count for base-level encoding (defaults to the thread pool
    /// size)
    #[argh(option, short = 't')]
    threads: Option<usize>,
}

pub fn handle_encode_command(cmd: EncodeCmd) -> Result<(), CliError> {
    let img = image::open(&cmd.input)?.to_rgba8();
    let size = Size::new(img.width(), img.height());
    if !size.is_block_aligned() {
        return Err(CliError::BadDimensions(size));
    }

    let pixels: Vec<u32> = img
        .pixels()
        .map(|px| {
            let [r, g, b, a] = px.0;
            Color8888::new(r, g, b, a).to_u32()
        })
        .collect();
    let base = Bitmap::from_pixels(size, pixels);

    let channels = if cmd.alpha {
        Channels::AlphaAsLuma
    } else {
        Channels::Rgb
    };

    let data = BlockData::create(&cmd.output, size, cmd.mipmap)?;
    encode_base_level(&data, &base, channels, cmd.dither, cmd.etc2, cmd.threads);

    if cmd.mipmap {
        let mut level_src = base;
        for level in 1..num_mip_levels(size) {
            level_src = downsample(&level_src);
            let padded = pad_to_blocks(&level_src);
            let padded_size = padded.size();
            let offset = level_byte_offset(size, level) / 8;
            // SAFETY: each level writes a range disjoint from all others,
            // and the padded source covers its full block grid.
            unsafe {
                data.process(
                    padded.data(),
                    padded_size.blocks() as u32,
                    offset,
                    padded_size.x as usize,
                    channels,
                    cmd.dither,
                    cmd.etc2,
                );
            }
        }
    }

    Ok(())
}

/// Encodes the base level on the rayon pool, one disjoint span of block
/// rows per worker.
fn encode_base_level(
    data: &BlockData,
    base: &Bitmap,
    channels: Channels,
    dither: bool,
    etc2: bool,
    threads: Option<usize>,
) {
    use rayon::prelude::*;

    let size = base.size();
    let width = size.x as usize;
    let block_rows = (size.y / 4) as usize;
    let blocks_per_row = width / 4;

    let workers = threads
        .unwrap_or_else(rayon::current_num_threads)
        .min(block_rows)
        .max(1);
    let rows_per_worker = block_rows.div_ceil(workers);

    (0..block_rows)
        .step_by(rows_per_worker)
        .collect::<Vec<_>>()
        .into_par_iter()
        .for_each(|first_row| {
            let rows = rows_per_worker.min(block_rows - first_row);
            let blocks = (rows * blocks_per_row) as u32;
            let offset = first_row * blocks_per_row;
            let src = &base.data()[first_row * 4 * width..];
            // SAFETY: every span writes a disjoint block range starting at
            // a block-row boundary; the pool joins before `data` is used
            // again.
            unsafe {
                data.process(src, blocks, offset, width, channels, dither, etc2);
            }
        });
}
