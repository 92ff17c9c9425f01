//! PVR/KTX to PNG decompression.

use crate::error::CliError;
use argh::FromArgs;
use etc_compress::BlockData;
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "decode")]
/// Decode the base level of a PVR or KTX file into a PNG image
pub struct DecodeCmd {
    /// input .pvr or .ktx file
    #[argh(positional)]
    input: PathBuf,

    /// output .png file
    #[argh(positional)]
    output: PathBuf,
}

pub fn handle_decode_command(cmd: DecodeCmd) -> Result<(), CliError> {
    let data = BlockData::open(&cmd.input)?;
    let bmp = data.decode();
    bmp.write_png(&cmd.output)?;
    Ok(())
}
