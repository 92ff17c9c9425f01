//! Block stream diagnostics.

use crate::error::CliError;
use argh::FromArgs;
use etc_compress::BlockData;
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "dissect")]
/// Write the block-type, endpoint and selector maps of a compressed file
pub struct DissectCmd {
    /// input .pvr or .ktx file
    #[argh(positional)]
    input: PathBuf,

    /// directory receiving out_block_type.png, out_block_color.png and
    /// out_block_selectors.png (defaults to the working directory)
    #[argh(option, short = 'o', default = "PathBuf::from(\".\")")]
    out_dir: PathBuf,
}

pub fn handle_dissect_command(cmd: DissectCmd) -> Result<(), CliError> {
    let data = BlockData::open(&cmd.input)?;
    data.dissect().write_files(&cmd.out_dir)?;
    Ok(())
}
