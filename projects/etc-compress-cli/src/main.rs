mod commands;
mod error;

use argh::FromArgs;
use std::error::Error;

#[derive(FromArgs, Debug)]
/// ETC1/ETC2 texture compression tool for PVR and KTX containers
struct TopLevel {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Commands {
    Encode(commands::encode::EncodeCmd),
    Decode(commands::decode::DecodeCmd),
    Dissect(commands::dissect::DissectCmd),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli: TopLevel = argh::from_env();

    match cli.command {
        Commands::Encode(cmd) => commands::encode::handle_encode_command(cmd)?,
        Commands::Decode(cmd) => commands::decode::handle_decode_command(cmd)?,
        Commands::Dissect(cmd) => commands::dissect::handle_dissect_command(cmd)?,
    }

    Ok(())
}
