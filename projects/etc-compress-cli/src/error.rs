use etc_compress::Size;
use thiserror::Error;

/// Errors surfaced by the command handlers.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("container error: {0}")]
    BlockData(#[from] etc_compress::BlockDataError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("image dimensions {0} are not multiples of 4")]
    BadDimensions(Size),
}
