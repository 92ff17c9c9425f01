//! Error types for block data and container operations.

use crate::size::Size;
use thiserror::Error;

/// Errors surfaced by [`crate::BlockData`] construction and I/O.
///
/// Codec operations themselves cannot fail: every 4x4 tile maps to some
/// valid block word, and unknown modes decode as solid black. Failures come
/// from the container layer and the operating system.
#[derive(Debug, Error)]
pub enum BlockDataError {
    /// The file's magic word matches neither PVR v3 nor KTX.
    #[error("unrecognised container magic {magic:#010x}")]
    UnsupportedEnvelope {
        /// The first 32-bit word of the file.
        magic: u32,
    },

    /// The file is shorter than its envelope claims.
    #[error("file too short for its container header")]
    Truncated,

    /// Encoding requires both dimensions to be multiples of 4.
    #[error("image dimensions {0} are not multiples of 4")]
    InvalidSize(Size),

    /// Failed to open or create the backing file.
    #[error("failed to open file handle: {0}")]
    FileHandle(#[from] lightweight_mmap::handles::HandleOpenError),

    /// Failed to map the backing file.
    #[error("failed to create memory mapping: {0}")]
    Mapping(#[from] lightweight_mmap::mmap::MmapError),

    /// Failed to allocate an in-memory payload buffer.
    #[error("allocation failed: {0}")]
    Allocation(#[from] safe_allocator_api::allocator_api::AllocError),

    /// The requested buffer layout was invalid (length overflow).
    #[error("invalid allocation layout: {0}")]
    Layout(#[from] core::alloc::LayoutError),

    /// Failed to encode a diagnostic PNG.
    #[error("png encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    /// Plain I/O failure while writing diagnostics.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
