//! Shared constants for the ETC1 coding space.

/// The fixed ETC1 modifier table.
///
/// Rows are selected by the 3-bit table codeword of a sub-block; columns by
/// the 2-bit per-pixel selector. The selector's low bit picks the magnitude
/// and its high bit the sign, so the column order is
/// `[+small, +large, -small, -large]`.
pub(crate) const MODIFIER_TABLE: [[i32; 4]; 8] = [
    [2, 8, -2, -8],
    [5, 17, -5, -17],
    [9, 29, -9, -29],
    [13, 42, -13, -42],
    [18, 60, -18, -60],
    [24, 80, -24, -80],
    [33, 106, -33, -106],
    [47, 183, -47, -183],
];
