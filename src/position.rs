//! Position codec
//!
//! Maps a (row, column) fact to a single bit index inside a shard. Both
//! storage variants use this codec, so row-range paging and per-shard
//! addressing agree on every bit.

/// Number of columns encoded per row segment (one shard's width).
pub const SLICE_WIDTH: u64 = 1 << 20;

/// Rows covered by one anti-entropy hash block.
pub const HASH_BLOCK_SIZE: u64 = 100;

/// Highest row `pos` encodes without wrapping.
pub const MAX_ROW: u64 = u64::MAX / SLICE_WIDTH;

/// A (row, column) fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: u64,
    pub column: u64,
}

impl Position {
    pub fn new(row: u64, column: u64) -> Self {
        Self { row, column }
    }

    /// Bit index of this fact. Ascending in row-major order.
    pub fn to_bit(&self) -> u64 {
        pos(self.row, self.column)
    }
}

/// `row * SLICE_WIDTH + column % SLICE_WIDTH`
///
/// Injective for rows below `2^44`; larger rows wrap rather than panic.
pub fn pos(row: u64, column: u64) -> u64 {
    row.wrapping_mul(SLICE_WIDTH)
        .wrapping_add(column % SLICE_WIDTH)
}

/// Row a bit index belongs to
pub fn row_of(bit: u64) -> u64 {
    bit / SLICE_WIDTH
}

/// Column (within the shard) a bit index belongs to
pub fn column_of(bit: u64) -> u64 {
    bit % SLICE_WIDTH
}

/// First and last bit (inclusive) of `row`
pub fn row_bits(row: u64) -> (u64, u64) {
    let first = pos(row, 0);
    (first, first | (SLICE_WIDTH - 1))
}

/// First and last row (inclusive) of hash block `block_id`, clamped to
/// `MAX_ROW`. `None` if the block starts past it.
pub fn block_rows(block_id: u64) -> Option<(u64, u64)> {
    let first = block_id
        .checked_mul(HASH_BLOCK_SIZE)
        .filter(|row| *row <= MAX_ROW)?;
    let last = first.saturating_add(HASH_BLOCK_SIZE - 1).min(MAX_ROW);
    Some((first, last))
}
