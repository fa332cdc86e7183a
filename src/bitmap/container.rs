//! Bitmap container
//!
//! Wrapper over `RoaringTreemap` exposing only what the stores consume.

use std::io::{self, Write};

use roaring::RoaringTreemap;

/// Compressed set of bit positions
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    inner: RoaringTreemap,
}

impl Bitmap {
    /// Create an empty bitmap
    pub fn new() -> Self {
        Self {
            inner: RoaringTreemap::new(),
        }
    }

    /// Set a bit. Returns true if it was previously clear.
    pub fn add(&mut self, bit: u64) -> bool {
        self.inner.insert(bit)
    }

    /// Clear a bit. Returns true if it was previously set.
    pub fn remove(&mut self, bit: u64) -> bool {
        self.inner.remove(bit)
    }

    pub fn contains(&self, bit: u64) -> bool {
        self.inner.contains(bit)
    }

    /// Number of set bits
    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Highest set bit, `None` when empty
    pub fn max(&self) -> Option<u64> {
        self.inner.max()
    }

    /// Number of set bits strictly below `bit`
    pub fn count_below(&self, bit: u64) -> u64 {
        if bit == 0 {
            0
        } else {
            self.inner.rank(bit - 1)
        }
    }

    /// Number of set bits in `[lo, last]`
    pub fn count_range(&self, lo: u64, last: u64) -> u64 {
        if lo > last {
            return 0;
        }
        self.inner.rank(last) - self.count_below(lo)
    }

    /// The `n`-th set bit in ascending order (0-based)
    pub fn select(&self, n: u64) -> Option<u64> {
        self.inner.select(n)
    }

    /// Ascending iterator over every set bit
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.inner.iter()
    }

    /// Ascending iterator over set bits in `[lo, last]`.
    ///
    /// Skips whole high-key bitmaps below `lo`, then walks one cursor.
    pub fn range(&self, lo: u64, last: u64) -> impl Iterator<Item = u64> + '_ {
        let lo_key = (lo >> 32) as u32;
        let last_key = (last >> 32) as u32;
        self.inner
            .bitmaps()
            .skip_while(move |(key, _)| *key < lo_key)
            .take_while(move |(key, _)| *key <= last_key)
            .flat_map(|(key, bitmap)| {
                let base = u64::from(key) << 32;
                bitmap.iter().map(move |low| base | u64::from(low))
            })
            .skip_while(move |bit| *bit < lo)
            .take_while(move |bit| *bit <= last)
    }

    /// Consume into an ascending iterator over set bits `>= lo`
    pub fn into_iter_from(mut self, lo: u64) -> impl Iterator<Item = u64> + Send {
        self.inner.remove_range(..lo);
        self.inner.into_iter()
    }

    /// Decode a bitmap from the front of `bytes`.
    ///
    /// Returns the bitmap and whatever follows the serialized form.
    pub fn decode(bytes: &[u8]) -> io::Result<(Self, &[u8])> {
        let mut reader = bytes;
        let inner = RoaringTreemap::deserialize_from(&mut reader)?;
        Ok((Self { inner }, reader))
    }

    /// Write the portable serialized form
    pub fn encode_to<W: Write>(&self, writer: W) -> io::Result<()> {
        self.inner.serialize_into(writer)
    }

    /// Byte length of the serialized form
    pub fn serialized_size(&self) -> usize {
        self.inner.serialized_size()
    }
}

impl Default for Bitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<u64> for Bitmap {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut bitmap = Bitmap::new();
        for bit in iter {
            bitmap.add(bit);
        }
        bitmap
    }
}
