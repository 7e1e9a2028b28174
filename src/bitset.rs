//! Word-packed presence bitmaps and their scan primitives.
//!
//! A [`Bitset`] is the presence half of the CSR layout used by sparse
//! leaves: a fixed grid of rows, each packed into `ceil(cols / 32)` u32
//! words. Bits beyond `cols` in the last word of a row are padding and are
//! never set; every iterator additionally clips its output to `< cols`.
//!
//! On top of the grid sit the scan primitives the materialization engine
//! and the relational algorithms run on:
//!
//! - [`BitCursor`]: a single-row cursor with `next` (advance to the next
//!   set bit strictly after the current position) and `seek` (reposition
//!   without scanning).
//! - [`OrScan`] / [`AndScan`]: merge-style co-scans of two rows, visiting
//!   either-side or common bits without allocating row arrays.
//! - word kernels for subset/equality tests and Jaccard accumulation.

use crate::domain::WORD_BITS;

/// A fixed-size grid of presence bits.
///
/// The grid never grows: row and word counts are pre-checked by the domain
/// before a `Bitset` is allocated.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Bitset {
    words: Vec<u32>,
    words_per_row: usize,
    rows: usize,
    cols: usize,
}

impl Bitset {
    /// Creates an all-zero grid of `rows x cols` bits.
    pub fn new(rows: usize, cols: usize) -> Self {
        let words_per_row = cols.div_ceil(WORD_BITS);
        Self {
            words: vec![0; rows * words_per_row],
            words_per_row,
            rows,
            cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn words_per_row(&self) -> usize {
        self.words_per_row
    }

    #[inline]
    fn word_index(&self, row: usize, col: usize) -> (usize, u32) {
        (row * self.words_per_row + col / WORD_BITS, 1u32 << (col % WORD_BITS))
    }

    /// Sets bit `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize) {
        debug_assert!(row < self.rows && col < self.cols);
        let (w, mask) = self.word_index(row, col);
        self.words[w] |= mask;
    }

    /// Clears bit `(row, col)`.
    #[inline]
    pub fn clear(&mut self, row: usize, col: usize) {
        debug_assert!(row < self.rows && col < self.cols);
        let (w, mask) = self.word_index(row, col);
        self.words[w] &= !mask;
    }

    /// Tests bit `(row, col)`.
    #[inline]
    pub fn test(&self, row: usize, col: usize) -> bool {
        debug_assert!(row < self.rows && col < self.cols);
        let (w, mask) = self.word_index(row, col);
        self.words[w] & mask != 0
    }

    /// The packed words of one row.
    #[inline]
    pub fn row_words(&self, row: usize) -> &[u32] {
        debug_assert!(row < self.rows);
        &self.words[row * self.words_per_row..(row + 1) * self.words_per_row]
    }

    /// Number of set bits in one row.
    pub fn row_popcount(&self, row: usize) -> usize {
        self.row_words(row).iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Total number of set bits.
    pub fn popcount(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Within-row rank: the number of set bits strictly before `col`, i.e.
    /// the popcount of all full words before `col` plus a masked tail word.
    /// Combined with a CSR row pointer this maps a set bit to its slot in
    /// the packed values array.
    #[inline]
    pub fn rank(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        let words = self.row_words(row);
        let full = col / WORD_BITS;
        let mut rank = 0usize;
        for w in &words[..full] {
            rank += w.count_ones() as usize;
        }
        let tail_bits = col % WORD_BITS;
        if tail_bits > 0 {
            rank += (words[full] & ((1u32 << tail_bits) - 1)).count_ones() as usize;
        }
        rank
    }

    /// Iterator over the set columns of one row, in ascending order,
    /// clipped to `< cols`.
    pub fn iter_row(&self, row: usize) -> BitCursor<'_> {
        BitCursor::new(self.row_words(row), self.cols)
    }
}

/// A cursor over the set bits of a packed word slice.
///
/// The cursor starts *before* position 0; each [`next`][BitCursor::next]
/// advances to the first set bit strictly after the current position,
/// skipping zero words in O(1) amortized per found bit. [`seek`] repositions
/// the cursor without scanning.
///
/// [`seek`]: BitCursor::seek
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    words: &'a [u32],
    limit: usize,
    /// Current position; `None` before the first `next`/`seek`.
    pos: Option<usize>,
}

impl<'a> BitCursor<'a> {
    pub fn new(words: &'a [u32], limit: usize) -> Self {
        Self { words, limit, pos: None }
    }

    /// Repositions the cursor at `pos`: the following `next` yields the
    /// first set bit strictly after `pos`.
    pub fn seek(&mut self, pos: usize) {
        self.pos = Some(pos);
    }

    /// Resets the cursor to before position 0.
    pub fn rewind(&mut self) {
        self.pos = None;
    }

    /// The current position, if any.
    pub fn pos(&self) -> Option<usize> {
        self.pos
    }
}

impl Iterator for BitCursor<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let start = match self.pos {
            None => 0,
            Some(p) => p + 1,
        };
        if start >= self.limit {
            return None;
        }
        let mut wi = start / WORD_BITS;
        if wi >= self.words.len() {
            return None;
        }
        let shift = start % WORD_BITS;
        // Mask off bits below the start position in the first word.
        let mut word = self.words[wi] & (u32::MAX << shift);
        loop {
            if word != 0 {
                let bit = wi * WORD_BITS + word.trailing_zeros() as usize;
                if bit >= self.limit {
                    return None;
                }
                self.pos = Some(bit);
                return Some(bit);
            }
            wi += 1;
            if wi >= self.words.len() {
                return None;
            }
            word = self.words[wi];
        }
    }
}

/// Which side(s) of an [`OrScan`] carry the visited bit.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OrSide {
    Left,
    Right,
    Both,
}

/// Merge-style co-scan over two rows: visits every position where either
/// side has a set bit, in ascending order, reporting which sides do.
#[derive(Debug, Clone)]
pub struct OrScan<'a> {
    a: &'a [u32],
    b: &'a [u32],
    limit: usize,
    wi: usize,
    cur_a: u32,
    cur_b: u32,
}

impl<'a> OrScan<'a> {
    pub fn new(a: &'a [u32], b: &'a [u32], limit: usize) -> Self {
        debug_assert_eq!(a.len(), b.len());
        Self {
            a,
            b,
            limit,
            wi: 0,
            cur_a: a.first().copied().unwrap_or(0),
            cur_b: b.first().copied().unwrap_or(0),
        }
    }
}

impl Iterator for OrScan<'_> {
    type Item = (usize, OrSide);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let combined = self.cur_a | self.cur_b;
            if combined != 0 {
                // Isolate the lowest pending bit and report its side(s).
                let low = combined & combined.wrapping_neg();
                let bit = self.wi * WORD_BITS + low.trailing_zeros() as usize;
                if bit >= self.limit {
                    return None;
                }
                let side = match (self.cur_a & low != 0, self.cur_b & low != 0) {
                    (true, true) => OrSide::Both,
                    (true, false) => OrSide::Left,
                    (false, true) => OrSide::Right,
                    (false, false) => unreachable!(),
                };
                self.cur_a &= !low;
                self.cur_b &= !low;
                return Some((bit, side));
            }
            self.wi += 1;
            if self.wi >= self.a.len() {
                return None;
            }
            self.cur_a = self.a[self.wi];
            self.cur_b = self.b[self.wi];
        }
    }
}

/// Merge-style co-scan over two rows visiting only common set bits.
#[derive(Debug, Clone)]
pub struct AndScan<'a> {
    words: std::iter::Zip<std::slice::Iter<'a, u32>, std::slice::Iter<'a, u32>>,
    limit: usize,
    wi: usize,
    cur: u32,
}

impl<'a> AndScan<'a> {
    pub fn new(a: &'a [u32], b: &'a [u32], limit: usize) -> Self {
        debug_assert_eq!(a.len(), b.len());
        let mut words = a.iter().zip(b.iter());
        let cur = words.next().map(|(x, y)| x & y).unwrap_or(0);
        Self { words, limit, wi: 0, cur }
    }
}

impl Iterator for AndScan<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.cur != 0 {
                let bit = self.wi * WORD_BITS + self.cur.trailing_zeros() as usize;
                if bit >= self.limit {
                    return None;
                }
                self.cur &= self.cur - 1; // Clear lowest set bit.
                return Some(bit);
            }
            match self.words.next() {
                Some((x, y)) => {
                    self.wi += 1;
                    self.cur = x & y;
                }
                None => return None,
            }
        }
    }
}

/// True when every bit of `a` is also set in `b`.
#[inline]
pub fn words_subset(a: &[u32], b: &[u32]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).all(|(x, y)| x & !y == 0)
}

/// Intersection and union popcounts of two rows, accumulated per word.
/// The Jaccard index of the rows is `inter as f64 / union as f64`.
#[inline]
pub fn words_jaccard_counts(a: &[u32], b: &[u32]) -> (usize, usize) {
    debug_assert_eq!(a.len(), b.len());
    let mut inter = 0usize;
    let mut union = 0usize;
    for (x, y) in a.iter().zip(b) {
        inter += (x & y).count_ones() as usize;
        union += (x | y).count_ones() as usize;
    }
    (inter, union)
}

/// Packs a set of column indices into row-shaped mask words.
pub fn make_mask(cols: usize, indices: impl IntoIterator<Item = usize>) -> Vec<u32> {
    let mut mask = vec![0u32; cols.div_ceil(WORD_BITS)];
    for i in indices {
        debug_assert!(i < cols);
        mask[i / WORD_BITS] |= 1u32 << (i % WORD_BITS);
    }
    mask
}
