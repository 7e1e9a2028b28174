//! Evaluation domains: `(dim, units, series)` triples.
//!
//! A domain fixes the shape of a unit function at construction time and
//! never changes. It also owns the `units^k` power table used to fold unit
//! tuples into flat row/column indices, and performs the wide-integer
//! capacity pre-checks that keep row and word counts inside the fixed-width
//! (u32) indexing range before anything is allocated.

use num_bigint::BigUint;

use crate::types::{Dim, Series, Unit};

/// Bits per bitset word; rows are packed into `ceil(units / 32)` words.
pub const WORD_BITS: usize = 32;

/// The shape of a unit function: dimension, unit count, series count.
///
/// # Invariants
///
/// - `units >= 1`, `series >= 1`.
/// - `pows[k] == units^k` for `k in 0..=dim`.
/// - Dense cell count, sparse row count, and bitset word count all fit in
///   `u32` (checked at construction, see [`Domain::new`]).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Domain {
    dim: Dim,
    units: usize,
    series: usize,
    pows: Vec<usize>,
}

impl Domain {
    /// Builds a domain, or `None` when the derived dense cell count, row
    /// count, or bitset word count would not fit the u32 indexing range.
    ///
    /// The overflow check runs in arbitrary precision *before* any sizing
    /// arithmetic in machine integers, so a hostile `(dim, units, series)`
    /// triple can never wrap silently.
    pub fn new(dim: Dim, units: usize, series: usize) -> Option<Self> {
        if units == 0 || series == 0 {
            return None;
        }

        let cap = BigUint::from(u32::MAX);
        let big_units = BigUint::from(units);
        let cells = BigUint::from(series) * big_units.pow(dim.get() as u32);
        if cells > cap {
            log::debug!(
                "domain {}x{}u x{}s rejected: {} cells exceed the u32 range",
                dim,
                units,
                series,
                cells
            );
            return None;
        }
        let words_per_row = BigUint::from(units.div_ceil(WORD_BITS));
        let rows = if dim.get() >= 1 {
            BigUint::from(series) * big_units.pow(dim.get() as u32 - 1)
        } else {
            BigUint::from(series)
        };
        if rows.clone() * words_per_row > cap {
            log::debug!("domain {}x{}u x{}s rejected: bitset words exceed the u32 range", dim, units, series);
            return None;
        }

        let mut pows = Vec::with_capacity(dim.get() + 1);
        let mut p = 1usize;
        for _ in 0..=dim.get() {
            pows.push(p);
            p = p.saturating_mul(units);
        }

        Some(Self { dim, units, series, pows })
    }

    pub fn dim(&self) -> Dim {
        self.dim
    }
    pub fn units(&self) -> usize {
        self.units
    }
    pub fn series(&self) -> usize {
        self.series
    }

    /// `units^k` for `k <= dim`.
    pub fn pow(&self, k: usize) -> usize {
        self.pows[k]
    }

    /// Number of cells a dense leaf stores: `series * units^dim`.
    pub fn dense_len(&self) -> usize {
        self.series * self.pow(self.dim.get())
    }

    /// Number of bitset rows of a sparse leaf: `series * units^(dim-1)`.
    ///
    /// Only meaningful for `dim >= 1` (sparse leaves require it).
    pub fn rows(&self) -> usize {
        debug_assert!(self.dim.get() >= 1);
        self.series * self.pow(self.dim.get() - 1)
    }

    /// Words per bitset row: `ceil(units / 32)`.
    pub fn words_per_row(&self) -> usize {
        self.units.div_ceil(WORD_BITS)
    }

    /// True when the tuple has the right arity and every index is in range.
    pub fn in_range(&self, tuple: &[Unit], series: Series) -> bool {
        tuple.len() == self.dim.get()
            && series.index() < self.series
            && tuple.iter().all(|u| u.index() < self.units)
    }

    /// Flat dense index: `s*units^dim + sum u_i * units^(dim-1-i)`.
    pub fn dense_index(&self, tuple: &[Unit], series: Series) -> usize {
        debug_assert_eq!(tuple.len(), self.dim.get());
        let mut index = series.index() * self.pow(self.dim.get());
        for (i, u) in tuple.iter().enumerate() {
            index += u.index() * self.pow(self.dim.get() - 1 - i);
        }
        index
    }

    /// Bitset row of a tuple: the flattened (series, leading units) part.
    pub fn row_of(&self, tuple: &[Unit], series: Series) -> usize {
        debug_assert!(self.dim.get() >= 1);
        debug_assert_eq!(tuple.len(), self.dim.get());
        let lead = self.dim.get() - 1;
        let mut row = series.index() * self.pow(lead);
        for (i, u) in tuple.iter().take(lead).enumerate() {
            row += u.index() * self.pow(lead - 1 - i);
        }
        row
    }

    /// Bitset column of a tuple: the trailing unit coordinate.
    pub fn col_of(&self, tuple: &[Unit]) -> usize {
        debug_assert!(!tuple.is_empty());
        tuple[tuple.len() - 1].index()
    }

    /// Range of rows belonging to one series: rows are laid out with the
    /// series as the outermost coordinate, so each series is contiguous.
    pub fn series_rows(&self, series: Series) -> std::ops::Range<usize> {
        let per = self.pow(self.dim.get() - 1);
        let start = series.index() * per;
        start..start + per
    }

    /// True when the two domains agree exactly (required for arithmetic
    /// composition).
    pub fn same(&self, other: &Domain) -> bool {
        self == other
    }

    /// The domain of a tensor product: unit/series counts must match and
    /// the dimensions add. `None` on mismatch or when the sum exceeds the
    /// cap or the derived counts overflow.
    pub fn tensor(&self, other: &Domain) -> Option<Domain> {
        if self.units != other.units || self.series != other.series {
            return None;
        }
        let dim = self.dim.checked_add(other.dim)?;
        Domain::new(dim, self.units, self.series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom(dim: u8, units: usize, series: usize) -> Domain {
        Domain::new(Dim::new(dim), units, series).unwrap()
    }

    #[test]
    fn test_pows() {
        let d = dom(3, 5, 2);
        assert_eq!(d.pow(0), 1);
        assert_eq!(d.pow(1), 5);
        assert_eq!(d.pow(2), 25);
        assert_eq!(d.pow(3), 125);
        assert_eq!(d.dense_len(), 250);
        assert_eq!(d.rows(), 50);
    }

    #[test]
    fn test_words_per_row() {
        assert_eq!(dom(2, 1, 1).words_per_row(), 1);
        assert_eq!(dom(2, 32, 1).words_per_row(), 1);
        assert_eq!(dom(2, 33, 1).words_per_row(), 2);
        assert_eq!(dom(2, 64, 1).words_per_row(), 2);
    }

    #[test]
    fn test_indexing() {
        let d = dom(2, 3, 2);
        let t = [Unit::new(1), Unit::new(2)];
        let s = Series::new(1);
        // index = 1*9 + 1*3 + 2
        assert_eq!(d.dense_index(&t, s), 14);
        assert_eq!(d.row_of(&t, s), 4);
        assert_eq!(d.col_of(&t), 2);
    }

    #[test]
    fn test_in_range() {
        let d = dom(2, 3, 2);
        assert!(d.in_range(&[Unit::new(0), Unit::new(2)], Series::new(1)));
        assert!(!d.in_range(&[Unit::new(0), Unit::new(3)], Series::new(1)));
        assert!(!d.in_range(&[Unit::new(0), Unit::new(2)], Series::new(2)));
        assert!(!d.in_range(&[Unit::new(0)], Series::new(0)));
    }

    #[test]
    fn test_capacity_precheck() {
        // 10^10 cells blow the u32 range even though each factor fits.
        assert!(Domain::new(Dim::new(10), 10, 1000).is_none());
        assert!(Domain::new(Dim::new(10), 2, 1).is_some());
        assert!(Domain::new(Dim::new(2), 0, 1).is_none());
        assert!(Domain::new(Dim::new(2), 1, 0).is_none());
    }

    #[test]
    fn test_tensor_domains() {
        let a = dom(2, 4, 3);
        let b = dom(1, 4, 3);
        let t = a.tensor(&b).unwrap();
        assert_eq!(t.dim().get(), 3);
        assert_eq!(t.units(), 4);
        assert_eq!(t.series(), 3);

        // Mismatched unit counts are a domain mismatch.
        let c = dom(1, 5, 3);
        assert!(a.tensor(&c).is_none());

        // Over-cap dimension sums are rejected.
        let d6 = dom(6, 4, 3);
        let d5 = dom(5, 4, 3);
        assert!(d6.tensor(&d5).is_none());
    }

    #[test]
    fn test_series_rows() {
        let d = dom(2, 3, 2);
        assert_eq!(d.series_rows(Series::new(0)), 0..3);
        assert_eq!(d.series_rows(Series::new(1)), 3..6);
    }
}
