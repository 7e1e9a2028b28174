//! Comparison functions and their relational algorithms.
//!
//! A [`ComparisonFn`] is a 2-dimensional sparse unit function over
//! `(unit, unit, series)` augmented with a relational query surface. All
//! existence-level predicates run directly on the presence bitset: a
//! single-tuple check is O(1), and the frame-wide sweeps are word-parallel
//! row scans rather than per-tuple loops.
//!
//! Granularities follow one scheme throughout: a bare name checks one
//! tuple, `*_subset` a unit subset within one frame, `*_frame` the full
//! universe within one frame, and `*_fn` all frames.
//!
//! Construction is the one raising boundary of the crate: malformed raw
//! records are rejected with a [`ConstructionError`]; everything downstream
//! reports failure as a value.

use log::debug;

use crate::algebra::ValueAlgebra;
use crate::bitset::{make_mask, words_jaccard_counts, words_subset, BitCursor};
use crate::domain::Domain;
use crate::error::ConstructionError;
use crate::expr::UnitFn;
use crate::leaf::{Leaf, SparseBuilder, SparseLeaf};
use crate::subset::{count_filtered_subsets, filtered_subsets};
use crate::types::{Dim, Series, Unit};

/// One raw comparison: `value` relates `left` to `right` in `series`.
#[derive(Debug, Clone)]
pub struct Record<V> {
    pub left: usize,
    pub right: usize,
    pub series: usize,
    pub value: V,
}

/// A comparison function: the relational substrate of the engine.
#[derive(Debug)]
pub struct ComparisonFn<A: ValueAlgebra> {
    leaf: SparseLeaf<A>,
}

impl<A: ValueAlgebra> Clone for ComparisonFn<A> {
    fn clone(&self) -> Self {
        Self {
            leaf: self.leaf.clone(),
        }
    }
}

impl<A: ValueAlgebra> PartialEq for ComparisonFn<A> {
    fn eq(&self, other: &Self) -> bool {
        self.leaf == other.leaf
    }
}

impl<A: ValueAlgebra> ComparisonFn<A> {
    /// Builds a comparison function from raw records and declared counts.
    ///
    /// Records may arrive in any order; duplicates, out-of-range indices,
    /// stored nulls, and capacity overflows are all rejected.
    pub fn new(units: usize, series: usize, mut records: Vec<Record<A::Value>>) -> Result<Self, ConstructionError> {
        let domain = Domain::new(Dim::new(2), units, series).ok_or(ConstructionError::CapacityOverflow {
            what: "comparison rows or words",
            units,
            series,
        })?;

        for rec in &records {
            if rec.left >= units {
                return Err(ConstructionError::UnitOutOfRange { index: rec.left, units });
            }
            if rec.right >= units {
                return Err(ConstructionError::UnitOutOfRange { index: rec.right, units });
            }
            if rec.series >= series {
                return Err(ConstructionError::SeriesOutOfRange { index: rec.series, series });
            }
            if A::is_null(&rec.value) {
                return Err(ConstructionError::NullValue {
                    left: rec.left,
                    right: rec.right,
                    series: rec.series,
                });
            }
        }

        records.sort_by_key(|rec| (rec.series, rec.left, rec.right));
        for pair in records.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if (a.series, a.left, a.right) == (b.series, b.left, b.right) {
                return Err(ConstructionError::DuplicateRecord {
                    left: a.left,
                    right: a.right,
                    series: a.series,
                });
            }
        }

        debug!("building comparison function: {} units, {} series, {} records", units, series, records.len());
        let mut builder = SparseBuilder::new(domain);
        for rec in records {
            builder.push(rec.series * units + rec.left, rec.right, rec.value);
        }
        Ok(Self { leaf: builder.finish() })
    }

    pub fn units(&self) -> usize {
        self.leaf.domain().units()
    }

    pub fn series(&self) -> usize {
        self.leaf.domain().series()
    }

    pub fn leaf(&self) -> &SparseLeaf<A> {
        &self.leaf
    }

    /// This comparison function as a 2-dimensional unit function.
    pub fn to_unit_fn(&self) -> UnitFn<A> {
        UnitFn::from_sparse(self.leaf.clone())
    }

    /// Bounds-checked lookup.
    pub fn get(&self, left: Unit, right: Unit, series: Series) -> Option<A::Value> {
        if left.index() >= self.units() || right.index() >= self.units() || series.index() >= self.series() {
            return None;
        }
        Some(self.get_unchecked(left, right, series))
    }

    /// Unchecked lookup; indices must be in range.
    pub fn get_unchecked(&self, left: Unit, right: Unit, series: Series) -> A::Value {
        let row = self.row(left, series);
        if self.leaf.bits().test(row, right.index()) {
            self.leaf.value_at(row, right.index()).clone()
        } else {
            A::null()
        }
    }

    #[inline]
    fn row(&self, left: Unit, series: Series) -> usize {
        series.index() * self.units() + left.index()
    }

    /// Existence: a stored (non-null) comparison for the tuple.
    ///
    /// Like [`get_unchecked`][Self::get_unchecked], indices are taken on
    /// trust; an out-of-range unit or series panics. Use
    /// [`get`][Self::get] when the input is not known to be in range.
    #[inline]
    pub fn exists(&self, left: Unit, right: Unit, series: Series) -> bool {
        self.leaf.bits().test(self.row(left, series), right.index())
    }

    /// The NUxNU 0/1 adjacency matrix of one frame, row-major. `None`
    /// when the series index is out of range.
    pub fn adjacency(&self, series: Series) -> Option<Vec<u8>> {
        if series.index() >= self.series() {
            return None;
        }
        let nu = self.units();
        let mut matrix = vec![0u8; nu * nu];
        for u in 0..nu {
            let row = series.index() * nu + u;
            for col in self.leaf.bits().iter_row(row) {
                matrix[u * nu + col] = 1;
            }
        }
        Some(matrix)
    }

    // ------------------------------------------------------------------
    // Existence-based relations. The single-tuple predicates are
    // unchecked O(1) bit tests: every index must be in range, as with
    // `exists`.
    // ------------------------------------------------------------------

    /// Reflexivity at one unit: the diagonal bit is set.
    pub fn reflexive(&self, u: Unit, series: Series) -> bool {
        self.exists(u, u, series)
    }

    /// Symmetry at one pair: both directions agree on existence.
    pub fn symmetric(&self, u: Unit, v: Unit, series: Series) -> bool {
        self.exists(u, v, series) == self.exists(v, u, series)
    }

    /// Transitivity at one triple: `E(u,v) and E(v,w)` imply `E(u,w)`.
    pub fn transitive(&self, u: Unit, v: Unit, w: Unit, series: Series) -> bool {
        !(self.exists(u, v, series) && self.exists(v, w, series)) || self.exists(u, w, series)
    }

    pub fn reflexive_subset(&self, units: &[Unit], series: Series) -> bool {
        units.iter().all(|&u| self.reflexive(u, series))
    }

    pub fn symmetric_subset(&self, units: &[Unit], series: Series) -> bool {
        units
            .iter()
            .all(|&u| units.iter().all(|&v| self.symmetric(u, v, series)))
    }

    /// Subset transitivity via masked row scans: for every edge `u -> v`
    /// inside the subset, `v`'s mask-restricted row must be contained in
    /// `u`'s. O(|subset| * wordsPerRow) per root unit instead of a cubic
    /// triple loop.
    pub fn transitive_subset(&self, units: &[Unit], series: Series) -> bool {
        let nu = self.units();
        let mask = make_mask(nu, units.iter().map(|u| u.index()));
        let mut masked_u = vec![0u32; mask.len()];
        for &u in units {
            let row_u = self.leaf.bits().row_words(self.row(u, series));
            for (dst, (w, m)) in masked_u.iter_mut().zip(row_u.iter().zip(&mask)) {
                *dst = w & m;
            }
            for v in BitCursor::new(&masked_u, nu).collect::<Vec<_>>() {
                let row_v = self.leaf.bits().row_words(self.row(Unit::new(v as u32), series));
                let ok = row_v
                    .iter()
                    .zip(&mask)
                    .zip(&masked_u)
                    .all(|((w, m), mu)| (w & m) & !mu == 0);
                if !ok {
                    return false;
                }
            }
        }
        true
    }

    pub fn reflexive_frame(&self, series: Series) -> bool {
        (0..self.units()).all(|u| self.reflexive(Unit::new(u as u32), series))
    }

    /// Frame symmetry in O(stored): every stored edge's reverse must be
    /// stored too.
    pub fn symmetric_frame(&self, series: Series) -> bool {
        let nu = self.units();
        for u in 0..nu {
            let row = series.index() * nu + u;
            for v in self.leaf.bits().iter_row(row) {
                if !self.exists(Unit::new(v as u32), Unit::new(u as u32), series) {
                    return false;
                }
            }
        }
        true
    }

    /// Frame transitivity: every successor's row must be contained in its
    /// predecessor's row. O(units * wordsPerRow) per root unit.
    pub fn transitive_frame(&self, series: Series) -> bool {
        let nu = self.units();
        for u in 0..nu {
            let row_u = self.leaf.bits().row_words(series.index() * nu + u);
            for v in BitCursor::new(row_u, nu).collect::<Vec<_>>() {
                let row_v = self.leaf.bits().row_words(series.index() * nu + v);
                if !words_subset(row_v, row_u) {
                    return false;
                }
            }
        }
        true
    }

    pub fn reflexive_fn(&self) -> bool {
        (0..self.series()).all(|s| self.reflexive_frame(Series::new(s as u32)))
    }
    pub fn symmetric_fn(&self) -> bool {
        (0..self.series()).all(|s| self.symmetric_frame(Series::new(s as u32)))
    }
    pub fn transitive_fn(&self) -> bool {
        (0..self.series()).all(|s| self.transitive_frame(Series::new(s as u32)))
    }

    /// Orthogonality: reflexive, symmetric, and transitive together.
    pub fn orthogonal_subset(&self, units: &[Unit], series: Series) -> bool {
        self.reflexive_subset(units, series)
            && self.symmetric_subset(units, series)
            && self.transitive_subset(units, series)
    }

    pub fn orthogonal_frame(&self, series: Series) -> bool {
        self.reflexive_frame(series) && self.symmetric_frame(series) && self.transitive_frame(series)
    }

    pub fn orthogonal_fn(&self) -> bool {
        (0..self.series()).all(|s| self.orthogonal_frame(Series::new(s as u32)))
    }

    /// Degree of orthogonality: the fraction of all unit subsets that are
    /// orthogonal in this frame. A fully orthogonal frame short-circuits
    /// to `2^NU` subsets without any traversal; `None` when the subset
    /// count cannot be represented.
    pub fn degree_of_orthogonality(&self, series: Series) -> Option<f64> {
        let n = self.units();
        let count = count_filtered_subsets(
            n,
            || self.orthogonal_frame(series),
            |subset| {
                let units: Vec<Unit> = subset.iter().map(|&i| Unit::new(i as u32)).collect();
                self.orthogonal_subset(&units, series)
            },
        )?;
        Some(count as f64 / 2f64.powi(n as i32))
    }

    /// Lazily enumerates the orthogonal unit subsets of one frame.
    pub fn orthogonal_subsets(&self, series: Series) -> impl Iterator<Item = Vec<Unit>> + '_ {
        filtered_subsets(self.units(), move |subset: &[usize]| {
            let units: Vec<Unit> = subset.iter().map(|&i| Unit::new(i as u32)).collect();
            self.orthogonal_subset(&units, series)
        })
        .map(|subset| subset.into_iter().map(|i| Unit::new(i as u32)).collect())
    }

    /// Partitions the unit universe into classes connected by stored
    /// comparisons. Requires the frame to be orthogonal: an orthogonal
    /// comparison relation is already an equivalence relation, so one
    /// stored edge to any class representative settles membership and a
    /// single O(NU * classes) pass suffices.
    pub fn basis(&self, series: Series) -> Option<Vec<Vec<Unit>>> {
        if !self.orthogonal_frame(series) {
            return None;
        }
        let mut classes: Vec<Vec<Unit>> = Vec::new();
        for i in 0..self.units() {
            let u = Unit::new(i as u32);
            match classes.iter_mut().find(|class| self.exists(u, class[0], series)) {
                Some(class) => class.push(u),
                None => classes.push(vec![u]),
            }
        }
        Some(classes)
    }

    /// The base unit function of one unit: `v, s -> cf(u, v, s)`, a
    /// 1-dimensional sparse slice. Absent for out-of-range units.
    pub fn base(&self, u: Unit) -> Option<UnitFn<A>> {
        if u.index() >= self.units() {
            return None;
        }
        let domain = Domain::new(Dim::new(1), self.units(), self.series())?;
        let mut builder = SparseBuilder::new(domain);
        for s in 0..self.series() {
            let src = s * self.units() + u.index();
            for col in self.leaf.bits().iter_row(src) {
                builder.push(s, col, self.leaf.value_at(src, col).clone());
            }
        }
        Some(UnitFn::from_sparse(builder.finish()))
    }

    // ------------------------------------------------------------------
    // Value-based relations: numeric error against the ideal identity or
    // composition, via the algebra's metric. Tuples whose operands do not
    // all exist are not relevant and report `None`; aggregates take the
    // maximum over relevant tuples and are 0 when vacuous.
    // ------------------------------------------------------------------

    /// Distance of the diagonal value from the identity.
    pub fn reflexivity_error(&self, u: Unit, series: Series) -> Option<f64> {
        if !self.exists(u, u, series) {
            return None;
        }
        Some(A::dist(&self.get_unchecked(u, u, series), &A::one()))
    }

    /// Distance of `cf(u,v)` from the inverse of `cf(v,u)`.
    pub fn symmetry_error(&self, u: Unit, v: Unit, series: Series) -> Option<f64> {
        if !self.exists(u, v, series) || !self.exists(v, u, series) {
            return None;
        }
        let forward = self.get_unchecked(u, v, series);
        let backward = A::inv(&self.get_unchecked(v, u, series));
        Some(A::dist(&forward, &backward))
    }

    /// Distance of the composition `cf(u,v) * cf(v,w)` from `cf(u,w)`.
    pub fn transitivity_error(&self, u: Unit, v: Unit, w: Unit, series: Series) -> Option<f64> {
        if !self.exists(u, v, series) || !self.exists(v, w, series) || !self.exists(u, w, series) {
            return None;
        }
        let composed = A::mul(&self.get_unchecked(u, v, series), &self.get_unchecked(v, w, series));
        Some(A::dist(&composed, &self.get_unchecked(u, w, series)))
    }

    pub fn reflexivity_error_subset(&self, units: &[Unit], series: Series) -> f64 {
        units
            .iter()
            .filter_map(|&u| self.reflexivity_error(u, series))
            .fold(0.0, f64::max)
    }

    pub fn symmetry_error_subset(&self, units: &[Unit], series: Series) -> f64 {
        let mut worst = 0.0f64;
        for &u in units {
            for &v in units {
                if let Some(err) = self.symmetry_error(u, v, series) {
                    worst = worst.max(err);
                }
            }
        }
        worst
    }

    pub fn transitivity_error_subset(&self, units: &[Unit], series: Series) -> f64 {
        let mut worst = 0.0f64;
        for &u in units {
            for &v in units {
                for &w in units {
                    if let Some(err) = self.transitivity_error(u, v, w, series) {
                        worst = worst.max(err);
                    }
                }
            }
        }
        worst
    }

    fn universe(&self) -> Vec<Unit> {
        (0..self.units()).map(|u| Unit::new(u as u32)).collect()
    }

    pub fn reflexivity_error_frame(&self, series: Series) -> f64 {
        self.reflexivity_error_subset(&self.universe(), series)
    }
    pub fn symmetry_error_frame(&self, series: Series) -> f64 {
        self.symmetry_error_subset(&self.universe(), series)
    }
    pub fn transitivity_error_frame(&self, series: Series) -> f64 {
        self.transitivity_error_subset(&self.universe(), series)
    }

    pub fn reflexivity_error_fn(&self) -> f64 {
        (0..self.series())
            .map(|s| self.reflexivity_error_frame(Series::new(s as u32)))
            .fold(0.0, f64::max)
    }
    pub fn symmetry_error_fn(&self) -> f64 {
        (0..self.series())
            .map(|s| self.symmetry_error_frame(Series::new(s as u32)))
            .fold(0.0, f64::max)
    }
    pub fn transitivity_error_fn(&self) -> f64 {
        (0..self.series())
            .map(|s| self.transitivity_error_frame(Series::new(s as u32)))
            .fold(0.0, f64::max)
    }

    /// Worst value-relation error of one frame, across all three families.
    pub fn orthogonality_error_frame(&self, series: Series) -> f64 {
        self.reflexivity_error_frame(series)
            .max(self.symmetry_error_frame(series))
            .max(self.transitivity_error_frame(series))
    }

    /// Worst value-relation error over the whole function.
    pub fn orthogonality_error_fn(&self) -> f64 {
        (0..self.series())
            .map(|s| self.orthogonality_error_frame(Series::new(s as u32)))
            .fold(0.0, f64::max)
    }
}

/// Presence-pattern equality of two 1-dimensional sparse base functions at
/// one frame. Absent unless both operands are 1-dimensional sparse leaves
/// over the same domain with a valid frame index.
pub fn substitutable<A: ValueAlgebra>(f: &UnitFn<A>, g: &UnitFn<A>, series: Series) -> Option<bool> {
    let (a, b) = base_pair(f, g, series)?;
    Some(a.bits().row_words(series.index()) == b.bits().row_words(series.index()))
}

/// Degree of substitution: the Jaccard index of the two presence rows at
/// one frame, accumulated per word. Two empty rows are identical and
/// report 1.
pub fn degree_of_substitution<A: ValueAlgebra>(f: &UnitFn<A>, g: &UnitFn<A>, series: Series) -> Option<f64> {
    let (a, b) = base_pair(f, g, series)?;
    let (inter, union) = words_jaccard_counts(a.bits().row_words(series.index()), b.bits().row_words(series.index()));
    if union == 0 {
        return Some(1.0);
    }
    Some(inter as f64 / union as f64)
}

fn base_pair<'a, A: ValueAlgebra>(
    f: &'a UnitFn<A>,
    g: &'a UnitFn<A>,
    series: Series,
) -> Option<(&'a SparseLeaf<A>, &'a SparseLeaf<A>)> {
    let (Some(Leaf::Sparse(a)), Some(Leaf::Sparse(b))) = (f.as_leaf(), g.as_leaf()) else {
        return None;
    };
    if a.domain().dim().get() != 1 || !a.domain().same(b.domain()) || series.index() >= a.domain().series() {
        return None;
    }
    Some((a, b))
}
