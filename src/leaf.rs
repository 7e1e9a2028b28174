//! The three physical representations of a unit function.
//!
//! A leaf stores values directly, with one of three storage strategies
//! behind a single evaluation contract:
//!
//! - [`ConstLeaf`]: one broadcast value for every tuple, O(1) space.
//! - [`DenseLeaf`]: every cell stored explicitly in row-major order.
//! - [`SparseLeaf`]: CSR + bitset; only non-null values are stored, one per
//!   set presence bit, ordered row-major then ascending column.
//!
//! # Invariants
//!
//! - A sparse leaf never stores the algebra's null: absence is always a
//!   cleared presence bit. Bits and the packed values array stay in exact
//!   1:1 correspondence, and `row_ptr[r+1] - row_ptr[r]` equals the
//!   popcount of row `r`.
//! - Leaves are immutable after construction; every transformation builds
//!   a new leaf.
//! - Equality is physical: identical kind, identical domain, bit-for-bit
//!   and value-for-value identity. Cross-kind comparison is always unequal;
//!   use [`Leaf::to_dense`] / [`Leaf::to_sparse`] to normalize kinds first.

use crate::algebra::ValueAlgebra;
use crate::bitset::Bitset;
use crate::domain::Domain;
use crate::types::{Series, Unit};

/// The storage kind of a leaf, used for dispatch in materialization.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LeafKind {
    Const,
    Dense,
    Sparse,
}

impl std::fmt::Display for LeafKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeafKind::Const => write!(f, "const"),
            LeafKind::Dense => write!(f, "dense"),
            LeafKind::Sparse => write!(f, "sparse"),
        }
    }
}

/// A broadcast leaf: the same value for every in-range tuple.
#[derive(Debug)]
pub struct ConstLeaf<A: ValueAlgebra> {
    domain: Domain,
    value: A::Value,
}

// Manual impls: deriving would add an implicit `A: Clone`/`A: PartialEq`
// bound, but only `A::Value` is stored.
impl<A: ValueAlgebra> Clone for ConstLeaf<A> {
    fn clone(&self) -> Self {
        Self {
            domain: self.domain.clone(),
            value: self.value.clone(),
        }
    }
}

impl<A: ValueAlgebra> PartialEq for ConstLeaf<A> {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain && self.value == other.value
    }
}

impl<A: ValueAlgebra> ConstLeaf<A> {
    pub fn new(domain: Domain, value: A::Value) -> Self {
        Self { domain, value }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn value(&self) -> &A::Value {
        &self.value
    }
}

/// A dense leaf: every cell stored explicitly, row-major.
///
/// Unlike sparse leaves, dense storage may hold nulls in-slot; the
/// no-stored-null invariant applies to the CSR representation only.
#[derive(Debug)]
pub struct DenseLeaf<A: ValueAlgebra> {
    domain: Domain,
    values: Vec<A::Value>,
}

impl<A: ValueAlgebra> Clone for DenseLeaf<A> {
    fn clone(&self) -> Self {
        Self {
            domain: self.domain.clone(),
            values: self.values.clone(),
        }
    }
}

impl<A: ValueAlgebra> PartialEq for DenseLeaf<A> {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain && self.values == other.values
    }
}

impl<A: ValueAlgebra> DenseLeaf<A> {
    /// # Panics
    ///
    /// Panics if `values.len() != domain.dense_len()`.
    pub fn new(domain: Domain, values: Vec<A::Value>) -> Self {
        assert_eq!(values.len(), domain.dense_len(), "Dense leaf size mismatch");
        Self { domain, values }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn values(&self) -> &[A::Value] {
        &self.values
    }
}

/// A sparse leaf: presence bitset + CSR row pointers + packed values.
#[derive(Debug)]
pub struct SparseLeaf<A: ValueAlgebra> {
    domain: Domain,
    bits: Bitset,
    row_ptr: Vec<u32>,
    values: Vec<A::Value>,
}

impl<A: ValueAlgebra> Clone for SparseLeaf<A> {
    fn clone(&self) -> Self {
        Self {
            domain: self.domain.clone(),
            bits: self.bits.clone(),
            row_ptr: self.row_ptr.clone(),
            values: self.values.clone(),
        }
    }
}

impl<A: ValueAlgebra> PartialEq for SparseLeaf<A> {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
            && self.bits == other.bits
            && self.row_ptr == other.row_ptr
            && self.values == other.values
    }
}

impl<A: ValueAlgebra> SparseLeaf<A> {
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn bits(&self) -> &Bitset {
        &self.bits
    }

    pub fn row_ptr(&self) -> &[u32] {
        &self.row_ptr
    }

    pub fn values(&self) -> &[A::Value] {
        &self.values
    }

    /// Number of stored (non-null) values.
    pub fn stored(&self) -> usize {
        self.values.len()
    }

    /// The value at a set bit, addressed by row and column.
    ///
    /// The caller must have checked the bit; this resolves the CSR slot via
    /// the row pointer plus the within-row rank.
    #[inline]
    pub fn value_at(&self, row: usize, col: usize) -> &A::Value {
        debug_assert!(self.bits.test(row, col));
        &self.values[self.row_ptr[row] as usize + self.bits.rank(row, col)]
    }
}

/// Incremental row-major builder for sparse leaves.
///
/// Entries must be pushed in strictly ascending (row, col) order and must
/// be non-null; both are enforced, keeping the CSR invariants true by
/// construction.
pub struct SparseBuilder<A: ValueAlgebra> {
    domain: Domain,
    bits: Bitset,
    values: Vec<A::Value>,
    last: Option<(usize, usize)>,
}

impl<A: ValueAlgebra> SparseBuilder<A> {
    /// # Panics
    ///
    /// Panics if the domain has dimension 0: a sparse leaf needs a trailing
    /// unit coordinate for its columns.
    pub fn new(domain: Domain) -> Self {
        assert!(domain.dim().get() >= 1, "Sparse leaves require dim >= 1");
        let bits = Bitset::new(domain.rows(), domain.units());
        Self {
            domain,
            bits,
            values: Vec::new(),
            last: None,
        }
    }

    /// Appends one non-null value at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics on null values or out-of-order pushes.
    pub fn push(&mut self, row: usize, col: usize, value: A::Value) {
        assert!(A::is_value(&value), "Sparse leaves never store null");
        if let Some(last) = self.last {
            assert!((row, col) > last, "Sparse entries must be pushed row-major");
        }
        self.bits.set(row, col);
        self.values.push(value);
        self.last = Some((row, col));
    }

    pub fn finish(self) -> SparseLeaf<A> {
        let rows = self.domain.rows();
        let mut row_ptr = Vec::with_capacity(rows + 1);
        let mut total = 0u32;
        row_ptr.push(0);
        for row in 0..rows {
            total += self.bits.row_popcount(row) as u32;
            row_ptr.push(total);
        }
        debug_assert_eq!(total as usize, self.values.len());
        SparseLeaf {
            domain: self.domain,
            bits: self.bits,
            row_ptr,
            values: self.values,
        }
    }
}

/// A physical unit-function representation.
#[derive(Debug)]
pub enum Leaf<A: ValueAlgebra> {
    Const(ConstLeaf<A>),
    Dense(DenseLeaf<A>),
    Sparse(SparseLeaf<A>),
}

impl<A: ValueAlgebra> Clone for Leaf<A> {
    fn clone(&self) -> Self {
        match self {
            Leaf::Const(l) => Leaf::Const(l.clone()),
            Leaf::Dense(l) => Leaf::Dense(l.clone()),
            Leaf::Sparse(l) => Leaf::Sparse(l.clone()),
        }
    }
}

impl<A: ValueAlgebra> PartialEq for Leaf<A> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Leaf::Const(a), Leaf::Const(b)) => a == b,
            (Leaf::Dense(a), Leaf::Dense(b)) => a == b,
            (Leaf::Sparse(a), Leaf::Sparse(b)) => a == b,
            _ => false,
        }
    }
}

impl<A: ValueAlgebra> Leaf<A> {
    pub fn constant(domain: Domain, value: A::Value) -> Self {
        Leaf::Const(ConstLeaf::new(domain, value))
    }

    pub fn dense(domain: Domain, values: Vec<A::Value>) -> Self {
        Leaf::Dense(DenseLeaf::new(domain, values))
    }

    pub fn kind(&self) -> LeafKind {
        match self {
            Leaf::Const(_) => LeafKind::Const,
            Leaf::Dense(_) => LeafKind::Dense,
            Leaf::Sparse(_) => LeafKind::Sparse,
        }
    }

    pub fn domain(&self) -> &Domain {
        match self {
            Leaf::Const(l) => l.domain(),
            Leaf::Dense(l) => l.domain(),
            Leaf::Sparse(l) => l.domain(),
        }
    }

    /// Unchecked evaluation. The tuple must have the domain's arity and
    /// every index must be in range; violations panic or return garbage.
    pub fn get_unchecked(&self, tuple: &[Unit], series: Series) -> A::Value {
        match self {
            Leaf::Const(l) => l.value.clone(),
            Leaf::Dense(l) => l.values[l.domain.dense_index(tuple, series)].clone(),
            Leaf::Sparse(l) => {
                let row = l.domain.row_of(tuple, series);
                let col = l.domain.col_of(tuple);
                if l.bits.test(row, col) {
                    l.value_at(row, col).clone()
                } else {
                    // The values array is never touched for a cleared bit.
                    A::null()
                }
            }
        }
    }

    /// Bounds-checked evaluation: `None` (absent) for any arity or range
    /// violation, otherwise the stored value (possibly the algebra's null).
    pub fn get(&self, tuple: &[Unit], series: Series) -> Option<A::Value> {
        if !self.domain().in_range(tuple, series) {
            return None;
        }
        Some(self.get_unchecked(tuple, series))
    }

    /// Existence: true when the tuple is in range and its value is not null.
    pub fn exists(&self, tuple: &[Unit], series: Series) -> bool {
        match self.get(tuple, series) {
            Some(v) => A::is_value(&v),
            None => false,
        }
    }

    /// Fraction of cells holding a proper (non-null) value. Advisory only;
    /// nothing in the engine switches representations on its own.
    pub fn density(&self) -> f64 {
        match self {
            Leaf::Const(l) => {
                if A::is_null(&l.value) {
                    0.0
                } else {
                    1.0
                }
            }
            Leaf::Dense(l) => {
                let non_null = l.values.iter().filter(|v| A::is_value(v)).count();
                non_null as f64 / l.values.len() as f64
            }
            Leaf::Sparse(l) => l.stored() as f64 / l.domain.dense_len() as f64,
        }
    }

    /// Converts any leaf to dense storage with identical values.
    pub fn to_dense(&self) -> DenseLeaf<A> {
        match self {
            Leaf::Const(l) => {
                let values = vec![l.value.clone(); l.domain.dense_len()];
                DenseLeaf::new(l.domain.clone(), values)
            }
            Leaf::Dense(l) => l.clone(),
            Leaf::Sparse(l) => {
                let mut values = Vec::with_capacity(l.domain.dense_len());
                for row in 0..l.domain.rows() {
                    let mut next = 0usize;
                    for col in l.bits.iter_row(row) {
                        for _ in next..col {
                            values.push(A::null());
                        }
                        values.push(l.value_at(row, col).clone());
                        next = col + 1;
                    }
                    for _ in next..l.domain.units() {
                        values.push(A::null());
                    }
                }
                DenseLeaf::new(l.domain.clone(), values)
            }
        }
    }

    /// Converts any leaf to sparse storage with identical values, dropping
    /// null cells. `None` for 0-dimensional domains, which sparse storage
    /// cannot represent.
    pub fn to_sparse(&self) -> Option<SparseLeaf<A>> {
        let domain = self.domain();
        if domain.dim().get() == 0 {
            return None;
        }
        let mut builder = SparseBuilder::new(domain.clone());
        match self {
            Leaf::Const(l) => {
                if A::is_value(&l.value) {
                    for row in 0..domain.rows() {
                        for col in 0..domain.units() {
                            builder.push(row, col, l.value.clone());
                        }
                    }
                }
            }
            Leaf::Dense(l) => {
                let units = domain.units();
                for (i, v) in l.values.iter().enumerate() {
                    if A::is_value(v) {
                        builder.push(i / units, i % units, v.clone());
                    }
                }
            }
            Leaf::Sparse(l) => {
                for row in 0..domain.rows() {
                    for col in l.bits.iter_row(row) {
                        builder.push(row, col, l.value_at(row, col).clone());
                    }
                }
            }
        }
        Some(builder.finish())
    }
}
