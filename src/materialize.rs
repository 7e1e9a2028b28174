//! Materialization: flattening expression trees into single leaves.
//!
//! `materialize` recursively converts any [`UnitFn`] into one physical
//! [`Leaf`] with bit-for-bit identical values. Leaves materialize to
//! themselves. Binary nodes materialize their children first and then
//! dispatch on the ordered pair of leaf kinds: each (Const/Dense/Sparse) x
//! (Const/Dense/Sparse) combination has its own iteration and allocation
//! shape. Pow/root nodes apply the scalar operation element-wise to the
//! materialized base.
//!
//! Every case preserves the storage invariants: values that become null
//! never set a presence bit and are never appended to a CSR values array,
//! and row pointers stay monotone. Capacity was pre-checked in arbitrary
//! precision when the result domain was formed, so the fixed-width loops
//! below cannot overflow their index space.
//!
//! The source tree is never mutated; materialization is idempotent.

use log::debug;

use crate::algebra::ValueAlgebra;
use crate::bitset::{OrScan, OrSide};
use crate::domain::Domain;
use crate::expr::{ArithOp, Expr, Orientation, UnitFn};
use crate::leaf::{ConstLeaf, Leaf, SparseBuilder, SparseLeaf};
use crate::types::Series;

impl<A: ValueAlgebra> UnitFn<A> {
    /// Flattens this expression tree into a single leaf, or `None` when a
    /// result domain cannot be formed (capacity overflow).
    pub fn materialize(&self) -> Option<Leaf<A>> {
        match self.expr() {
            Expr::Leaf(leaf) => Some(leaf.clone()),
            Expr::Arith { left, right, op, orientation } => {
                let ml = left.materialize()?;
                let mr = right.materialize()?;
                let (a, b) = match orientation {
                    Orientation::Left => (&ml, &mr),
                    Orientation::Right => (&mr, &ml),
                };
                Some(arith_leaves::<A>(a, b, *op))
            }
            Expr::Tensor { left, right, orientation, domain } => {
                let ml = left.materialize()?;
                let mr = right.materialize()?;
                let (a, b) = match orientation {
                    Orientation::Left => (&ml, &mr),
                    Orientation::Right => (&mr, &ml),
                };
                Some(tensor_leaves::<A>(a, b, domain))
            }
            Expr::PowInt { base, exp } => {
                let exp = *exp;
                Some(map_leaf::<A>(&base.materialize()?, |v| A::pow_int(v, exp)))
            }
            Expr::PowReal { base, exp } => {
                let exp = *exp;
                Some(map_leaf::<A>(&base.materialize()?, |v| A::pow_real(v, exp)))
            }
            Expr::NthRoot { base, exp } => {
                let exp = *exp;
                Some(map_leaf::<A>(&base.materialize()?, |v| A::nth_root(v, exp)))
            }
        }
    }
}

/// Element-wise arithmetic over two leaves with identical domains.
fn arith_leaves<A: ValueAlgebra>(a: &Leaf<A>, b: &Leaf<A>, op: ArithOp) -> Leaf<A> {
    debug!("arith {:?}: {} x {}", op, a.kind(), b.kind());
    debug_assert!(a.domain().same(b.domain()));
    let domain = a.domain().clone();

    match (a, b) {
        (Leaf::Const(x), Leaf::Const(y)) => Leaf::constant(domain, op.apply::<A>(x.value(), y.value())),

        (Leaf::Const(x), Leaf::Dense(y)) => {
            let values = y.values().iter().map(|v| op.apply::<A>(x.value(), v)).collect();
            Leaf::dense(domain, values)
        }
        (Leaf::Dense(x), Leaf::Const(y)) => {
            let values = x.values().iter().map(|v| op.apply::<A>(v, y.value())).collect();
            Leaf::dense(domain, values)
        }
        (Leaf::Dense(x), Leaf::Dense(y)) => {
            let values = x.values().iter().zip(y.values()).map(|(v, w)| op.apply::<A>(v, w)).collect();
            Leaf::dense(domain, values)
        }

        (Leaf::Const(x), Leaf::Sparse(y)) => {
            // Cells without a stored value combine the constant with null.
            let off = op.apply::<A>(x.value(), &A::null());
            if A::is_null(&off) {
                debug!("arith const x sparse: off-bit cells stay null, keeping sparse");
                let mut bld = SparseBuilder::new(domain);
                for row in 0..y.domain().rows() {
                    for col in y.bits().iter_row(row) {
                        let v = op.apply::<A>(x.value(), y.value_at(row, col));
                        if A::is_value(&v) {
                            bld.push(row, col, v);
                        }
                    }
                }
                Leaf::Sparse(bld.finish())
            } else {
                debug!("arith const x sparse: off-bit cells become proper values, going dense");
                sparse_against_const::<A>(y, &domain, &off, |v| op.apply::<A>(x.value(), v))
            }
        }
        (Leaf::Sparse(x), Leaf::Const(y)) => {
            let off = op.apply::<A>(&A::null(), y.value());
            if A::is_null(&off) {
                debug!("arith sparse x const: off-bit cells stay null, keeping sparse");
                let mut bld = SparseBuilder::new(domain);
                for row in 0..x.domain().rows() {
                    for col in x.bits().iter_row(row) {
                        let v = op.apply::<A>(x.value_at(row, col), y.value());
                        if A::is_value(&v) {
                            bld.push(row, col, v);
                        }
                    }
                }
                Leaf::Sparse(bld.finish())
            } else {
                debug!("arith sparse x const: off-bit cells become proper values, going dense");
                sparse_against_const::<A>(x, &domain, &off, |v| op.apply::<A>(v, y.value()))
            }
        }

        (Leaf::Dense(x), Leaf::Sparse(y)) => {
            // Dense output: every column of each sparse row is visited.
            let units = domain.units();
            let mut values = Vec::with_capacity(domain.dense_len());
            for row in 0..y.domain().rows() {
                for col in 0..units {
                    let w = if y.bits().test(row, col) {
                        y.value_at(row, col).clone()
                    } else {
                        A::null()
                    };
                    values.push(op.apply::<A>(&x.values()[row * units + col], &w));
                }
            }
            Leaf::dense(domain, values)
        }
        (Leaf::Sparse(x), Leaf::Dense(y)) => {
            let units = domain.units();
            let mut values = Vec::with_capacity(domain.dense_len());
            for row in 0..x.domain().rows() {
                for col in 0..units {
                    let v = if x.bits().test(row, col) {
                        x.value_at(row, col).clone()
                    } else {
                        A::null()
                    };
                    values.push(op.apply::<A>(&v, &y.values()[row * units + col]));
                }
            }
            Leaf::dense(domain, values)
        }

        (Leaf::Sparse(x), Leaf::Sparse(y)) => {
            // Merge-scan both presence rows; no row arrays are allocated.
            let mut bld = SparseBuilder::new(domain.clone());
            for row in 0..domain.rows() {
                let scan = OrScan::new(x.bits().row_words(row), y.bits().row_words(row), domain.units());
                for (col, side) in scan {
                    let v = match side {
                        OrSide::Both => op.apply::<A>(x.value_at(row, col), y.value_at(row, col)),
                        OrSide::Left => op.apply::<A>(x.value_at(row, col), &A::null()),
                        OrSide::Right => op.apply::<A>(&A::null(), y.value_at(row, col)),
                    };
                    if A::is_value(&v) {
                        bld.push(row, col, v);
                    }
                }
            }
            Leaf::Sparse(bld.finish())
        }
    }
}

/// Dense fallback for sparse-vs-const arithmetic whose off-bit result is a
/// proper value: stored cells map through `on`, cleared cells take `off`.
fn sparse_against_const<A: ValueAlgebra>(
    sparse: &SparseLeaf<A>,
    domain: &Domain,
    off: &A::Value,
    on: impl Fn(&A::Value) -> A::Value,
) -> Leaf<A> {
    let units = domain.units();
    let mut values = Vec::with_capacity(domain.dense_len());
    for row in 0..domain.rows() {
        for col in 0..units {
            if sparse.bits().test(row, col) {
                values.push(on(sparse.value_at(row, col)));
            } else {
                values.push(off.clone());
            }
        }
    }
    Leaf::dense(domain.clone(), values)
}

/// Left-operand flat tuple index of a stored sparse bit, within one series
/// block: `(row - series_base) * units + col`.
#[inline]
fn block_index(domain: &Domain, series_base: usize, row: usize, col: usize) -> usize {
    (row - series_base) * domain.units() + col
}

/// Tensor product of two leaves into `domain` (already capacity-checked).
fn tensor_leaves<A: ValueAlgebra>(a: &Leaf<A>, b: &Leaf<A>, domain: &Domain) -> Leaf<A> {
    debug!("tensor: {} x {}", a.kind(), b.kind());
    let nu = domain.units();
    let ns = domain.series();
    let block_l = a.domain().pow(a.domain().dim().get());
    let block_r = b.domain().pow(b.domain().dim().get());

    match (a, b) {
        (Leaf::Const(x), Leaf::Const(y)) => Leaf::constant(domain.clone(), A::mul(x.value(), y.value())),

        (Leaf::Const(x), Leaf::Dense(y)) => {
            let mut values = Vec::with_capacity(domain.dense_len());
            for s in 0..ns {
                for _il in 0..block_l {
                    for ir in 0..block_r {
                        values.push(A::mul(x.value(), &y.values()[s * block_r + ir]));
                    }
                }
            }
            Leaf::dense(domain.clone(), values)
        }
        (Leaf::Dense(x), Leaf::Const(y)) => {
            let mut values = Vec::with_capacity(domain.dense_len());
            for s in 0..ns {
                for il in 0..block_l {
                    let v = &x.values()[s * block_l + il];
                    for _ir in 0..block_r {
                        values.push(A::mul(v, y.value()));
                    }
                }
            }
            Leaf::dense(domain.clone(), values)
        }
        (Leaf::Dense(x), Leaf::Dense(y)) => {
            let mut values = Vec::with_capacity(domain.dense_len());
            for s in 0..ns {
                for il in 0..block_l {
                    let v = &x.values()[s * block_l + il];
                    for ir in 0..block_r {
                        values.push(A::mul(v, &y.values()[s * block_r + ir]));
                    }
                }
            }
            Leaf::dense(domain.clone(), values)
        }

        (Leaf::Const(x), Leaf::Sparse(y)) => tensor_const_sparse::<A>(x, y, domain, block_l, block_r),
        (Leaf::Sparse(x), Leaf::Const(y)) => tensor_sparse_const::<A>(x, y, domain, block_l, block_r),

        (Leaf::Dense(x), Leaf::Sparse(y)) => {
            // Dense output: the sparse side is probed per column.
            let mut values = Vec::with_capacity(domain.dense_len());
            for s in 0..ns {
                let base_r = y.domain().series_rows(Series::new(s as u32)).start;
                for il in 0..block_l {
                    let v = &x.values()[s * block_l + il];
                    for ir in 0..block_r {
                        let (rrow, rcol) = (base_r + ir / nu, ir % nu);
                        let w = if y.bits().test(rrow, rcol) {
                            y.value_at(rrow, rcol).clone()
                        } else {
                            A::null()
                        };
                        values.push(A::mul(v, &w));
                    }
                }
            }
            Leaf::dense(domain.clone(), values)
        }
        (Leaf::Sparse(x), Leaf::Dense(y)) => {
            let mut values = Vec::with_capacity(domain.dense_len());
            for s in 0..ns {
                let base_l = x.domain().series_rows(Series::new(s as u32)).start;
                for il in 0..block_l {
                    let (lrow, lcol) = (base_l + il / nu, il % nu);
                    let v = if x.bits().test(lrow, lcol) {
                        x.value_at(lrow, lcol).clone()
                    } else {
                        A::null()
                    };
                    for ir in 0..block_r {
                        values.push(A::mul(&v, &y.values()[s * block_r + ir]));
                    }
                }
            }
            Leaf::dense(domain.clone(), values)
        }

        (Leaf::Sparse(x), Leaf::Sparse(y)) => {
            // Sparse output over NS * NU^(dimL + dimR - 1) rows: stored left
            // tuples cross stored right tuples, row-major by construction.
            let mut bld = SparseBuilder::new(domain.clone());
            for s in 0..ns {
                let rows_l = x.domain().series_rows(Series::new(s as u32));
                let rows_r = y.domain().series_rows(Series::new(s as u32));
                let base_l = rows_l.start;
                let base_r = rows_r.start;
                for lrow in rows_l {
                    for lcol in x.bits().iter_row(lrow) {
                        let il = block_index(x.domain(), base_l, lrow, lcol);
                        let v = x.value_at(lrow, lcol);
                        for rrow in rows_r.clone() {
                            for rcol in y.bits().iter_row(rrow) {
                                let ir = block_index(y.domain(), base_r, rrow, rcol);
                                let w = A::mul(v, y.value_at(rrow, rcol));
                                if A::is_value(&w) {
                                    let flat = (s * block_l + il) * block_r + ir;
                                    bld.push(flat / nu, flat % nu, w);
                                }
                            }
                        }
                    }
                }
            }
            Leaf::Sparse(bld.finish())
        }
    }
}

fn tensor_const_sparse<A: ValueAlgebra>(
    x: &ConstLeaf<A>,
    y: &SparseLeaf<A>,
    domain: &Domain,
    block_l: usize,
    block_r: usize,
) -> Leaf<A> {
    let nu = domain.units();
    let mut bld = SparseBuilder::new(domain.clone());
    if A::is_value(x.value()) {
        for s in 0..domain.series() {
            let rows_r = y.domain().series_rows(Series::new(s as u32));
            let base_r = rows_r.start;
            for il in 0..block_l {
                for rrow in rows_r.clone() {
                    for rcol in y.bits().iter_row(rrow) {
                        let ir = block_index(y.domain(), base_r, rrow, rcol);
                        let w = A::mul(x.value(), y.value_at(rrow, rcol));
                        if A::is_value(&w) {
                            let flat = (s * block_l + il) * block_r + ir;
                            bld.push(flat / nu, flat % nu, w);
                        }
                    }
                }
            }
        }
    }
    Leaf::Sparse(bld.finish())
}

fn tensor_sparse_const<A: ValueAlgebra>(
    x: &SparseLeaf<A>,
    y: &ConstLeaf<A>,
    domain: &Domain,
    block_l: usize,
    block_r: usize,
) -> Leaf<A> {
    let nu = domain.units();
    let mut bld = SparseBuilder::new(domain.clone());
    if A::is_value(y.value()) {
        for s in 0..domain.series() {
            let rows_l = x.domain().series_rows(Series::new(s as u32));
            let base_l = rows_l.start;
            for lrow in rows_l {
                for lcol in x.bits().iter_row(lrow) {
                    let il = block_index(x.domain(), base_l, lrow, lcol);
                    let v = x.value_at(lrow, lcol);
                    for ir in 0..block_r {
                        let w = A::mul(v, y.value());
                        if A::is_value(&w) {
                            let flat = (s * block_l + il) * block_r + ir;
                            bld.push(flat / nu, flat % nu, w);
                        }
                    }
                }
            }
        }
    }
    Leaf::Sparse(bld.finish())
}

/// Element-wise scalar map of a single leaf: sparse entries that become
/// null are dropped; dense and const slots keep a null-like value in-place.
fn map_leaf<A: ValueAlgebra>(leaf: &Leaf<A>, f: impl Fn(&A::Value) -> A::Value) -> Leaf<A> {
    match leaf {
        Leaf::Const(x) => Leaf::constant(x.domain().clone(), f(x.value())),
        Leaf::Dense(x) => {
            let values = x.values().iter().map(&f).collect();
            Leaf::dense(x.domain().clone(), values)
        }
        Leaf::Sparse(x) => {
            let mut bld = SparseBuilder::new(x.domain().clone());
            for row in 0..x.domain().rows() {
                for col in x.bits().iter_row(row) {
                    let v = f(x.value_at(row, col));
                    if A::is_value(&v) {
                        bld.push(row, col, v);
                    }
                }
            }
            Leaf::Sparse(bld.finish())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::{Interval, IntervalAlgebra};
    use crate::types::{Dim, Unit};

    type A = IntervalAlgebra;
    type F = UnitFn<IntervalAlgebra>;

    fn dom(dim: u8, units: usize, series: usize) -> Domain {
        Domain::new(Dim::new(dim), units, series).unwrap()
    }

    fn u(i: u32) -> Unit {
        Unit::new(i)
    }
    fn s(i: u32) -> Series {
        Series::new(i)
    }

    /// Exhaustively compares a tree against its materialization.
    fn assert_same_values(tree: &F, leaf: &Leaf<A>) {
        let d = tree.domain().clone();
        assert_eq!(&d, leaf.domain());
        let mut tuple = vec![Unit::new(0); d.dim().get()];
        let cells = d.pow(d.dim().get());
        for si in 0..d.series() {
            for flat in 0..cells {
                let mut rest = flat;
                for i in (0..d.dim().get()).rev() {
                    tuple[i] = Unit::new((rest % d.units()) as u32);
                    rest /= d.units();
                }
                let sv = Series::new(si as u32);
                assert_eq!(
                    tree.get_unchecked(&tuple, sv),
                    leaf.get_unchecked(&tuple, sv),
                    "mismatch at {:?} s{}",
                    tuple,
                    si
                );
            }
        }
    }

    fn sparse_fn(entries: &[(usize, usize, f64)], units: usize, series: usize) -> F {
        let mut b = SparseBuilder::<A>::new(dom(1, units, series));
        for &(row, col, v) in entries {
            b.push(row, col, Interval::point(v));
        }
        F::from_sparse(b.finish())
    }

    #[test]
    fn test_leaf_materializes_to_itself() {
        let f = sparse_fn(&[(0, 0, 2.0), (0, 2, 3.0)], 3, 1);
        let m = f.materialize().unwrap();
        assert_eq!(Some(&m), f.as_leaf());
    }

    #[test]
    fn test_idempotent() {
        let f = sparse_fn(&[(0, 0, 2.0), (0, 2, 3.0)], 3, 1);
        let g = f.add(&f).unwrap();
        let once = g.materialize().unwrap();
        let twice = F::from_leaf(once.clone()).materialize().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sparse_sparse_arith() {
        let f = sparse_fn(&[(0, 0, 2.0), (0, 2, 3.0)], 4, 1);
        let g = sparse_fn(&[(0, 2, 5.0), (0, 3, 7.0)], 4, 1);
        let sum = f.add(&g).unwrap();
        let m = sum.materialize().unwrap();
        assert_eq!(m.kind(), crate::leaf::LeafKind::Sparse);
        assert_same_values(&sum, &m);
        // Only the common column survives: null absorbs one-sided cells.
        assert_eq!(m.get(&[u(2)], s(0)), Some(Interval::point(8.0)));
        assert_eq!(m.get(&[u(0)], s(0)), Some(Interval::Null));
        assert_eq!(m.get(&[u(3)], s(0)), Some(Interval::Null));
    }

    #[test]
    fn test_const_sparse_arith_keeps_sparse() {
        let f = sparse_fn(&[(0, 1, 2.0), (1, 0, 4.0)], 2, 2);
        let c = F::constant(dom(1, 2, 2), Interval::point(3.0));
        let prod = c.mul(&f).unwrap();
        let m = prod.materialize().unwrap();
        assert_eq!(m.kind(), crate::leaf::LeafKind::Sparse);
        assert_same_values(&prod, &m);
        assert_eq!(m.get(&[u(1)], s(0)), Some(Interval::point(6.0)));
    }

    #[test]
    fn test_dense_sparse_arith_goes_dense() {
        let f = sparse_fn(&[(0, 1, 2.0)], 2, 1);
        let dense = F::from_leaf(Leaf::dense(
            dom(1, 2, 1),
            vec![Interval::point(1.0), Interval::point(5.0)],
        ));
        let sum = dense.add(&f).unwrap();
        let m = sum.materialize().unwrap();
        assert_eq!(m.kind(), crate::leaf::LeafKind::Dense);
        assert_same_values(&sum, &m);
        assert_eq!(m.get(&[u(1)], s(0)), Some(Interval::point(7.0)));
        assert_eq!(m.get(&[u(0)], s(0)), Some(Interval::Null));
    }

    #[test]
    fn test_arith_drops_entries_becoming_null() {
        // Division by a zero-crossing interval nulls that cell.
        let f = sparse_fn(&[(0, 0, 6.0), (0, 1, 8.0)], 2, 1);
        let mut b = SparseBuilder::<A>::new(dom(1, 2, 1));
        b.push(0, 0, Interval::point(3.0));
        b.push(0, 1, Interval::new(-1.0, 1.0));
        let g = F::from_sparse(b.finish());
        let m = f.div(&g).unwrap().materialize().unwrap();
        match &m {
            Leaf::Sparse(sp) => {
                assert_eq!(sp.stored(), 1);
                assert!(sp.bits().test(0, 0));
                assert!(!sp.bits().test(0, 1));
            }
            other => panic!("expected sparse, got {}", other.kind()),
        }
        assert_eq!(m.get(&[u(0)], s(0)), Some(Interval::point(2.0)));
    }

    #[test]
    fn test_tensor_sparse_sparse() {
        let f = sparse_fn(&[(0, 0, 2.0), (0, 2, 3.0), (1, 1, 4.0)], 3, 2);
        let g = sparse_fn(&[(0, 1, 5.0), (1, 0, 6.0), (1, 2, 7.0)], 3, 2);
        let t = f.tmul(&g).unwrap();
        let m = t.materialize().unwrap();
        assert_eq!(m.kind(), crate::leaf::LeafKind::Sparse);
        assert_eq!(m.domain().dim().get(), 2);
        assert_same_values(&t, &m);
        assert_eq!(m.get(&[u(0), u(1)], s(0)), Some(Interval::point(10.0)));
        assert_eq!(m.get(&[u(1), u(0)], s(1)), Some(Interval::point(24.0)));
        assert_eq!(m.get(&[u(0), u(0)], s(0)), Some(Interval::Null));
    }

    #[test]
    fn test_tensor_mixed_kinds() {
        let f = sparse_fn(&[(0, 0, 2.0), (0, 2, 3.0)], 3, 1);
        let c = F::constant(dom(1, 3, 1), Interval::point(10.0));
        let d = F::from_leaf(Leaf::dense(
            dom(1, 3, 1),
            vec![Interval::point(1.0), Interval::Null, Interval::point(2.0)],
        ));

        for (l, r) in [(&c, &f), (&f, &c), (&d, &f), (&f, &d), (&c, &d), (&d, &c), (&d, &d)] {
            let t = l.tmul(r).unwrap();
            let m = t.materialize().unwrap();
            assert_same_values(&t, &m);
        }
    }

    #[test]
    fn test_tensor_four_way_pipeline() {
        // (f0 (x) f1) * (f2 (x) f3) materializes to a sparse leaf matching
        // the unmaterialized tree everywhere.
        let f0 = sparse_fn(&[(0, 0, 2.0), (0, 1, 3.0)], 2, 1);
        let f1 = sparse_fn(&[(0, 0, 5.0), (0, 1, 7.0)], 2, 1);
        let f2 = sparse_fn(&[(0, 0, 1.0), (0, 1, 11.0)], 2, 1);
        let f3 = sparse_fn(&[(0, 1, 13.0)], 2, 1);

        let left = f0.tmul(&f1).unwrap();
        let right = f2.tmul(&f3).unwrap();
        let prod = left.mul(&right).unwrap();
        let m = prod.materialize().unwrap();
        assert_eq!(m.kind(), crate::leaf::LeafKind::Sparse);
        assert_same_values(&prod, &m);
        assert_eq!(m.get(&[u(1), u(1)], s(0)), Some(Interval::point(3.0 * 7.0 * 11.0 * 13.0)));
        assert_eq!(m.get(&[u(1), u(0)], s(0)), Some(Interval::Null));
    }

    #[test]
    fn test_orientation_right_materializes() {
        let f = sparse_fn(&[(0, 0, 2.0), (0, 1, 4.0)], 2, 1);
        let i = f.inv();
        let m = i.materialize().unwrap();
        assert_same_values(&i, &m);
        assert_eq!(m.get(&[u(1)], s(0)), Some(Interval::point(0.25)));
        let n = f.neg();
        let m = n.materialize().unwrap();
        assert_same_values(&n, &m);
        assert_eq!(m.get(&[u(0)], s(0)), Some(Interval::point(-2.0)));
    }

    #[test]
    fn test_pow_root_materialize() {
        let f = sparse_fn(&[(0, 0, 4.0), (0, 1, 9.0)], 3, 1);
        let m = f.pow_int(2).materialize().unwrap();
        assert_eq!(m.get(&[u(1)], s(0)), Some(Interval::point(81.0)));
        let r = f.nth_root(2).unwrap().materialize().unwrap();
        assert_eq!(r.get(&[u(0)], s(0)), Some(Interval::point(2.0)));
        assert_eq!(r.get(&[u(2)], s(0)), Some(Interval::Null));

        // Entries whose root is undefined get dropped from the bitset.
        let mut b = SparseBuilder::<A>::new(dom(1, 2, 1));
        b.push(0, 0, Interval::point(4.0));
        b.push(0, 1, Interval::point(-4.0));
        let g = F::from_sparse(b.finish());
        let m = g.nth_root(2).unwrap().materialize().unwrap();
        match &m {
            Leaf::Sparse(sp) => assert_eq!(sp.stored(), 1),
            other => panic!("expected sparse, got {}", other.kind()),
        }
    }

    #[test]
    fn test_pow_real_materialize() {
        let f = sparse_fn(&[(0, 0, 4.0), (0, 1, 9.0)], 3, 1);
        let g = f.pow(0.5);
        let m = g.materialize().unwrap();
        assert_same_values(&g, &m);
        assert_eq!(m.get(&[u(1)], s(0)), Some(Interval::point(3.0)));
        // A half power agrees with the square root everywhere.
        let r = f.nth_root(2).unwrap();
        for col in 0..3u32 {
            assert_eq!(g.get(&[u(col)], s(0)), r.get(&[u(col)], s(0)));
        }

        // Negative bases are undefined and fall out of the bitset.
        let mut b = SparseBuilder::<A>::new(dom(1, 2, 1));
        b.push(0, 0, Interval::point(4.0));
        b.push(0, 1, Interval::point(-4.0));
        let h = F::from_sparse(b.finish()).pow(0.5);
        let m = h.materialize().unwrap();
        match &m {
            Leaf::Sparse(sp) => assert_eq!(sp.stored(), 1),
            other => panic!("expected sparse, got {}", other.kind()),
        }
        assert_eq!(m.get(&[u(1)], s(0)), Some(Interval::Null));
    }

    #[test]
    fn test_pow_zero_on_dense_keeps_null_in_slot() {
        let d = F::from_leaf(Leaf::dense(
            dom(1, 2, 1),
            vec![Interval::point(5.0), Interval::Null],
        ));
        let m = d.pow_int(0).materialize().unwrap();
        assert_eq!(m.kind(), crate::leaf::LeafKind::Dense);
        assert_eq!(m.get(&[u(0)], s(0)), Some(Interval::point(1.0)));
        assert_eq!(m.get(&[u(1)], s(0)), Some(Interval::Null));
    }
}
