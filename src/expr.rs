//! Algebraic expression nodes over unit functions.
//!
//! A [`UnitFn`] is a cheap reference-counted handle to an immutable
//! expression tree: either a physical [`Leaf`] or a composition node
//! (`Arith`, `Tensor`, `PowInt`, `PowReal`, `NthRoot`) over other unit
//! functions. Subtrees are shared, never mutated; operator methods are pure
//! and return either a new function or `None` (absent) on domain mismatch
//! or dimension-cap overflow. They never panic on bad operands.
//!
//! Construction applies constant folding eagerly; each rewrite is traced
//! with `log::debug!`, labeled by the law applied.

use std::rc::Rc;

use log::debug;

use crate::algebra::ValueAlgebra;
use crate::domain::Domain;
use crate::leaf::{Leaf, SparseLeaf};
use crate::types::{Series, Unit};

/// Element-wise arithmetic operator of an `Arith` node.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn apply<A: ValueAlgebra>(self, a: &A::Value, b: &A::Value) -> A::Value {
        match self {
            ArithOp::Add => A::add(a, b),
            ArithOp::Sub => A::sub(a, b),
            ArithOp::Mul => A::mul(a, b),
            ArithOp::Div => A::div(a, b),
        }
    }
}

/// Operand order of a binary node.
///
/// `Right` evaluates `op(right, left)` (or puts the right operand's unit
/// slots first, for tensors), so "other - this" and "one / this" reuse the
/// existing children instead of allocating a mirrored node.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Orientation {
    Left,
    Right,
}

/// The body of a unit function: a leaf or an algebraic composition.
#[derive(Debug)]
pub enum Expr<A: ValueAlgebra> {
    Leaf(Leaf<A>),
    Arith {
        left: UnitFn<A>,
        right: UnitFn<A>,
        op: ArithOp,
        orientation: Orientation,
    },
    Tensor {
        left: UnitFn<A>,
        right: UnitFn<A>,
        orientation: Orientation,
        domain: Domain,
    },
    PowInt {
        base: UnitFn<A>,
        exp: i64,
    },
    PowReal {
        base: UnitFn<A>,
        exp: f64,
    },
    NthRoot {
        base: UnitFn<A>,
        exp: u32,
    },
}

// Manual impls: deriving would add an implicit `A: Clone`/`A: PartialEq`
// bound, but only `A::Value` is stored.
impl<A: ValueAlgebra> Clone for Expr<A> {
    fn clone(&self) -> Self {
        match self {
            Expr::Leaf(leaf) => Expr::Leaf(leaf.clone()),
            Expr::Arith {
                left,
                right,
                op,
                orientation,
            } => Expr::Arith {
                left: left.clone(),
                right: right.clone(),
                op: *op,
                orientation: *orientation,
            },
            Expr::Tensor {
                left,
                right,
                orientation,
                domain,
            } => Expr::Tensor {
                left: left.clone(),
                right: right.clone(),
                orientation: *orientation,
                domain: domain.clone(),
            },
            Expr::PowInt { base, exp } => Expr::PowInt {
                base: base.clone(),
                exp: *exp,
            },
            Expr::PowReal { base, exp } => Expr::PowReal {
                base: base.clone(),
                exp: *exp,
            },
            Expr::NthRoot { base, exp } => Expr::NthRoot {
                base: base.clone(),
                exp: *exp,
            },
        }
    }
}

impl<A: ValueAlgebra> PartialEq for Expr<A> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expr::Leaf(a), Expr::Leaf(b)) => a == b,
            (
                Expr::Arith {
                    left: la,
                    right: ra,
                    op: oa,
                    orientation: ta,
                },
                Expr::Arith {
                    left: lb,
                    right: rb,
                    op: ob,
                    orientation: tb,
                },
            ) => la == lb && ra == rb && oa == ob && ta == tb,
            (
                Expr::Tensor {
                    left: la,
                    right: ra,
                    orientation: ta,
                    domain: da,
                },
                Expr::Tensor {
                    left: lb,
                    right: rb,
                    orientation: tb,
                    domain: db,
                },
            ) => la == lb && ra == rb && ta == tb && da == db,
            (Expr::PowInt { base: ba, exp: ea }, Expr::PowInt { base: bb, exp: eb }) => {
                ba == bb && ea == eb
            }
            (Expr::PowReal { base: ba, exp: ea }, Expr::PowReal { base: bb, exp: eb }) => {
                ba == bb && ea == eb
            }
            (Expr::NthRoot { base: ba, exp: ea }, Expr::NthRoot { base: bb, exp: eb }) => {
                ba == bb && ea == eb
            }
            _ => false,
        }
    }
}

/// A unit function: a shared handle to an immutable expression tree.
#[derive(Debug)]
pub struct UnitFn<A: ValueAlgebra>(Rc<Expr<A>>);

impl<A: ValueAlgebra> Clone for UnitFn<A> {
    fn clone(&self) -> Self {
        UnitFn(Rc::clone(&self.0))
    }
}

impl<A: ValueAlgebra> PartialEq for UnitFn<A> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl<A: ValueAlgebra> UnitFn<A> {
    pub fn from_leaf(leaf: Leaf<A>) -> Self {
        UnitFn(Rc::new(Expr::Leaf(leaf)))
    }

    pub fn from_sparse(leaf: SparseLeaf<A>) -> Self {
        Self::from_leaf(Leaf::Sparse(leaf))
    }

    /// A broadcast constant over `domain`.
    pub fn constant(domain: Domain, value: A::Value) -> Self {
        Self::from_leaf(Leaf::constant(domain, value))
    }

    pub(crate) fn expr(&self) -> &Expr<A> {
        &self.0
    }

    pub fn is_leaf(&self) -> bool {
        matches!(*self.0, Expr::Leaf(_))
    }

    pub fn is_alg(&self) -> bool {
        !self.is_leaf()
    }

    /// The leaf behind this function, when it is one.
    pub fn as_leaf(&self) -> Option<&Leaf<A>> {
        match &*self.0 {
            Expr::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// The fixed evaluation domain of this function.
    pub fn domain(&self) -> &Domain {
        match &*self.0 {
            Expr::Leaf(leaf) => leaf.domain(),
            Expr::Arith { left, .. } => left.domain(),
            Expr::Tensor { domain, .. } => domain,
            Expr::PowInt { base, .. } => base.domain(),
            Expr::PowReal { base, .. } => base.domain(),
            Expr::NthRoot { base, .. } => base.domain(),
        }
    }

    /// Structural equality. Leaf equality is physical (kind-sensitive);
    /// materialize both sides first for semantic comparison.
    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }

    /// If this function is a broadcast constant, its value.
    fn const_value(&self) -> Option<&A::Value> {
        match &*self.0 {
            Expr::Leaf(Leaf::Const(c)) => Some(c.value()),
            _ => None,
        }
    }

    fn is_const_null(&self) -> bool {
        self.const_value().is_some_and(A::is_null)
    }
    fn is_const_zero(&self) -> bool {
        self.const_value().is_some_and(A::is_zero)
    }
    fn is_const_one(&self) -> bool {
        self.const_value().is_some_and(A::is_one)
    }

    /// Unchecked evaluation: recurses into children and combines results
    /// via the value algebra. The tuple must be in range; violations panic
    /// or return garbage.
    pub fn get_unchecked(&self, tuple: &[Unit], series: Series) -> A::Value {
        match &*self.0 {
            Expr::Leaf(leaf) => leaf.get_unchecked(tuple, series),
            Expr::Arith { left, right, op, orientation } => {
                let l = left.get_unchecked(tuple, series);
                let r = right.get_unchecked(tuple, series);
                match orientation {
                    Orientation::Left => op.apply::<A>(&l, &r),
                    Orientation::Right => op.apply::<A>(&r, &l),
                }
            }
            Expr::Tensor { left, right, orientation, .. } => {
                let (first, second) = match orientation {
                    Orientation::Left => (left, right),
                    Orientation::Right => (right, left),
                };
                let split = first.domain().dim().get();
                let a = first.get_unchecked(&tuple[..split], series);
                let b = second.get_unchecked(&tuple[split..], series);
                A::mul(&a, &b)
            }
            Expr::PowInt { base, exp } => A::pow_int(&base.get_unchecked(tuple, series), *exp),
            Expr::PowReal { base, exp } => A::pow_real(&base.get_unchecked(tuple, series), *exp),
            Expr::NthRoot { base, exp } => A::nth_root(&base.get_unchecked(tuple, series), *exp),
        }
    }

    /// Bounds-checked evaluation: `None` for any arity or range violation.
    pub fn get(&self, tuple: &[Unit], series: Series) -> Option<A::Value> {
        if !self.domain().in_range(tuple, series) {
            return None;
        }
        Some(self.get_unchecked(tuple, series))
    }

    /// Existence: in range and not null.
    pub fn exists(&self, tuple: &[Unit], series: Series) -> bool {
        match self.get(tuple, series) {
            Some(v) => A::is_value(&v),
            None => false,
        }
    }

    fn arith(&self, other: &Self, op: ArithOp, orientation: Orientation) -> Self {
        UnitFn(Rc::new(Expr::Arith {
            left: self.clone(),
            right: other.clone(),
            op,
            orientation,
        }))
    }

    /// A null broadcast over either operand's domain, for absorbing folds.
    fn null_like(&self) -> Self {
        Self::constant(self.domain().clone(), A::null())
    }

    /// Element-wise sum. Absent on domain mismatch.
    pub fn add(&self, other: &Self) -> Option<Self> {
        if !self.domain().same(other.domain()) {
            return None;
        }
        if self.is_const_null() || other.is_const_null() {
            debug!("add: null absorbs");
            return Some(self.null_like());
        }
        if self.is_const_zero() {
            debug!("add: 0 + g => g");
            return Some(other.clone());
        }
        if other.is_const_zero() {
            debug!("add: f + 0 => f");
            return Some(self.clone());
        }
        if let (Some(a), Some(b)) = (self.const_value(), other.const_value()) {
            debug!("add: const folding");
            return Some(Self::constant(self.domain().clone(), A::add(a, b)));
        }
        Some(self.arith(other, ArithOp::Add, Orientation::Left))
    }

    /// Element-wise difference. Absent on domain mismatch.
    pub fn sub(&self, other: &Self) -> Option<Self> {
        if !self.domain().same(other.domain()) {
            return None;
        }
        if self.is_const_null() || other.is_const_null() {
            debug!("sub: null absorbs");
            return Some(self.null_like());
        }
        if other.is_const_zero() {
            debug!("sub: f - 0 => f");
            return Some(self.clone());
        }
        if let (Some(a), Some(b)) = (self.const_value(), other.const_value()) {
            debug!("sub: const folding");
            return Some(Self::constant(self.domain().clone(), A::sub(a, b)));
        }
        Some(self.arith(other, ArithOp::Sub, Orientation::Left))
    }

    /// Element-wise product. Absent on domain mismatch.
    pub fn mul(&self, other: &Self) -> Option<Self> {
        if !self.domain().same(other.domain()) {
            return None;
        }
        if self.is_const_null() || other.is_const_null() {
            debug!("mul: null absorbs");
            return Some(self.null_like());
        }
        if self.is_const_zero() || other.is_const_zero() {
            debug!("mul: 0 * g => 0");
            return Some(Self::constant(self.domain().clone(), A::zero()));
        }
        if self.is_const_one() {
            debug!("mul: 1 * g => g");
            return Some(other.clone());
        }
        if other.is_const_one() {
            debug!("mul: f * 1 => f");
            return Some(self.clone());
        }
        if let (Some(a), Some(b)) = (self.const_value(), other.const_value()) {
            debug!("mul: const folding");
            return Some(Self::constant(self.domain().clone(), A::mul(a, b)));
        }
        Some(self.arith(other, ArithOp::Mul, Orientation::Left))
    }

    /// Element-wise quotient. Absent on domain mismatch. Division by a
    /// zero-constant operand folds to a zero-typed constant.
    pub fn div(&self, other: &Self) -> Option<Self> {
        if !self.domain().same(other.domain()) {
            return None;
        }
        if self.is_const_null() || other.is_const_null() {
            debug!("div: null absorbs");
            return Some(self.null_like());
        }
        if other.is_const_zero() {
            debug!("div: f / 0 => 0");
            return Some(Self::constant(self.domain().clone(), A::zero()));
        }
        if other.is_const_one() {
            debug!("div: f / 1 => f");
            return Some(self.clone());
        }
        if let (Some(a), Some(b)) = (self.const_value(), other.const_value()) {
            debug!("div: const folding");
            return Some(Self::constant(self.domain().clone(), A::div(a, b)));
        }
        Some(self.arith(other, ArithOp::Div, Orientation::Left))
    }

    /// Element-wise negation: `0 - f` via a right-oriented subtraction.
    pub fn neg(&self) -> Self {
        if let Some(v) = self.const_value() {
            debug!("neg: const folding");
            return Self::constant(self.domain().clone(), A::neg(v));
        }
        let zero = Self::constant(self.domain().clone(), A::zero());
        self.arith(&zero, ArithOp::Sub, Orientation::Right)
    }

    /// Element-wise multiplicative inverse: `1 / f` via a right-oriented
    /// division, without allocating a mirrored node.
    pub fn inv(&self) -> Self {
        if let Some(v) = self.const_value() {
            debug!("inv: const folding");
            return Self::constant(self.domain().clone(), A::inv(v));
        }
        let one = Self::constant(self.domain().clone(), A::one());
        self.arith(&one, ArithOp::Div, Orientation::Right)
    }

    /// Left scalar multiple `k * f`, as a product with the broadcast `k * 1`.
    pub fn smul(&self, k: f64) -> Self {
        let scalar = Self::constant(self.domain().clone(), A::scale(k, &A::one()));
        // Domains match by construction.
        scalar.mul(self).expect("scalar domain matches")
    }

    /// Tensor product: concatenates unit-tuple slots and multiplies values.
    /// Absent when unit/series counts differ or the summed dimension
    /// exceeds the cap.
    pub fn tmul(&self, other: &Self) -> Option<Self> {
        let domain = self.domain().tensor(other.domain())?;
        if let (Some(a), Some(b)) = (self.const_value(), other.const_value()) {
            debug!("tmul: const folding");
            return Some(Self::constant(domain, A::mul(a, b)));
        }
        Some(UnitFn(Rc::new(Expr::Tensor {
            left: self.clone(),
            right: other.clone(),
            orientation: Orientation::Left,
            domain,
        })))
    }

    /// Integer power.
    pub fn pow_int(&self, exp: i64) -> Self {
        if exp == 1 {
            debug!("pow_int: f^1 => f");
            return self.clone();
        }
        if let Some(v) = self.const_value() {
            debug!("pow_int: const folding");
            return Self::constant(self.domain().clone(), A::pow_int(v, exp));
        }
        if let Expr::PowInt { base, exp: inner } = &*self.0 {
            if let Some(combined) = inner.checked_mul(exp) {
                debug!("pow_int: (f^{})^{} => f^{}", inner, exp, combined);
                return base.pow_int(combined);
            }
        }
        UnitFn(Rc::new(Expr::PowInt { base: self.clone(), exp }))
    }

    /// Real power.
    pub fn pow(&self, exp: f64) -> Self {
        if let Some(v) = self.const_value() {
            debug!("pow: const folding");
            return Self::constant(self.domain().clone(), A::pow_real(v, exp));
        }
        UnitFn(Rc::new(Expr::PowReal { base: self.clone(), exp }))
    }

    /// Principal n-th root. Absent for `n == 0`.
    pub fn nth_root(&self, exp: u32) -> Option<Self> {
        if exp == 0 {
            return None;
        }
        if exp == 1 {
            debug!("nth_root: root(f, 1) => f");
            return Some(self.clone());
        }
        if let Some(v) = self.const_value() {
            debug!("nth_root: const folding");
            return Some(Self::constant(self.domain().clone(), A::nth_root(v, exp)));
        }
        if let Expr::PowInt { base, exp: m } = &*self.0 {
            if *m > 0 {
                let g = gcd(m.unsigned_abs(), exp as u64);
                if g == exp as u64 {
                    debug!("nth_root: root(f^{}, {}) => f^{}", m, exp, m / exp as i64);
                    return Some(base.pow_int(m / exp as i64));
                }
                if g > 1 {
                    debug!("nth_root: root(f^{}, {}) reduced by gcd {}", m, exp, g);
                    return base.pow_int(m / g as i64).nth_root((exp as u64 / g) as u32);
                }
            }
        }
        Some(UnitFn(Rc::new(Expr::NthRoot { base: self.clone(), exp })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::{Interval, IntervalAlgebra};
    use crate::leaf::SparseBuilder;
    use crate::types::Dim;

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

    fn sample() -> F {
        let mut b = SparseBuilder::<A>::new(dom(1, 3, 1));
        b.push(0, 0, Interval::point(2.0));
        b.push(0, 2, Interval::new(1.0, 4.0));
        F::from_sparse(b.finish())
    }

    #[test]
    fn test_domain_mismatch_absent() {
        let f = sample();
        let g = F::constant(dom(1, 4, 1), Interval::point(1.0));
        assert!(f.add(&g).is_none());
        assert!(f.sub(&g).is_none());
        assert!(f.mul(&g).is_none());
        assert!(f.div(&g).is_none());
    }

    #[test]
    fn test_mul_one_folds_to_operand() {
        let f = sample();
        let one = F::constant(dom(1, 3, 1), Interval::point(1.0));
        let g = one.mul(&f).unwrap();
        assert!(g.equals(&f));
        let h = f.mul(&one).unwrap();
        assert!(h.equals(&f));
    }

    #[test]
    fn test_add_zero_folds() {
        let f = sample();
        let zero = F::constant(dom(1, 3, 1), Interval::point(0.0));
        assert!(zero.add(&f).unwrap().equals(&f));
        assert!(f.add(&zero).unwrap().equals(&f));
        assert!(f.sub(&zero).unwrap().equals(&f));
    }

    #[test]
    fn test_mul_zero_folds_to_zero_const() {
        let f = sample();
        let zero = F::constant(dom(1, 3, 1), Interval::point(0.0));
        let g = zero.mul(&f).unwrap();
        assert_eq!(g.get(&[u(1)], s(0)), Some(Interval::point(0.0)));
        assert!(g.is_leaf());
    }

    #[test]
    fn test_div_by_zero_const_folds_to_zero() {
        let f = sample();
        let zero = F::constant(dom(1, 3, 1), Interval::point(0.0));
        let g = f.div(&zero).unwrap();
        assert_eq!(g.get(&[u(0)], s(0)), Some(Interval::point(0.0)));
    }

    #[test]
    fn test_null_absorbs() {
        let f = sample();
        let null = F::constant(dom(1, 3, 1), Interval::Null);
        let g = f.add(&null).unwrap();
        assert_eq!(g.get(&[u(0)], s(0)), Some(Interval::Null));
    }

    #[test]
    fn test_arith_eval() {
        let f = sample();
        let g = f.add(&f).unwrap();
        assert_eq!(g.get(&[u(0)], s(0)), Some(Interval::point(4.0)));
        // Null cell stays null through the algebra.
        assert_eq!(g.get(&[u(1)], s(0)), Some(Interval::Null));
        assert!(g.is_alg());
    }

    #[test]
    fn test_neg_inv_orientation() {
        let f = sample();
        let n = f.neg();
        assert_eq!(n.get(&[u(0)], s(0)), Some(Interval::point(-2.0)));
        let i = f.inv();
        assert_eq!(i.get(&[u(0)], s(0)), Some(Interval::point(0.5)));
        assert_eq!(i.get(&[u(2)], s(0)), Some(Interval::new(0.25, 1.0)));
    }

    #[test]
    fn test_smul() {
        let f = sample();
        let g = f.smul(3.0);
        assert_eq!(g.get(&[u(0)], s(0)), Some(Interval::point(6.0)));
        assert_eq!(g.get(&[u(1)], s(0)), Some(Interval::Null));
    }

    #[test]
    fn test_tensor_dims() {
        let f = sample();
        let t = f.tmul(&f).unwrap();
        assert_eq!(t.domain().dim().get(), 2);
        assert_eq!(t.get(&[u(0), u(0)], s(0)), Some(Interval::point(4.0)));
        assert_eq!(t.get(&[u(0), u(2)], s(0)), Some(Interval::new(2.0, 8.0)));
        assert_eq!(t.get(&[u(0), u(1)], s(0)), Some(Interval::Null));
    }

    #[test]
    fn test_tensor_cap_absent() {
        let f = F::constant(dom(6, 2, 1), Interval::point(1.0));
        let g = F::constant(dom(5, 2, 1), Interval::point(1.0));
        assert!(f.tmul(&g).is_none());
        let h = F::constant(dom(4, 2, 1), Interval::point(1.0));
        assert!(f.tmul(&h).is_some());
    }

    #[test]
    fn test_pow_laws() {
        let f = sample();
        assert!(f.pow_int(1).equals(&f));
        let g = f.pow_int(2).pow_int(3);
        // (f^2)^3 collapses to f^6.
        assert!(g.equals(&f.pow_int(6)));
        assert_eq!(f.pow_int(2).get(&[u(0)], s(0)), Some(Interval::point(4.0)));
        // x^0 = 1 pointwise for stored values, null stays null.
        let h = f.pow_int(0);
        assert_eq!(h.get(&[u(0)], s(0)), Some(Interval::point(1.0)));
        assert_eq!(h.get(&[u(1)], s(0)), Some(Interval::Null));
    }

    #[test]
    fn test_pow_real_eval() {
        let f = sample();
        let g = f.pow(0.5);
        assert!(g.is_alg());
        assert_eq!(g.get(&[u(2)], s(0)), Some(Interval::new(1.0, 2.0)));
        assert_eq!(g.get(&[u(1)], s(0)), Some(Interval::Null));

        let c = F::constant(dom(1, 3, 1), Interval::point(9.0));
        let folded = c.pow(0.5);
        assert!(folded.is_leaf());
        assert_eq!(folded.get(&[u(0)], s(0)), Some(Interval::point(3.0)));
    }

    #[test]
    fn test_root_laws() {
        let f = sample();
        assert!(f.nth_root(0).is_none());
        assert!(f.nth_root(1).unwrap().equals(&f));
        // root(f^6, 3) => f^2.
        let g = f.pow_int(6).nth_root(3).unwrap();
        assert!(g.equals(&f.pow_int(2)));
        // root(f^4, 6) reduces by gcd 2 to root(f^2, 3).
        let h = f.pow_int(4).nth_root(6).unwrap();
        assert!(h.equals(&f.pow_int(2).nth_root(3).unwrap()));
    }

    #[test]
    fn test_shared_children() {
        let f = sample();
        let g = f.add(&f).unwrap();
        let h = g.mul(&g).unwrap();
        // The tree aliases unmutated subtrees; evaluation still agrees.
        assert_eq!(h.get(&[u(0)], s(0)), Some(Interval::point(16.0)));
        assert_eq!(f.get(&[u(0)], s(0)), Some(Interval::point(2.0)));
    }
}
