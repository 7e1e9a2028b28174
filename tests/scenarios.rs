//! End-to-end scenarios exercising construction, relational analysis,
//! the expression algebra, and materialization together.

use test_log::test;

use unitfn_rs::cmpfn::{degree_of_substitution, substitutable, ComparisonFn, Record};
use unitfn_rs::domain::Domain;
use unitfn_rs::expr::UnitFn;
use unitfn_rs::interval::{Interval, IntervalAlgebra};
use unitfn_rs::leaf::{Leaf, LeafKind, SparseBuilder};
use unitfn_rs::types::{Dim, Series, Unit};

type A = IntervalAlgebra;
type Cf = ComparisonFn<A>;

fn rec(left: usize, right: usize, series: usize, v: f64) -> Record<Interval> {
    Record {
        left,
        right,
        series,
        value: Interval::point(v),
    }
}

fn u(i: u32) -> Unit {
    Unit::new(i)
}

fn s(i: u32) -> Series {
    Series::new(i)
}

/// A frame with one stored comparison: present, unobserved, and absent
/// tuples are all distinguishable, and the relational checks read off the
/// presence bitset.
#[test]
fn single_comparison_frame() {
    let cf = Cf::new(
        2,
        1,
        vec![Record {
            left: 0,
            right: 1,
            series: 0,
            value: Interval::new(1.99, 2.01),
        }],
    )
    .unwrap();

    assert_eq!(cf.get(u(0), u(1), s(0)), Some(Interval::new(1.99, 2.01)));
    // In range but unobserved: null.
    assert_eq!(cf.get(u(1), u(0), s(0)), Some(Interval::Null));
    // Out of range: absent.
    assert_eq!(cf.get(u(2), u(0), s(0)), None);

    assert!(!cf.reflexive(u(0), s(0)));
    assert!(!cf.symmetric(u(0), u(1), s(0)));
    // No composable pair exists, so transitivity holds vacuously.
    assert!(cf.transitive_frame(s(0)));
}

/// Six units in two interchangeability classes across two series. Basis
/// extraction finds the classes; bases from the same class substitute,
/// bases across classes do not.
fn two_class_cf() -> Cf {
    let mut records = Vec::new();
    for series in 0..2 {
        for &class in &[[0usize, 1, 2], [3, 4, 5]] {
            for &a in &class {
                for &b in &class {
                    let v = (b as f64 + 1.0) / (a as f64 + 1.0);
                    records.push(rec(a, b, series, v));
                }
            }
        }
    }
    Cf::new(6, 2, records).unwrap()
}

#[test]
fn basis_and_substitution_within_class() {
    let cf = two_class_cf();
    assert!(cf.orthogonal_fn());

    let basis = cf.basis(s(0)).unwrap();
    assert_eq!(basis, vec![vec![u(0), u(1), u(2)], vec![u(3), u(4), u(5)]]);

    let b0 = cf.base(u(0)).unwrap();
    let b1 = cf.base(u(1)).unwrap();
    for series in 0..2 {
        assert_eq!(substitutable(&b0, &b1, s(series)), Some(true));
        assert_eq!(degree_of_substitution(&b0, &b1, s(series)), Some(1.0));
    }
    // The ratios compose consistently up to rounding.
    assert!(cf.orthogonality_error_fn() < 1e-12);
}

#[test]
fn substitution_across_classes() {
    let cf = two_class_cf();
    let b0 = cf.base(u(0)).unwrap();
    let b3 = cf.base(u(3)).unwrap();
    assert_eq!(substitutable(&b0, &b3, s(0)), Some(false));
    assert_eq!(degree_of_substitution(&b0, &b3, s(0)), Some(0.0));
    assert_eq!(degree_of_substitution(&b3, &b0, s(0)), Some(0.0));
}

/// A mixed-presence pair of classes: overlapping but unequal bases give a
/// fractional degree of substitution.
#[test]
fn partial_substitution() {
    let mut records = vec![
        rec(0, 0, 0, 1.0),
        rec(0, 1, 0, 2.0),
        rec(0, 2, 0, 4.0),
        rec(1, 0, 0, 0.5),
        rec(1, 1, 0, 1.0),
    ];
    records.push(rec(2, 2, 0, 1.0));
    let cf = Cf::new(3, 1, records).unwrap();

    let b0 = cf.base(u(0)).unwrap();
    let b1 = cf.base(u(1)).unwrap();
    assert_eq!(substitutable(&b0, &b1, s(0)), Some(false));
    // Rows {0,1,2} and {0,1}: two common, three in the union.
    assert_eq!(degree_of_substitution(&b0, &b1, s(0)), Some(2.0 / 3.0));
}

/// The four-way pipeline `(f0 (x) f1) * (f2 (x) f3)` materializes to a
/// single leaf whose cells agree with the unmaterialized tree everywhere.
#[test]
fn tensor_product_pipeline() {
    let dom = Domain::new(Dim::new(1), 2, 1).unwrap();

    let mk = |entries: &[(usize, f64)]| {
        let mut b = SparseBuilder::<A>::new(dom.clone());
        for &(col, v) in entries {
            b.push(0, col, Interval::point(v));
        }
        UnitFn::from_sparse(b.finish())
    };

    let f0 = mk(&[(0, 3.0), (1, 1.0)]);
    let f1 = mk(&[(0, 7.0)]);
    let f2 = mk(&[(0, 11.0), (1, 2.0)]);
    let f3 = mk(&[(0, 13.0), (1, 5.0)]);

    let left = f0.tmul(&f1).unwrap();
    let right = f2.tmul(&f3).unwrap();
    let tree = left.mul(&right).unwrap();
    assert_eq!(tree.domain().dim().get(), 2);

    let leaf = tree.materialize().unwrap();
    assert_eq!(leaf.kind(), LeafKind::Sparse);
    for a in 0..2u32 {
        for b in 0..2u32 {
            let t = [u(a), u(b)];
            assert_eq!(leaf.get(&t, s(0)), tree.get(&t, s(0)));
        }
    }
    // 3 * 7 * 11 * 13 at the all-zero tuple.
    assert_eq!(leaf.get(&[u(0), u(0)], s(0)), Some(Interval::point(3003.0)));
    // f1 has no entry at unit 1, so that half of the grid is null.
    assert_eq!(leaf.get(&[u(1), u(1)], s(0)), Some(Interval::Null));
}

/// Multiplying by a broadcast identity folds away at construction: no
/// tree node is built and the sparse operand survives untouched.
#[test]
fn identity_fold_preserves_sparse() {
    let dom = Domain::new(Dim::new(2), 3, 2).unwrap();
    let mut b = SparseBuilder::<A>::new(dom.clone());
    b.push(0, 1, Interval::point(2.0));
    b.push(4, 2, Interval::point(5.0));
    let f = UnitFn::from_sparse(b.finish());

    let one = UnitFn::<A>::constant(dom, Interval::point(1.0));
    let g = one.mul(&f).unwrap();
    assert!(g.is_leaf());
    assert!(g.equals(&f));
    assert_eq!(g.materialize().unwrap().kind(), LeafKind::Sparse);
}

/// Orthogonal-subset search over a frame where one unit breaks symmetry:
/// the count, the enumeration, and the degree all agree, and pruning
/// never visits supersets of the broken pair.
#[test]
fn orthogonal_subset_search() {
    let cf = Cf::new(
        3,
        1,
        vec![
            rec(0, 0, 0, 1.0),
            rec(1, 1, 0, 1.0),
            rec(2, 2, 0, 1.0),
            // 0 -> 1 stored without its reverse.
            rec(0, 1, 0, 2.0),
        ],
    )
    .unwrap();

    assert!(!cf.orthogonal_frame(s(0)));
    let subsets: Vec<_> = cf.orthogonal_subsets(s(0)).collect();
    // Everything except the two supersets of {0, 1}.
    assert_eq!(subsets.len(), 6);
    assert!(!subsets.iter().any(|sub| sub.contains(&u(0)) && sub.contains(&u(1))));
    assert_eq!(cf.degree_of_orthogonality(s(0)), Some(6.0 / 8.0));
}

/// Comparison functions interoperate with the expression algebra: the
/// relation itself is a 2-dimensional unit function that scales and
/// materializes like any other.
#[test]
fn comparison_as_unit_fn() {
    let cf = two_class_cf();
    let f = cf.to_unit_fn();
    let doubled = f.smul(2.0);
    assert_eq!(doubled.get(&[u(0), u(1)], s(0)), Some(Interval::point(4.0)));

    let leaf = doubled.materialize().unwrap();
    match leaf {
        Leaf::Sparse(ref sp) => assert_eq!(sp.stored(), 2 * 2 * 9),
        ref other => panic!("expected sparse leaf, got {}", other.kind()),
    }
}
