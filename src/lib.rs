//! # unitfn-rs: Unit-Function Algebra and Comparison-Function Analysis
//!
//! **`unitfn-rs`** is a library for building, combining, and analyzing **unit functions**:
//! partial functions from tuples of measurement units (plus a series index) into an abstract
//! value algebra, such as intervals of conversion factors.
//!
//! ## What is a unit function?
//!
//! A unit function maps `(u_1, ..., u_d, s)` to a value --- for example, "by series `s`,
//! one `u_1` is worth between 1.99 and 2.01 `u_2`". The map is partial twice over: a tuple
//! can be **out of range** (absent, reported as `None`) or in range but **unobserved**
//! (the algebra's null). The distinction is preserved end to end.
//!
//! ## Key Features
//!
//! - **Three storage strategies**: broadcast constants, row-major dense arrays, and
//!   CSR-over-bitset sparse leaves, all behind one evaluation contract. See [`leaf`].
//! - **Immutable expression trees**: arithmetic, tensor products, powers, and roots build
//!   shared, never-mutated trees with algebraic simplification at construction.
//!   See [`expr`].
//! - **Materialization engine**: collapses any tree back to a single leaf with kind-aware
//!   dispatch, staying sparse whenever absence is preserved. See [`materialize`].
//! - **Relational analysis**: comparison functions answer reflexivity, symmetry,
//!   transitivity, and orthogonality queries straight off the presence bitset,
//!   word-parallel where it counts. See [`cmpfn`].
//! - **Pluggable value algebra**: everything is generic over [`algebra::ValueAlgebra`];
//!   an interval arithmetic implementation ships in [`interval`].
//!
//! ## Basic Usage
//!
//! ```rust
//! use unitfn_rs::cmpfn::{ComparisonFn, Record};
//! use unitfn_rs::interval::{Interval, IntervalAlgebra};
//! use unitfn_rs::types::{Series, Unit};
//!
//! // Two units compared in one series, with exact reciprocal observations.
//! let cf: ComparisonFn<IntervalAlgebra> = ComparisonFn::new(
//!     2,
//!     1,
//!     vec![
//!         Record { left: 0, right: 0, series: 0, value: Interval::point(1.0) },
//!         Record { left: 1, right: 1, series: 0, value: Interval::point(1.0) },
//!         Record { left: 0, right: 1, series: 0, value: Interval::new(1.99, 2.01) },
//!         Record { left: 1, right: 0, series: 0, value: Interval::new(0.49, 0.51) },
//!     ],
//! )
//! .unwrap();
//!
//! let s = Series::new(0);
//! assert!(cf.orthogonal_frame(s));
//! assert_eq!(cf.degree_of_orthogonality(s), Some(1.0));
//!
//! // Both units land in a single interchangeability class.
//! let basis = cf.basis(s).unwrap();
//! assert_eq!(basis, vec![vec![Unit::new(0), Unit::new(1)]]);
//! ```
//!
//! ## Core Components
//!
//! - **[`cmpfn`]**: Comparison functions and their relational algorithms.
//! - **[`expr`]**: The unit-function expression algebra.
//! - **[`materialize`]**: Tree-to-leaf evaluation.
//! - **[`subset`]**: Monotone subset counting and enumeration.
//!
//! For the storage layout details, start with the [`leaf`] and [`bitset`] module
//! documentation.

pub mod algebra;
pub mod bitset;
pub mod cmpfn;
pub mod domain;
pub mod error;
pub mod expr;
pub mod interval;
pub mod leaf;
pub mod materialize;
pub mod subset;
pub mod types;
