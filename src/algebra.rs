//! The abstract value algebra consumed by the engine.
//!
//! The engine never interprets values itself: every arithmetic decision is
//! delegated to an implementation of [`ValueAlgebra`]. The algebra carries a
//! distinguished *null* (absorbing; "no comparison") and a *one*
//! (multiplicative identity). Any conforming algebra may be substituted;
//! [`crate::interval`] provides the closed-interval reference algebra.
//!
//! Null is a first-class value of the algebra, not an error: operations that
//! have no defined result (division by a zero-containing operand, even roots
//! of negative ranges) return null, and the engine treats it as an ordinary
//! "no comparison" outcome. The storage layer, however, never *stores* null:
//! sparse leaves drop entries that become null, so the null/absent boundary
//! is always expressed by a cleared presence bit.

/// A stateless value algebra: a carrier type plus arithmetic over it.
///
/// All methods are associated functions; the algebra holds no state and is
/// selected purely by the type parameter of the functions built over it.
pub trait ValueAlgebra {
    /// The carrier type of the algebra.
    type Value: Clone + PartialEq + std::fmt::Debug;

    /// The distinguished absorbing element representing "no comparison".
    fn null() -> Self::Value;
    /// The multiplicative identity.
    fn one() -> Self::Value;
    /// The additive identity.
    fn zero() -> Self::Value;

    fn is_null(v: &Self::Value) -> bool;
    fn is_one(v: &Self::Value) -> bool;
    fn is_zero(v: &Self::Value) -> bool;

    /// True for any proper (non-null) value.
    fn is_value(v: &Self::Value) -> bool {
        !Self::is_null(v)
    }

    fn add(a: &Self::Value, b: &Self::Value) -> Self::Value;
    fn sub(a: &Self::Value, b: &Self::Value) -> Self::Value;
    fn mul(a: &Self::Value, b: &Self::Value) -> Self::Value;
    /// Division; returns null when the divisor's range includes zero.
    fn div(a: &Self::Value, b: &Self::Value) -> Self::Value;

    fn neg(v: &Self::Value) -> Self::Value;
    /// Multiplicative inverse; null when the operand's range includes zero.
    fn inv(v: &Self::Value) -> Self::Value;

    /// Left scalar multiplication `k * v`.
    fn scale(k: f64, v: &Self::Value) -> Self::Value;
    /// Right scalar multiplication `v * k`.
    fn scale_right(v: &Self::Value, k: f64) -> Self::Value {
        Self::scale(k, v)
    }

    /// Integer power. `v^0` is one for any proper value; `null^0` is null.
    fn pow_int(v: &Self::Value, n: i64) -> Self::Value;
    /// Real power; null when undefined over the value's range.
    fn pow_real(v: &Self::Value, x: f64) -> Self::Value;
    /// Principal n-th root (`n >= 1`); null when undefined (e.g. even root
    /// of a range touching negatives).
    fn nth_root(v: &Self::Value, n: u32) -> Self::Value;

    /// A metric over proper values, for error-tolerant relational queries.
    /// `dist(a, b) == 0.0` iff the values are equal; any tuple involving
    /// null has infinite distance.
    fn dist(a: &Self::Value, b: &Self::Value) -> f64;

    /// Appends the byte encoding of a single value.
    fn write_value(v: &Self::Value, out: &mut Vec<u8>);
    /// Decodes a single value from the front of `bytes`, returning the
    /// value and the number of bytes consumed, or `None` on malformed input.
    fn read_value(bytes: &[u8]) -> Option<(Self::Value, usize)>;
}
