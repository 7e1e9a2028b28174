//! Closed-interval reference algebra.
//!
//! Values are closed real intervals `[lo, hi]` with `lo <= hi`, plus the
//! distinguished null (the empty interval). This is the algebra the tests
//! run the engine against; any other [`ValueAlgebra`] implementation can be
//! substituted without touching the engine.

use crate::algebra::ValueAlgebra;

/// A closed real interval, or the empty interval (null).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interval {
    /// The empty interval: "no comparison". Absorbing under every operation.
    Null,
    /// A closed interval `[lo, hi]` with `lo <= hi`, both finite.
    Range(f64, f64),
}

impl Interval {
    /// Builds `[lo, hi]`, or null when the bounds are inverted or non-finite.
    pub fn new(lo: f64, hi: f64) -> Self {
        if lo.is_finite() && hi.is_finite() && lo <= hi {
            Interval::Range(lo, hi)
        } else {
            Interval::Null
        }
    }

    /// A degenerate single-point interval `[v, v]`.
    pub fn point(v: f64) -> Self {
        Interval::new(v, v)
    }

    pub fn lo(&self) -> Option<f64> {
        match *self {
            Interval::Null => None,
            Interval::Range(lo, _) => Some(lo),
        }
    }

    pub fn hi(&self) -> Option<f64> {
        match *self {
            Interval::Null => None,
            Interval::Range(_, hi) => Some(hi),
        }
    }

    fn contains_zero(&self) -> bool {
        matches!(*self, Interval::Range(lo, hi) if lo <= 0.0 && hi >= 0.0)
    }
}

/// The interval value algebra.
///
/// A zero-sized selector type: the algebra is stateless and is picked by
/// the type parameter of the unit functions built over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntervalAlgebra;

fn minmax4(a: f64, b: f64, c: f64, d: f64) -> (f64, f64) {
    let lo = a.min(b).min(c).min(d);
    let hi = a.max(b).max(c).max(d);
    (lo, hi)
}

/// Signed n-th root, monotone over all of R for odd n.
fn signed_root(v: f64, n: u32) -> f64 {
    v.signum() * v.abs().powf(1.0 / n as f64)
}

impl ValueAlgebra for IntervalAlgebra {
    type Value = Interval;

    fn null() -> Interval {
        Interval::Null
    }
    fn one() -> Interval {
        Interval::Range(1.0, 1.0)
    }
    fn zero() -> Interval {
        Interval::Range(0.0, 0.0)
    }

    fn is_null(v: &Interval) -> bool {
        matches!(v, Interval::Null)
    }
    fn is_one(v: &Interval) -> bool {
        matches!(*v, Interval::Range(lo, hi) if lo == 1.0 && hi == 1.0)
    }
    fn is_zero(v: &Interval) -> bool {
        matches!(*v, Interval::Range(lo, hi) if lo == 0.0 && hi == 0.0)
    }

    fn add(a: &Interval, b: &Interval) -> Interval {
        match (*a, *b) {
            (Interval::Range(al, ah), Interval::Range(bl, bh)) => Interval::new(al + bl, ah + bh),
            _ => Interval::Null,
        }
    }

    fn sub(a: &Interval, b: &Interval) -> Interval {
        match (*a, *b) {
            (Interval::Range(al, ah), Interval::Range(bl, bh)) => Interval::new(al - bh, ah - bl),
            _ => Interval::Null,
        }
    }

    fn mul(a: &Interval, b: &Interval) -> Interval {
        match (*a, *b) {
            (Interval::Range(al, ah), Interval::Range(bl, bh)) => {
                let (lo, hi) = minmax4(al * bl, al * bh, ah * bl, ah * bh);
                Interval::new(lo, hi)
            }
            _ => Interval::Null,
        }
    }

    fn div(a: &Interval, b: &Interval) -> Interval {
        if b.contains_zero() {
            return Interval::Null;
        }
        Self::mul(a, &Self::inv(b))
    }

    fn neg(v: &Interval) -> Interval {
        match *v {
            Interval::Range(lo, hi) => Interval::Range(-hi, -lo),
            Interval::Null => Interval::Null,
        }
    }

    fn inv(v: &Interval) -> Interval {
        if v.contains_zero() {
            return Interval::Null;
        }
        match *v {
            Interval::Range(lo, hi) => Interval::new(1.0 / hi, 1.0 / lo),
            Interval::Null => Interval::Null,
        }
    }

    fn scale(k: f64, v: &Interval) -> Interval {
        match *v {
            Interval::Range(lo, hi) => {
                if k >= 0.0 {
                    Interval::new(k * lo, k * hi)
                } else {
                    Interval::new(k * hi, k * lo)
                }
            }
            Interval::Null => Interval::Null,
        }
    }

    fn pow_int(v: &Interval, n: i64) -> Interval {
        let (lo, hi) = match *v {
            Interval::Null => return Interval::Null,
            Interval::Range(lo, hi) => (lo, hi),
        };
        if n == 0 {
            // x^0 = 1 for every proper value; null^0 stays null (handled above).
            return Self::one();
        }
        if n < 0 {
            return Self::inv(&Self::pow_int(v, -n));
        }
        let n = n as i32;
        let (plo, phi) = (lo.powi(n), hi.powi(n));
        if n % 2 == 0 && lo < 0.0 && hi > 0.0 {
            // Even power of a zero-crossing range bottoms out at 0.
            Interval::new(0.0, plo.max(phi))
        } else {
            Interval::new(plo.min(phi), plo.max(phi))
        }
    }

    fn pow_real(v: &Interval, x: f64) -> Interval {
        let (lo, hi) = match *v {
            Interval::Null => return Interval::Null,
            Interval::Range(lo, hi) => (lo, hi),
        };
        // Real exponents are only defined over non-negative bases.
        if lo < 0.0 {
            return Interval::Null;
        }
        let (plo, phi) = (lo.powf(x), hi.powf(x));
        Interval::new(plo.min(phi), plo.max(phi))
    }

    fn nth_root(v: &Interval, n: u32) -> Interval {
        if n == 0 {
            return Interval::Null;
        }
        let (lo, hi) = match *v {
            Interval::Null => return Interval::Null,
            Interval::Range(lo, hi) => (lo, hi),
        };
        if n % 2 == 0 {
            // Even roots of ranges touching negatives are undefined.
            if lo < 0.0 {
                return Interval::Null;
            }
            Interval::new(lo.powf(1.0 / n as f64), hi.powf(1.0 / n as f64))
        } else {
            Interval::new(signed_root(lo, n), signed_root(hi, n))
        }
    }

    fn dist(a: &Interval, b: &Interval) -> f64 {
        match (*a, *b) {
            (Interval::Null, Interval::Null) => 0.0,
            (Interval::Range(al, ah), Interval::Range(bl, bh)) => (al - bl).abs().max((ah - bh).abs()),
            _ => f64::INFINITY,
        }
    }

    fn write_value(v: &Interval, out: &mut Vec<u8>) {
        match *v {
            Interval::Null => out.push(0),
            Interval::Range(lo, hi) => {
                out.push(1);
                out.extend_from_slice(&lo.to_le_bytes());
                out.extend_from_slice(&hi.to_le_bytes());
            }
        }
    }

    fn read_value(bytes: &[u8]) -> Option<(Interval, usize)> {
        match bytes.first()? {
            0 => Some((Interval::Null, 1)),
            1 => {
                if bytes.len() < 17 {
                    return None;
                }
                let lo = f64::from_le_bytes(bytes[1..9].try_into().ok()?);
                let hi = f64::from_le_bytes(bytes[9..17].try_into().ok()?);
                Some((Interval::new(lo, hi), 17))
            }
            _ => None,
        }
    }
}
