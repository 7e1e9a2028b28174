//! Type-safe wrappers for the index spaces of the engine.
//!
//! Unit indices, series indices, dimensions, and ranks are all plain
//! integers at the machine level; these newtypes keep them from being
//! mixed up in tuple-evaluation and bitset code.

use std::fmt;

/// The hard cap on the dimension of any unit function.
pub const MAX_DIM: u8 = 10;

/// A unit index (0-based) into the unit universe of a domain.
///
/// Units name measured quantities/observables. A `Unit` is only meaningful
/// relative to a domain with `units > index`; range checks happen at the
/// evaluation boundary, not here.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Unit(u32);

impl Unit {
    pub const fn new(index: u32) -> Self {
        Unit(index)
    }

    /// Returns the raw index as a `usize`.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

impl From<u32> for Unit {
    fn from(index: u32) -> Self {
        Unit(index)
    }
}

impl From<Unit> for u32 {
    fn from(unit: Unit) -> Self {
        unit.0
    }
}

/// A series (trial/frame) index, selecting one of several parallel
/// datasets sharing the same unit universe.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Series(u32);

impl Series {
    pub const fn new(index: u32) -> Self {
        Series(index)
    }

    /// Returns the raw index as a `usize`.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl From<u32> for Series {
    fn from(index: u32) -> Self {
        Series(index)
    }
}

/// The number of unit-tuple positions a function accepts, excluding the
/// trailing series index.
///
/// # Invariants
///
/// - `0 <= dim <= MAX_DIM` always; the cap is enforced at construction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Dim(u8);

impl Dim {
    /// Creates a new dimension.
    ///
    /// # Panics
    ///
    /// Panics if `dim > MAX_DIM`.
    pub fn new(dim: u8) -> Self {
        assert!(dim <= MAX_DIM, "Dimension {} exceeds the cap {}", dim, MAX_DIM);
        Dim(dim)
    }

    /// Creates a new dimension, or `None` if it exceeds the cap.
    ///
    /// Used on the tensor-composition path, where an over-cap sum is an
    /// ordinary absent result rather than a caller bug.
    pub fn checked(dim: usize) -> Option<Self> {
        if dim <= MAX_DIM as usize {
            Some(Dim(dim as u8))
        } else {
            None
        }
    }

    /// Returns the raw dimension as a `usize`.
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// Sum of two dimensions, `None` when the result would exceed the cap.
    pub fn checked_add(self, other: Dim) -> Option<Dim> {
        Dim::checked(self.get() + other.get())
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}
