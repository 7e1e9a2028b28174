//! The construction-error taxonomy.
//!
//! Everything downstream of a successfully constructed function is
//! failure-as-value: operations report domain mismatches and capacity
//! overflows as `None` and keep going. Malformed raw input at the
//! construction boundary is the one place the engine raises.

use thiserror::Error;

/// Raised when a comparison function cannot be built from raw records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstructionError {
    /// A record references a unit index outside `0..units`.
    #[error("unit index {index} out of range (units = {units})")]
    UnitOutOfRange { index: usize, units: usize },

    /// A record references a series index outside `0..series`.
    #[error("series index {index} out of range (series = {series})")]
    SeriesOutOfRange { index: usize, series: usize },

    /// Two records name the same (unit, unit, series) cell.
    #[error("duplicate record at (u{left}, u{right}, s{series})")]
    DuplicateRecord { left: usize, right: usize, series: usize },

    /// A record carries the algebra's null; absence must be expressed by
    /// omitting the record, never by storing null.
    #[error("null value at (u{left}, u{right}, s{series})")]
    NullValue { left: usize, right: usize, series: usize },

    /// The declared unit/series counts produce row or word counts that do
    /// not fit the fixed-width indexing domain.
    #[error("capacity overflow: {what} for {units} units x {series} series")]
    CapacityOverflow { what: &'static str, units: usize, series: usize },
}
