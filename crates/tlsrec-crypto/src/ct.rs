//! Constant-time helpers built on `subtle`.
//!
//! Lengths are widened to `u64` so the comparisons stay branch-free
//! regardless of the platform word size.

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq, ConstantTimeGreater, ConstantTimeLess};

/// Constant-time slice equality. Slices of different length compare unequal.
pub fn bytes_eq(a: &[u8], b: &[u8]) -> Choice {
    a.ct_eq(b)
}

/// `a <= b` without a data-dependent branch.
pub fn is_lte(a: usize, b: usize) -> Choice {
    !(a as u64).ct_gt(&(b as u64))
}

/// `a < b` without a data-dependent branch.
pub fn is_lt(a: usize, b: usize) -> Choice {
    (a as u64).ct_lt(&(b as u64))
}

/// `a == b` without a data-dependent branch.
pub fn is_equal(a: usize, b: usize) -> Choice {
    (a as u64).ct_eq(&(b as u64))
}

/// Returns `a` if `choice` is set, else `b`.
pub fn select(choice: Choice, a: usize, b: usize) -> usize {
    u64::conditional_select(&(b as u64), &(a as u64), choice) as usize
}
