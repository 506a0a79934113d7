//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Return the index before `index` in a cyclic sequence of length `len`.
///
/// `len` must be non-zero.
pub fn prev_index(index: usize, len: usize) -> usize {
    (index + len - 1) % len
}

/// Return the index after `index` in a cyclic sequence of length `len`.
///
/// `len` must be non-zero.
pub fn next_index(index: usize, len: usize) -> usize {
    (index + 1) % len
}

/// Speed reached after braking over `dist` at a constant deceleration `decel`, i.e. the speed
/// from which the vehicle can stop within `dist`.
///
/// From `v^2 = u^2 + 2as` with a final speed of zero. Negative distances give zero.
pub fn stopping_speed<T>(decel: T, dist: T) -> T
where
    T: Float,
{
    let two = T::one() + T::one();
    (two * decel * dist.max(T::zero())).sqrt()
}
