//! Uniform draws shared by the generators

use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Uniform draw between `a` and `b`, inclusive, in either order.
///
/// Degenerate ranges (`a == b`) return `a`, which is how unknown conditions
/// and medications contribute a zero effect.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, a: f64, b: f64) -> f64 {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    if low == high {
        return low;
    }
    Uniform::new_inclusive(low, high).sample(rng)
}
