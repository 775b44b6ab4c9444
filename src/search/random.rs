//! Uniform random selection.

use rand::seq::SliceRandom;
use rand::Rng;

/// Pick one element uniformly at random; `None` for an empty slice.
///
/// Intended to run on an already filtered snapshot, so the pick honours
/// the active filters.
pub fn pick_random<'a, T, R>(candidates: &'a [T], rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    candidates.choose(rng)
}
