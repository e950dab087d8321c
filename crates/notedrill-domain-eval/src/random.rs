/// Uniform integer draws. Every random decision in the drill goes through
/// this, so a seeded generator reproduces a whole session.
pub trait RandomSource {
    /// Uniform value in `0..upper`. Callers never pass 0.
    fn below(&mut self, upper: usize) -> usize;
}

impl<R: rand::Rng> RandomSource for R {
    fn below(&mut self, upper: usize) -> usize {
        self.random_range(0..upper)
    }
}

pub fn choose<T: Copy>(rng: &mut impl RandomSource, items: &[T]) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    Some(items[rng.below(items.len())])
}

/// `true` with probability `numerator / denominator`.
pub fn chance(rng: &mut impl RandomSource, numerator: usize, denominator: usize) -> bool {
    rng.below(denominator) < numerator
}
