use rand::{thread_rng, Rng};

/// Source of uniform random numbers used for bucketing.
pub trait RandomSource {
    /// Return a uniformly distributed value in `[0, 1)`.
    fn next_f64(&self) -> f64;
}

/// [`RandomSource`] backed by [`rand::thread_rng`].
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        thread_rng().gen::<f64>()
    }
}

/// Draw an index with probability proportional to its weight.
///
/// Returns `None` if the total weight is zero or the walk falls off the end, which can happen
/// for a draw landing exactly on the upper boundary.
pub fn weighted_random(weights: &[f64], random: &impl RandomSource) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let mut r = random.next_f64() * total;
    for (i, weight) in weights.iter().enumerate() {
        if r < *weight {
            return Some(i);
        }
        r -= weight;
    }
    None
}

/// Call [`weighted_random`] up to `weights.len()` times until it produces an index.
pub fn draw_with_retries(weights: &[f64], random: &impl RandomSource) -> Option<usize> {
    (0..weights.len()).find_map(|_| weighted_random(weights, random))
}

impl<T: RandomSource + ?Sized> RandomSource for Box<T> {
    fn next_f64(&self) -> f64 {
        (**self).next_f64()
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
#[cfg(test)]
pub struct SequenceRandom {
    values: Vec<f64>,
    next: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl SequenceRandom {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        SequenceRandom {
            values: values.into(),
            next: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
impl RandomSource for SequenceRandom {
    fn next_f64(&self) -> f64 {
        let i = self
            .next
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.values[i % self.values.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::{draw_with_retries, weighted_random, SequenceRandom, ThreadRandom};

    #[test]
    fn picks_by_cumulative_weight() {
        let weights = [1.0, 1.0, 2.0];
        assert_eq!(weighted_random(&weights, &SequenceRandom::new([0.0])), Some(0));
        assert_eq!(weighted_random(&weights, &SequenceRandom::new([0.3])), Some(1));
        assert_eq!(weighted_random(&weights, &SequenceRandom::new([0.5])), Some(2));
        assert_eq!(weighted_random(&weights, &SequenceRandom::new([0.99])), Some(2));
    }

    #[test]
    fn zero_weight_is_never_selected() {
        for _ in 0..10_000 {
            assert_eq!(weighted_random(&[0.0, 0.0, 5.0], &ThreadRandom), Some(2));
        }
    }

    #[test]
    fn zero_total_draws_nothing() {
        assert_eq!(weighted_random(&[0.0, 0.0], &ThreadRandom), None);
        assert_eq!(weighted_random(&[], &ThreadRandom), None);
        assert_eq!(draw_with_retries(&[0.0, 0.0], &ThreadRandom), None);
    }

    #[test]
    fn boundary_draw_is_retried() {
        // 1.0 is outside [0, 1) and walks off the end; the retry succeeds.
        let random = SequenceRandom::new([1.0, 0.1]);
        assert_eq!(draw_with_retries(&[1.0, 1.0], &random), Some(0));
    }

    #[test]
    fn retries_are_bounded_by_variant_count() {
        let random = SequenceRandom::new([1.0, 1.0, 0.1]);
        assert_eq!(draw_with_retries(&[1.0, 1.0], &random), None);
    }
}
