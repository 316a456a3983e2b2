use crate::experiment::Variants;

/// Total weight of an equal split across nested experiments.
const BRANCH_TOTAL: u32 = 100;

/// Turn variants into a weight list.
///
/// Explicit weights are returned as authored, with a missing weight counting as `1`. Nested
/// experiments get an integer split summing to exactly 100, with the remainder going to the first
/// entries (e.g., 3 children give `[34, 33, 33]`).
pub fn calculate_distribution(variants: &Variants) -> Vec<f64> {
    match variants {
        Variants::Weights(weights) => weights.iter().map(|w| w.unwrap_or(1.0)).collect(),
        Variants::Experiments(children) => equal_split(children.len()),
    }
}

fn equal_split(n: usize) -> Vec<f64> {
    let Ok(count) = u32::try_from(n) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }

    let base = BRANCH_TOTAL / count;
    let residual = BRANCH_TOTAL - base * count;
    (0..count)
        .map(|i| f64::from(if i < residual { base + 1 } else { base }))
        .collect()
}
