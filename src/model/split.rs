//! Randomised train/validation hold-out.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices for each side of the split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldoutSplit {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Shuffle `0..n` and hold out `ceil(fraction * n)` rows, always leaving at
/// least one training row.
pub fn train_validation_split(n: usize, fraction: f64, seed: Option<u64>) -> HoldoutSplit {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let wanted = (fraction.clamp(0.0, 1.0) * n as f64).ceil() as usize;
    let held_out = wanted.min(n.saturating_sub(1));

    let train = indices.split_off(held_out);
    HoldoutSplit {
        train,
        validation: indices,
    }
}
