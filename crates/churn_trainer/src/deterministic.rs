//! Deterministic utilities for reproducible training
//!
//! LCG-based RNG and a seeded stratified holdout split so that the same
//! seed always selects the same rows on every platform.

use crate::errors::TrainerError;
use std::num::Wrapping;

/// Linear Congruential Generator for deterministic pseudo-randomness
/// Uses constants from Numerical Recipes (glibc)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<u64>,
}

impl LcgRng {
    // LCG constants (compatible with glibc)
    const MULTIPLIER: u64 = 1103515245;
    const INCREMENT: u64 = 12345;
    const MODULUS: u64 = 1 << 31;

    pub fn new(seed: u64) -> Self {
        Self {
            state: Wrapping(seed % Self::MODULUS),
        }
    }

    /// Next value in [0, 2^31)
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        self.state.0 & (Self::MODULUS - 1)
    }

    /// Uniform-ish index in [0, bound)
    pub fn next_below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        (self.next_u64() % bound as u64) as usize
    }

    /// Fisher-Yates shuffle
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_below(i + 1);
            items.swap(i, j);
        }
    }
}

/// Row indices of the training and holdout parts, each in ascending order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldoutSplit {
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

/// Split rows so each label keeps its share in both parts.
/// A fraction of 0 keeps every row for training.
pub fn stratified_split(labels: &[u8], fraction: f64, seed: u64) -> Result<HoldoutSplit, TrainerError> {
    if !(0.0..1.0).contains(&fraction) {
        return Err(TrainerError::InvalidSplit(format!(
            "holdout fraction must be in [0, 1), got {}",
            fraction
        )));
    }

    let mut rng = LcgRng::new(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut holdout = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == class)
            .map(|(idx, _)| idx)
            .collect();
        rng.shuffle(&mut members);

        // keep at least one row of each class for fitting
        let take = ((members.len() as f64) * fraction).round() as usize;
        let take = take.min(members.len().saturating_sub(1));
        holdout.extend_from_slice(&members[..take]);
        train.extend_from_slice(&members[take..]);
    }

    train.sort_unstable();
    holdout.sort_unstable();
    Ok(HoldoutSplit { train, holdout })
}
