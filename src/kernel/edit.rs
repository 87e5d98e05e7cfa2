//! Edit-distance kernel for strings and token sequences
//!
//! K(s, t) = exp(-γ * lev(s, t)) where lev is the Levenshtein distance.

use crate::kernel::Kernel;

#[derive(Debug, Clone, Copy)]
pub struct EditKernel {
    gamma: f64,
}

impl EditKernel {
    /// # Panics
    /// Panics if gamma is not positive
    pub fn new(gamma: f64) -> Self {
        assert!(gamma > 0.0, "Gamma must be positive, got: {}", gamma);
        Self { gamma }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl<T: PartialEq> Kernel<[T]> for EditKernel {
    fn compute(&self, x: &[T], y: &[T]) -> f64 {
        (-self.gamma * levenshtein(x, y) as f64).exp()
    }
}

/// Minimum number of insertions, deletions and substitutions turning `a` into `b`
pub fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, x) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, y) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(x != y);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
