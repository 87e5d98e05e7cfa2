//! Gap-weighted subsequence kernel (Lodhi et al., 2002)
//!
//! Counts common subsequences of a fixed length `n`, each occurrence weighted
//! by `λ^span` so that gappy matches count less. Values are normalized:
//! K(s, t) / sqrt(K(s, s) * K(t, t)).

use crate::kernel::Kernel;

#[derive(Debug, Clone, Copy)]
pub struct SubsequenceKernel {
    length: usize,
    decay: f64,
}

impl SubsequenceKernel {
    /// # Panics
    /// Panics if `length` is zero or `decay` is outside (0, 1]
    pub fn new(length: usize, decay: f64) -> Self {
        assert!(length > 0, "Subsequence length must be positive");
        assert!(
            decay > 0.0 && decay <= 1.0,
            "Decay must be in (0, 1], got: {}",
            decay
        );
        Self { length, decay }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Unnormalized kernel value
    pub fn raw<T: PartialEq>(&self, s: &[T], t: &[T]) -> f64 {
        let n = self.length;
        let lambda = self.decay;
        let lambda_sq = lambda * lambda;
        if s.len() < n || t.len() < n {
            return 0.0;
        }

        // kp[a][b] = K'_i(s[..a], t[..b]), starting from K'_0 = 1
        let mut kp = vec![vec![1.0; t.len() + 1]; s.len() + 1];
        for i in 1..n {
            let mut next = vec![vec![0.0; t.len() + 1]; s.len() + 1];
            for a in i..=s.len() {
                let mut kpp = 0.0;
                for b in i..=t.len() {
                    kpp *= lambda;
                    if s[a - 1] == t[b - 1] {
                        kpp += lambda_sq * kp[a - 1][b - 1];
                    }
                    next[a][b] = lambda * next[a - 1][b] + kpp;
                }
            }
            kp = next;
        }

        let mut total = 0.0;
        for a in n..=s.len() {
            for b in n..=t.len() {
                if s[a - 1] == t[b - 1] {
                    total += lambda_sq * kp[a - 1][b - 1];
                }
            }
        }
        total
    }
}

impl<T: PartialEq> Kernel<[T]> for SubsequenceKernel {
    fn compute(&self, x: &[T], y: &[T]) -> f64 {
        let norm = (self.raw(x, x) * self.raw(y, y)).sqrt();
        if norm == 0.0 {
            return 0.0;
        }
        self.raw(x, y) / norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_character_subsequences() {
        // every matching character pair contributes λ²
        let kernel = SubsequenceKernel::new(1, 0.5);
        assert_relative_eq!(kernel.raw(b"ab", b"ab"), 2.0 * 0.25, epsilon = 1e-12);
        assert_relative_eq!(kernel.raw(b"aa", b"a"), 2.0 * 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_two_character_subsequences() {
        // "cat" vs "cat" with n = 2: ca (λ^4), at (λ^4), ct (λ^6)
        let lambda: f64 = 0.5;
        let kernel = SubsequenceKernel::new(2, lambda);
        let expected = 2.0 * lambda.powi(4) + lambda.powi(6);
        assert_relative_eq!(kernel.raw(b"cat", b"cat"), expected, epsilon = 1e-12);

        // "cat" vs "car" share only "ca": λ² * λ²
        assert_relative_eq!(kernel.raw(b"cat", b"car"), lambda.powi(4), epsilon = 1e-12);
    }

    #[test]
    fn test_normalized_values() {
        let kernel = SubsequenceKernel::new(2, 0.7);
        assert_relative_eq!(kernel.compute(&b"science"[..], &b"science"[..]), 1.0, epsilon = 1e-12);

        let k = kernel.compute(&b"science"[..], &b"silence"[..]);
        assert!(k > 0.0 && k < 1.0);
    }

    #[test]
    fn test_short_inputs() {
        let kernel = SubsequenceKernel::new(3, 0.5);
        assert_eq!(kernel.compute(&b"ab"[..], &b"abc"[..]), 0.0);
        assert_eq!(kernel.raw(b"abc", b"ab"), 0.0);
    }

    #[test]
    fn test_token_sequences() {
        let kernel = SubsequenceKernel::new(2, 0.5);
        let x: &[u32] = &[7, 8, 9];
        let y: &[u32] = &[7, 8, 9];
        let z: &[u32] = &[1, 2, 3];
        assert_relative_eq!(kernel.compute(x, y), 1.0, epsilon = 1e-12);
        assert_eq!(kernel.compute(x, z), 0.0);
    }

    #[test]
    #[should_panic(expected = "Decay must be in (0, 1]")]
    fn test_invalid_decay() {
        SubsequenceKernel::new(2, 1.5);
    }
}
