//! Gaussian kernel over token count vectors
//!
//! K(x, y) = exp(-γ * ||x - y||²). Two samples built from the same tokens in
//! the same amounts score 1 regardless of token order; every token one side
//! uses more often than the other pushes the score towards 0.

use crate::core::SparseVector;
use crate::kernel::linear::merge_sparse;
use crate::kernel::Kernel;

#[derive(Debug, Clone, Copy)]
pub struct RBFKernel {
    gamma: f64,
}

impl RBFKernel {
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

impl Kernel for RBFKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        (-self.gamma * squared_distance(x, y)).exp()
    }
}

/// ||x - y||², with indices missing from one side counted as zero there
fn squared_distance(x: &SparseVector, y: &SparseVector) -> f64 {
    let mut sum = 0.0;
    merge_sparse(x, y, |a, b| sum += (a - b) * (a - b));
    sum
}
