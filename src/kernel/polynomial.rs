//! Polynomial kernel over token count vectors
//!
//! K(x, y) = (γ * <x, y> + coef0)^degree. Raising the shared-token score to
//! `degree` lets the classifier weigh combinations of tokens, not only single
//! tokens.

use crate::core::SparseVector;
use crate::kernel::linear::dot_product_sparse;
use crate::kernel::traits::Kernel;

#[derive(Debug, Clone, Copy)]
pub struct PolynomialKernel {
    pub degree: u32,
    pub gamma: f64,
    /// Added before raising to `degree`; a negative value can flip the sign
    /// for odd degrees
    pub coef0: f64,
}

impl PolynomialKernel {
    /// # Panics
    /// Panics if `degree` is zero or `gamma` is not positive
    pub fn new(degree: u32, gamma: f64, coef0: f64) -> Self {
        assert!(degree > 0, "Polynomial degree must be positive");
        assert!(gamma > 0.0, "Gamma must be positive");
        Self {
            degree,
            gamma,
            coef0,
        }
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        let base = self.gamma * dot_product_sparse(x, y) + self.coef0;
        base.powi(i32::try_from(self.degree).unwrap_or(i32::MAX))
    }
}
