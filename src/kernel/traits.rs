//! Kernel trait definition

use crate::core::SparseVector;

/// Kernel function trait
///
/// `T` is the representation the kernel compares: sparse vectors for the
/// vector kernels, byte or token slices for the sequence kernels.
pub trait Kernel<T: ?Sized = SparseVector>: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &T, y: &T) -> f64;
}
