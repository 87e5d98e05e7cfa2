//! Linear kernel over token count vectors
//!
//! With the vector data type each sample is the histogram of its token ids,
//! so K(x, y) counts co-occurring tokens weighted by how often each side
//! uses them. Tokens absent from either sample contribute nothing.

use crate::core::SparseVector;
use crate::kernel::Kernel;

/// K(x, y) = <x, y>
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKernel;

impl LinearKernel {
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        dot_product_sparse(x, y)
    }
}

/// Walk the union of the indices of `x` and `y` in ascending order
///
/// `f` receives both values at every index, with 0.0 standing in for the
/// side that has no entry there.
pub(crate) fn merge_sparse<F: FnMut(f64, f64)>(x: &SparseVector, y: &SparseVector, mut f: F) {
    let (mut i, mut j) = (0, 0);
    while i < x.indices.len() && j < y.indices.len() {
        match x.indices[i].cmp(&y.indices[j]) {
            std::cmp::Ordering::Equal => {
                f(x.values[i], y.values[j]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                f(x.values[i], 0.0);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                f(0.0, y.values[j]);
                j += 1;
            }
        }
    }
    x.values[i..].iter().for_each(|&v| f(v, 0.0));
    y.values[j..].iter().for_each(|&v| f(0.0, v));
}

/// Sum of products over the indices both vectors share
pub(crate) fn dot_product_sparse(x: &SparseVector, y: &SparseVector) -> f64 {
    let mut sum = 0.0;
    merge_sparse(x, y, |a, b| sum += a * b);
    sum
}
