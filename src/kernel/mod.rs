//! Kernel functions for SVM
//!
//! Vector kernels (linear, polynomial, RBF) compare sparse count vectors;
//! sequence kernels (edit, subsequence) compare raw strings byte-wise or
//! token sequences element-wise. [`KernelFunction`] picks the kernel named by
//! an [`SvmParameter`] and dispatches on the encoded value.

pub mod edit;
pub mod linear;
pub mod polynomial;
pub mod rbf;
pub mod subsequence;
pub mod traits;

pub use self::edit::*;
pub use self::linear::*;
pub use self::polynomial::*;
pub use self::rbf::*;
pub use self::subsequence::*;
pub use self::traits::*;

use crate::core::{EncodedValue, KernelType, Result};
use crate::solver::SvmParameter;

/// Kernel selected by solver parameters
#[derive(Debug, Clone, Copy)]
pub enum KernelFunction {
    Linear(LinearKernel),
    Polynomial(PolynomialKernel),
    Rbf(RBFKernel),
    Edit(EditKernel),
    Subsequence(SubsequenceKernel),
}

impl KernelFunction {
    pub fn from_parameter(param: &SvmParameter) -> Result<Self> {
        param.validate()?;
        Ok(match param.kernel_type {
            KernelType::Linear => KernelFunction::Linear(LinearKernel::new()),
            KernelType::Poly => KernelFunction::Polynomial(PolynomialKernel::new(
                param.degree,
                param.gamma,
                param.coef0,
            )),
            KernelType::Rbf => KernelFunction::Rbf(RBFKernel::new(param.gamma)),
            KernelType::Edit => KernelFunction::Edit(EditKernel::new(param.gamma)),
            KernelType::Subsequence => KernelFunction::Subsequence(SubsequenceKernel::new(
                param.degree as usize,
                param.gamma,
            )),
        })
    }

    /// Compute K(x, y)
    ///
    /// Pairs of values the kernel does not accept (a string under a vector
    /// kernel, or a string against a token sequence) evaluate to 0. The
    /// solver checks every value's data type before evaluating any kernel.
    pub fn compute(&self, x: &EncodedValue, y: &EncodedValue) -> f64 {
        use EncodedValue::*;

        match (self, x, y) {
            (KernelFunction::Linear(k), Vector(x), Vector(y)) => k.compute(x, y),
            (KernelFunction::Polynomial(k), Vector(x), Vector(y)) => k.compute(x, y),
            (KernelFunction::Rbf(k), Vector(x), Vector(y)) => k.compute(x, y),
            (KernelFunction::Edit(k), Text(x), Text(y)) => k.compute(x.as_bytes(), y.as_bytes()),
            (KernelFunction::Edit(k), Tokens(x), Tokens(y)) => k.compute(x.as_slice(), y.as_slice()),
            (KernelFunction::Subsequence(k), Text(x), Text(y)) => {
                k.compute(x.as_bytes(), y.as_bytes())
            }
            (KernelFunction::Subsequence(k), Tokens(x), Tokens(y)) => {
                k.compute(x.as_slice(), y.as_slice())
            }
            _ => 0.0,
        }
    }

    pub fn kernel_type(&self) -> KernelType {
        match self {
            KernelFunction::Linear(_) => KernelType::Linear,
            KernelFunction::Polynomial(_) => KernelType::Poly,
            KernelFunction::Rbf(_) => KernelType::Rbf,
            KernelFunction::Edit(_) => KernelType::Edit,
            KernelFunction::Subsequence(_) => KernelType::Subsequence,
        }
    }
}
