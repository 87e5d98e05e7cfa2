//! Problem configuration shared by sessions, the harness and the CLI

use crate::core::{DataType, KernelType, Result, SVMError};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Data representation, kernel and hyperparameters of one classification problem
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemParams {
    pub data_type: DataType,
    pub kernel: KernelType,
    /// Polynomial degree, or subsequence length for the subsequence kernel
    pub degree: u32,
    /// Kernel width; the decay factor for the subsequence kernel
    pub gamma: f64,
    pub coef0: f64,
    /// Regularization parameter C
    pub c: f64,
}

impl Default for ProblemParams {
    fn default() -> Self {
        Self {
            data_type: DataType::Vector,
            kernel: KernelType::Linear,
            degree: 3,
            gamma: 0.5,
            coef0: 0.0,
            c: 1.0,
        }
    }
}

impl fmt::Display for ProblemParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} kernel over {} data (degree {}, gamma {}, coef0 {}, C {})",
            self.kernel, self.data_type, self.degree, self.gamma, self.coef0, self.c
        )
    }
}

/// On-disk form of [`ProblemParams`]; names are checked when converted
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParamsFile {
    data_type: String,
    kernel: String,
    degree: Option<u32>,
    gamma: Option<f64>,
    coef0: Option<f64>,
    c: Option<f64>,
}

impl ProblemParams {
    /// Parse and validate parameters from JSON, e.g.
    /// `{"data_type": "string", "kernel": "edit", "gamma": 0.1}`
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ParamsFile =
            serde_json::from_str(json).map_err(|e| SVMError::SerializationError(e.to_string()))?;
        let defaults = Self::default();
        let params = Self {
            data_type: file.data_type.parse()?,
            kernel: file.kernel.parse()?,
            degree: file.degree.unwrap_or(defaults.degree),
            gamma: file.gamma.unwrap_or(defaults.gamma),
            coef0: file.coef0.unwrap_or(defaults.coef0),
            c: file.c.unwrap_or(defaults.c),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Check the kernel/data pairing and hyperparameter ranges
    pub fn validate(&self) -> Result<()> {
        if !self.kernel.accepts(self.data_type) {
            return Err(SVMError::IncompatibleKernel {
                kernel: self.kernel.to_string(),
                data_type: self.data_type.to_string(),
            });
        }
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "C must be positive, got: {}",
                self.c
            )));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "Gamma must be positive, got: {}",
                self.gamma
            )));
        }
        if !self.coef0.is_finite() {
            return Err(SVMError::InvalidParameter(format!(
                "coef0 must be finite, got: {}",
                self.coef0
            )));
        }
        match self.kernel {
            KernelType::Poly | KernelType::Subsequence if self.degree == 0 => {
                Err(SVMError::InvalidParameter(
                    "Degree must be positive".to_string(),
                ))
            }
            KernelType::Subsequence if self.gamma > 1.0 => Err(SVMError::InvalidParameter(
                format!("Subsequence decay (gamma) must be at most 1, got: {}", self.gamma),
            )),
            _ => Ok(()),
        }
    }

    /// Name identifying a trained model for this problem and label column
    pub fn identity(&self, label_column: &str) -> String {
        format!(
            "{}-{}-{}-d{}-g{}-r{}-c{}",
            label_column, self.data_type, self.kernel, self.degree, self.gamma, self.coef0, self.c
        )
    }

    /// Where the model for this problem lives inside `model_dir`
    pub fn model_path<P: AsRef<Path>>(&self, model_dir: P, label_column: &str) -> PathBuf {
        model_dir
            .as_ref()
            .join(format!("{}.model", self.identity(label_column)))
    }
}
