//! Core type definitions: samples, data types, kernels and encoded values

use crate::core::{Result, SVMError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Representation every sample of a session is encoded into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Sparse token-count vectors
    Vector,
    /// Raw strings
    String,
    /// Integer token sequences
    Tokens,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Vector => "vector",
            DataType::String => "string",
            DataType::Tokens => "tokens",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = SVMError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vector" => Ok(DataType::Vector),
            "string" => Ok(DataType::String),
            "tokens" => Ok(DataType::Tokens),
            other => Err(SVMError::UnknownDataType(other.to_string())),
        }
    }
}

/// Kernel identifier handed to the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelType {
    Linear,
    Poly,
    #[serde(alias = "RBF")]
    Rbf,
    Edit,
    #[serde(rename = "subseq", alias = "subsequence")]
    Subsequence,
}

impl KernelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KernelType::Linear => "linear",
            KernelType::Poly => "poly",
            KernelType::Rbf => "rbf",
            KernelType::Edit => "edit",
            KernelType::Subsequence => "subseq",
        }
    }

    /// Whether the kernel operates on sparse vectors (as opposed to sequences)
    pub fn is_vector_kernel(&self) -> bool {
        matches!(self, KernelType::Linear | KernelType::Poly | KernelType::Rbf)
    }

    /// Whether this kernel accepts values of the given data type
    pub fn accepts(&self, data_type: DataType) -> bool {
        self.is_vector_kernel() == (data_type == DataType::Vector)
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernelType {
    type Err = SVMError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(KernelType::Linear),
            "poly" => Ok(KernelType::Poly),
            "rbf" | "RBF" => Ok(KernelType::Rbf),
            "edit" => Ok(KernelType::Edit),
            "subseq" | "subsequence" => Ok(KernelType::Subsequence),
            other => Err(SVMError::UnknownKernel(other.to_string())),
        }
    }
}

/// Sparse vector representation with sorted indices
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    /// Sorted indices of non-zero elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Iterate over `(index, value)` pairs in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Compute squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|&v| v * v).sum()
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// A sample as encoded for the solver, one variant per [`DataType`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EncodedValue {
    Text(String),
    Tokens(Vec<u32>),
    Vector(SparseVector),
}

impl EncodedValue {
    pub fn data_type(&self) -> DataType {
        match self {
            EncodedValue::Text(_) => DataType::String,
            EncodedValue::Tokens(_) => DataType::Tokens,
            EncodedValue::Vector(_) => DataType::Vector,
        }
    }
}

/// A labeled sample as read from the sample store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    pub label: String,
    /// Raw string consumed by string kernels
    pub raw: String,
    pub tokens: Vec<u32>,
}

impl Sample {
    pub fn new(label: impl Into<String>, raw: impl Into<String>, tokens: Vec<u32>) -> Self {
        Self {
            label: label.into(),
            raw: raw.into(),
            tokens,
        }
    }

    /// Build a sample from a stored row, splitting `token_string` on whitespace
    pub fn parse(label: &str, raw: &str, token_string: &str) -> Result<Self> {
        let tokens = token_string
            .split_whitespace()
            .map(|t| {
                t.parse::<u32>()
                    .map_err(|_| SVMError::ParseError(format!("Invalid token: {t}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(label, raw, tokens))
    }

    /// Largest token in this sample, if it has any
    pub fn max_token(&self) -> Option<u32> {
        self.tokens.iter().copied().max()
    }
}
