//! Request shapes exchanged with the solver
//!
//! Each encoded value travels in the form the solver reads directly:
//! - string: the raw bytes
//! - tokens: `[len, t0, t1, ...]`
//! - vector: `(index, value)` nodes in ascending index order, closed by a
//!   sentinel node with index -1

use crate::config::ProblemParams;
use crate::core::{DataType, EncodedValue, KernelType, Result, SVMError, SparseVector};
use serde::{Deserialize, Serialize};

/// Index marking the end of a node list
pub const SENTINEL_INDEX: i32 = -1;

/// One entry of a sparse vector on the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvmNode {
    pub index: i32,
    pub value: f64,
}

impl SvmNode {
    pub fn sentinel() -> Self {
        Self {
            index: SENTINEL_INDEX,
            value: 0.0,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.index == SENTINEL_INDEX
    }
}

/// One sample or query as handed to the solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SvmData {
    Bytes(Vec<u8>),
    /// Length-prefixed token array
    Tokens(Vec<u32>),
    /// Sentinel-terminated node list
    Nodes(Vec<SvmNode>),
}

impl SvmData {
    pub fn encode(value: &EncodedValue) -> Result<Self> {
        match value {
            EncodedValue::Text(s) => Ok(SvmData::Bytes(s.as_bytes().to_vec())),
            EncodedValue::Tokens(tokens) => {
                let len = u32::try_from(tokens.len()).map_err(|_| {
                    SVMError::InvalidDataset(format!("Token sequence too long: {}", tokens.len()))
                })?;
                let mut wire = Vec::with_capacity(tokens.len() + 1);
                wire.push(len);
                wire.extend_from_slice(tokens);
                Ok(SvmData::Tokens(wire))
            }
            EncodedValue::Vector(vector) => {
                let mut nodes = Vec::with_capacity(vector.nnz() + 1);
                for (index, value) in vector.iter() {
                    let index = i32::try_from(index).map_err(|_| {
                        SVMError::InvalidDataset(format!("Feature index too large: {index}"))
                    })?;
                    nodes.push(SvmNode { index, value });
                }
                nodes.push(SvmNode::sentinel());
                Ok(SvmData::Nodes(nodes))
            }
        }
    }

    /// Encode `value`, requiring it to have the expected data type
    pub fn encode_as(value: &EncodedValue, expected: DataType) -> Result<Self> {
        let actual = value.data_type();
        if actual != expected {
            return Err(SVMError::DataTypeMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Self::encode(value)
    }

    /// Read the value back, checking the framing
    pub fn decode(&self) -> Result<EncodedValue> {
        match self {
            SvmData::Bytes(bytes) => String::from_utf8(bytes.clone())
                .map(EncodedValue::Text)
                .map_err(|_| SVMError::InvalidDataset("String data is not UTF-8".to_string())),
            SvmData::Tokens(wire) => {
                let (&len, tokens) = wire.split_first().ok_or_else(|| {
                    SVMError::InvalidDataset("Token data without length prefix".to_string())
                })?;
                if len as usize != tokens.len() {
                    return Err(SVMError::InvalidDataset(format!(
                        "Token length prefix {} does not match {} tokens",
                        len,
                        tokens.len()
                    )));
                }
                Ok(EncodedValue::Tokens(tokens.to_vec()))
            }
            SvmData::Nodes(nodes) => {
                let (last, entries) = nodes.split_last().ok_or_else(|| {
                    SVMError::InvalidDataset("Empty node list".to_string())
                })?;
                if !last.is_sentinel() {
                    return Err(SVMError::InvalidDataset(
                        "Node list is missing its sentinel".to_string(),
                    ));
                }
                let mut indices = Vec::with_capacity(entries.len());
                let mut values = Vec::with_capacity(entries.len());
                for node in entries {
                    let index = usize::try_from(node.index).map_err(|_| {
                        SVMError::InvalidDataset(format!("Negative feature index {}", node.index))
                    })?;
                    if indices.last().is_some_and(|&prev| prev >= index) {
                        return Err(SVMError::InvalidDataset(format!(
                            "Feature indices not ascending at {index}"
                        )));
                    }
                    indices.push(index);
                    values.push(node.value);
                }
                Ok(EncodedValue::Vector(SparseVector { indices, values }))
            }
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            SvmData::Bytes(_) => DataType::String,
            SvmData::Tokens(_) => DataType::Tokens,
            SvmData::Nodes(_) => DataType::Vector,
        }
    }
}

/// A finalized training problem: `l` numeric labels and values
#[derive(Debug, Clone, PartialEq)]
pub struct SvmProblem {
    pub l: usize,
    pub y: Vec<f64>,
    pub x: Vec<SvmData>,
}

impl SvmProblem {
    pub fn new(labels: &[f64], values: &[EncodedValue], data_type: DataType) -> Result<Self> {
        if labels.len() != values.len() {
            return Err(SVMError::InvalidDataset(format!(
                "Need equal number of values and labels, got {} labels and {} values",
                labels.len(),
                values.len()
            )));
        }
        let x = values
            .iter()
            .map(|v| SvmData::encode_as(v, data_type))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            l: labels.len(),
            y: labels.to_vec(),
            x,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SvmType {
    /// C-support vector classification
    CSvc,
}

/// Solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmParameter {
    pub svm_type: SvmType,
    pub data_type: DataType,
    pub kernel_type: KernelType,
    pub degree: u32,
    pub gamma: f64,
    pub coef0: f64,
    /// Kernel cache size in MB
    pub cache_size: f64,
    /// Stopping tolerance
    pub eps: f64,
    pub c: f64,
    pub nu: f64,
    pub p: f64,
    pub shrinking: bool,
    pub probability: bool,
    pub max_iterations: usize,
}

impl SvmParameter {
    /// Solver configuration for a validated problem
    ///
    /// Shrinking is switched off for the subsequence kernel, which converges
    /// poorly with it.
    pub fn new(params: &ProblemParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            svm_type: SvmType::CSvc,
            data_type: params.data_type,
            kernel_type: params.kernel,
            degree: params.degree,
            gamma: params.gamma,
            coef0: params.coef0,
            cache_size: 100.0,
            eps: 1e-3,
            c: params.c,
            nu: 0.5,
            p: 0.1,
            shrinking: params.kernel != KernelType::Subsequence,
            probability: false,
            max_iterations: 100_000,
        })
    }

    /// The problem parameters this configuration was built from
    pub fn problem_params(&self) -> ProblemParams {
        ProblemParams {
            data_type: self.data_type,
            kernel: self.kernel_type,
            degree: self.degree,
            gamma: self.gamma,
            coef0: self.coef0,
            c: self.c,
        }
    }

    /// Re-check a parameter set that did not come through [`SvmParameter::new`]
    pub fn validate(&self) -> Result<()> {
        self.problem_params().validate()?;
        if !(self.eps > 0.0 && self.cache_size > 0.0) {
            return Err(SVMError::InvalidParameter(
                "eps and cache_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Kernel cache size in bytes
    pub fn cache_bytes(&self) -> usize {
        (self.cache_size * 1024.0 * 1024.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_wire_is_raw_bytes() {
        let wire = SvmData::encode(&EncodedValue::Text("Opera/9.80".into())).unwrap();
        assert_eq!(wire, SvmData::Bytes(b"Opera/9.80".to_vec()));
    }

    #[test]
    fn test_token_wire_is_length_prefixed() {
        let wire = SvmData::encode(&EncodedValue::Tokens(vec![4, 0, 4])).unwrap();
        assert_eq!(wire, SvmData::Tokens(vec![3, 4, 0, 4]));

        let empty = SvmData::encode(&EncodedValue::Tokens(vec![])).unwrap();
        assert_eq!(empty, SvmData::Tokens(vec![0]));
    }

    #[test]
    fn test_vector_wire_is_sentinel_terminated() {
        let vector = SparseVector::new(vec![1, 2, 5], vec![2.0, 1.0, 1.0]);
        let wire = SvmData::encode(&EncodedValue::Vector(vector)).unwrap();

        let expected = vec![
            SvmNode {
                index: 1,
                value: 2.0,
            },
            SvmNode {
                index: 2,
                value: 1.0,
            },
            SvmNode {
                index: 5,
                value: 1.0,
            },
            SvmNode::sentinel(),
        ];
        assert_eq!(wire, SvmData::Nodes(expected));
    }

    #[test]
    fn test_decode_checks_framing() {
        assert!(SvmData::Tokens(vec![3, 1, 2]).decode().is_err());
        assert!(SvmData::Tokens(vec![]).decode().is_err());
        assert!(SvmData::Nodes(vec![SvmNode {
            index: 1,
            value: 1.0
        }])
        .decode()
        .is_err());
        assert!(SvmData::Nodes(vec![
            SvmNode {
                index: 4,
                value: 1.0
            },
            SvmNode {
                index: 2,
                value: 1.0
            },
            SvmNode::sentinel(),
        ])
        .decode()
        .is_err());

        let value = SvmData::Tokens(vec![2, 9, 9]).decode().unwrap();
        assert_eq!(value, EncodedValue::Tokens(vec![9, 9]));
    }

    #[test]
    fn test_encode_as_rejects_other_data_types() {
        let result = SvmData::encode_as(&EncodedValue::Tokens(vec![1]), DataType::String);
        assert!(matches!(result, Err(SVMError::DataTypeMismatch { .. })));
    }

    #[test]
    fn test_problem_requires_matching_lengths() {
        let values = vec![EncodedValue::Text("a".into())];
        assert!(matches!(
            SvmProblem::new(&[0.0, 1.0], &values, DataType::String),
            Err(SVMError::InvalidDataset(_))
        ));

        let problem = SvmProblem::new(&[1.0], &values, DataType::String).unwrap();
        assert_eq!(problem.l, 1);
        assert_eq!(problem.x[0], SvmData::Bytes(b"a".to_vec()));
    }

    #[test]
    fn test_parameter_fixed_fields() {
        let params = ProblemParams {
            data_type: DataType::Tokens,
            kernel: KernelType::Subsequence,
            degree: 2,
            ..ProblemParams::default()
        };
        let param = SvmParameter::new(&params).unwrap();
        assert_eq!(param.svm_type, SvmType::CSvc);
        assert!(!param.shrinking);
        assert_eq!(param.eps, 1e-3);
        assert_eq!(param.cache_size, 100.0);
        assert!(!param.probability);

        let edit = ProblemParams {
            data_type: DataType::String,
            kernel: KernelType::Edit,
            ..ProblemParams::default()
        };
        assert!(SvmParameter::new(&edit).unwrap().shrinking);
    }

    #[test]
    fn test_parameter_rejects_bad_pairing() {
        let params = ProblemParams {
            data_type: DataType::String,
            kernel: KernelType::Linear,
            ..ProblemParams::default()
        };
        assert!(matches!(
            SvmParameter::new(&params),
            Err(SVMError::IncompatibleKernel { .. })
        ));
    }
}
