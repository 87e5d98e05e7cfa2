//! Bundled solver: one-vs-one multiclass C-SVC on top of the SMO optimizer

use crate::core::{EncodedValue, NativeSolver, Result, SVMError};
use crate::kernel::KernelFunction;
use crate::persistence;
use crate::solver::smo::{SmoConfig, SmoSolver};
use crate::solver::{SvmData, SvmParameter, SvmProblem};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Decision function separating two classes
///
/// `f(x) = sum coef * K(sv, x) - rho`; `f(x) > 0` votes for `positive`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryClassifier {
    /// Index into the model's class labels
    pub positive: usize,
    pub negative: usize,
    /// `(support vector index, alpha * y)`
    pub coefficients: Vec<(usize, f64)>,
    pub rho: f64,
    /// False if training hit the iteration limit
    pub converged: bool,
}

/// Trained multiclass model
#[derive(Debug, Clone)]
pub struct SvmModel {
    param: SvmParameter,
    /// Class labels in ascending order
    labels: Vec<f64>,
    support_vectors: Vec<EncodedValue>,
    classifiers: Vec<BinaryClassifier>,
    kernel: KernelFunction,
}

impl SvmModel {
    /// Assemble a model, checking that its parts fit together
    pub fn from_parts(
        param: SvmParameter,
        labels: Vec<f64>,
        support_vectors: Vec<EncodedValue>,
        classifiers: Vec<BinaryClassifier>,
    ) -> Result<Self> {
        let kernel = KernelFunction::from_parameter(&param)?;

        if labels.is_empty() {
            return Err(SVMError::CorruptModel("Model has no classes".to_string()));
        }
        if labels.iter().any(|l| !l.is_finite()) || labels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SVMError::CorruptModel(
                "Class labels must be finite and strictly ascending".to_string(),
            ));
        }
        let k = labels.len();
        if classifiers.len() != k * (k - 1) / 2 {
            return Err(SVMError::CorruptModel(format!(
                "Expected {} binary classifiers for {} classes, found {}",
                k * (k - 1) / 2,
                k,
                classifiers.len()
            )));
        }
        if let Some(sv) = support_vectors
            .iter()
            .find(|sv| sv.data_type() != param.data_type)
        {
            return Err(SVMError::CorruptModel(format!(
                "Support vector of type {} in a {} model",
                sv.data_type(),
                param.data_type
            )));
        }
        for classifier in &classifiers {
            if classifier.positive >= k
                || classifier.negative >= k
                || classifier.positive == classifier.negative
            {
                return Err(SVMError::CorruptModel(format!(
                    "Classifier refers to classes {} and {} of {}",
                    classifier.positive, classifier.negative, k
                )));
            }
            if classifier
                .coefficients
                .iter()
                .any(|&(index, _)| index >= support_vectors.len())
            {
                return Err(SVMError::CorruptModel(
                    "Classifier refers to a missing support vector".to_string(),
                ));
            }
        }

        Ok(Self {
            param,
            labels,
            support_vectors,
            classifiers,
            kernel,
        })
    }

    pub fn param(&self) -> &SvmParameter {
        &self.param
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn support_vectors(&self) -> &[EncodedValue] {
        &self.support_vectors
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.len()
    }

    pub fn classifiers(&self) -> &[BinaryClassifier] {
        &self.classifiers
    }

    /// Whether every binary problem was solved to tolerance
    pub fn converged(&self) -> bool {
        self.classifiers.iter().all(|c| c.converged)
    }

    /// One decision value per binary classifier
    pub fn decision_values(&self, x: &EncodedValue) -> Vec<f64> {
        let kernel_values: Vec<f64> = self
            .support_vectors
            .iter()
            .map(|sv| self.kernel.compute(sv, x))
            .collect();

        self.classifiers
            .iter()
            .map(|classifier| {
                classifier
                    .coefficients
                    .iter()
                    .map(|&(index, coef)| coef * kernel_values[index])
                    .sum::<f64>()
                    - classifier.rho
            })
            .collect()
    }

    /// Majority vote over all pairs; ties go to the lowest label
    pub fn predict(&self, x: &EncodedValue) -> f64 {
        if self.labels.len() == 1 {
            return self.labels[0];
        }

        let mut votes = vec![0usize; self.labels.len()];
        for (classifier, value) in self.classifiers.iter().zip(self.decision_values(x)) {
            if value > 0.0 {
                votes[classifier.positive] += 1;
            } else {
                votes[classifier.negative] += 1;
            }
        }

        let mut winner = 0;
        for (class, &count) in votes.iter().enumerate() {
            if count > votes[winner] {
                winner = class;
            }
        }
        self.labels[winner]
    }
}

/// The solver shipped with the crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SmoBackend;

impl SmoBackend {
    pub fn new() -> Self {
        Self
    }
}

impl NativeSolver for SmoBackend {
    type Model = SvmModel;

    fn train(&self, problem: &SvmProblem, param: &SvmParameter) -> Result<SvmModel> {
        param.validate()?;
        if problem.l == 0 {
            return Err(SVMError::EmptyDataset);
        }
        if problem.y.len() != problem.l || problem.x.len() != problem.l {
            return Err(SVMError::InvalidDataset(format!(
                "Problem declares {} samples but has {} labels and {} values",
                problem.l,
                problem.y.len(),
                problem.x.len()
            )));
        }
        if let Some(bad) = problem.y.iter().find(|l| !l.is_finite()) {
            return Err(SVMError::InvalidDataset(format!(
                "Non-finite label: {}",
                bad
            )));
        }

        let values = problem
            .x
            .iter()
            .map(|data| decode_as(data, param))
            .collect::<Result<Vec<_>>>()?;

        let mut labels = problem.y.clone();
        labels.sort_by(f64::total_cmp);
        labels.dedup();
        let groups: Vec<Vec<usize>> = labels
            .iter()
            .map(|&label| (0..problem.l).filter(|&t| problem.y[t] == label).collect())
            .collect();

        let kernel = KernelFunction::from_parameter(param)?;
        let config = SmoConfig::from_parameter(param);
        let mut support_vectors = Vec::new();
        let mut sv_index: HashMap<usize, usize> = HashMap::new();
        let mut classifiers = Vec::new();

        for a in 0..labels.len() {
            for b in (a + 1)..labels.len() {
                let members: Vec<usize> = groups[a].iter().chain(&groups[b]).copied().collect();
                let pair_values: Vec<&EncodedValue> =
                    members.iter().map(|&t| &values[t]).collect();
                let pair_y: Vec<f64> = std::iter::repeat(1.0)
                    .take(groups[a].len())
                    .chain(std::iter::repeat(-1.0).take(groups[b].len()))
                    .collect();

                let solution =
                    SmoSolver::new(&kernel, config.clone()).solve(&pair_values, &pair_y)?;
                debug!(
                    "Classes {} vs {}: {} samples, {} iterations, rho {:.6}",
                    labels[a],
                    labels[b],
                    members.len(),
                    solution.iterations,
                    solution.rho
                );

                let mut coefficients = Vec::new();
                for t in solution.support_indices() {
                    let global = members[t];
                    let index = match sv_index.get(&global) {
                        Some(&index) => index,
                        None => {
                            support_vectors.push(values[global].clone());
                            sv_index.insert(global, support_vectors.len() - 1);
                            support_vectors.len() - 1
                        }
                    };
                    coefficients.push((index, solution.alpha[t] * pair_y[t]));
                }

                classifiers.push(BinaryClassifier {
                    positive: a,
                    negative: b,
                    coefficients,
                    rho: solution.rho,
                    converged: solution.converged,
                });
            }
        }

        if classifiers.iter().any(|c| !c.converged) {
            warn!(
                "{} of {} binary problems hit the iteration limit",
                classifiers.iter().filter(|c| !c.converged).count(),
                classifiers.len()
            );
        }
        info!(
            "Trained {} {} model: {} classes, {} samples, {} support vectors",
            param.kernel_type,
            param.data_type,
            labels.len(),
            problem.l,
            support_vectors.len()
        );

        SvmModel::from_parts(param.clone(), labels, support_vectors, classifiers)
    }

    fn predict(&self, model: &SvmModel, query: &SvmData) -> Result<f64> {
        let value = decode_as(query, model.param())?;
        Ok(model.predict(&value))
    }

    fn save_model(&self, path: &Path, model: &SvmModel) -> Result<()> {
        persistence::save_model(path, model)
    }

    fn load_model(&self, path: &Path) -> Result<Option<SvmModel>> {
        persistence::load_model(path)
    }

    fn model_parameter<'m>(&self, model: &'m SvmModel) -> Option<&'m SvmParameter> {
        Some(model.param())
    }
}

fn decode_as(data: &SvmData, param: &SvmParameter) -> Result<EncodedValue> {
    if data.data_type() != param.data_type {
        return Err(SVMError::DataTypeMismatch {
            expected: param.data_type.to_string(),
            actual: data.data_type().to_string(),
        });
    }
    data.decode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, KernelType, SparseVector};
    use crate::ProblemParams;

    fn param(data_type: DataType, kernel: KernelType) -> SvmParameter {
        SvmParameter::new(&ProblemParams {
            data_type,
            kernel,
            c: 10.0,
            ..ProblemParams::default()
        })
        .unwrap()
    }

    fn vector(coords: &[f64]) -> EncodedValue {
        let indices = (1..=coords.len()).collect();
        EncodedValue::Vector(SparseVector::new(indices, coords.to_vec()))
    }

    fn problem(labels: &[f64], values: &[EncodedValue], data_type: DataType) -> SvmProblem {
        SvmProblem::new(labels, values, data_type).unwrap()
    }

    #[test]
    fn test_three_class_one_vs_one() {
        let values = vec![
            vector(&[5.0, 0.0]),
            vector(&[6.0, 0.5]),
            vector(&[0.0, 5.0]),
            vector(&[0.5, 6.0]),
            vector(&[-5.0, -5.0]),
            vector(&[-6.0, -5.5]),
        ];
        let labels = [0.0, 0.0, 1.0, 1.0, 2.0, 2.0];
        let param = param(DataType::Vector, KernelType::Linear);
        let backend = SmoBackend::new();

        let model = backend
            .train(&problem(&labels, &values, DataType::Vector), &param)
            .unwrap();
        assert_eq!(model.n_classes(), 3);
        assert_eq!(model.classifiers().len(), 3);
        assert!(model.n_support_vectors() > 0);

        for (value, &label) in values.iter().zip(&labels) {
            let query = SvmData::encode(value).unwrap();
            assert_eq!(backend.predict(&model, &query).unwrap(), label);
        }
        let query = SvmData::encode(&vector(&[7.0, 1.0])).unwrap();
        assert_eq!(backend.predict(&model, &query).unwrap(), 0.0);
    }

    #[test]
    fn test_string_edit_kernel() {
        let values: Vec<EncodedValue> = [
            "Mozilla/5.0 (X11; Linux x86_64) Firefox/115.0",
            "Mozilla/5.0 (X11; Linux x86_64) Firefox/116.0",
            "curl/7.88.1",
            "curl/8.1.2",
        ]
        .iter()
        .map(|s| EncodedValue::Text(s.to_string()))
        .collect();
        let labels = [0.0, 0.0, 1.0, 1.0];
        let mut param = param(DataType::String, KernelType::Edit);
        param.gamma = 0.1;
        let backend = SmoBackend::new();

        let model = backend
            .train(&problem(&labels, &values, DataType::String), &param)
            .unwrap();

        let query = SvmData::encode(&EncodedValue::Text("curl/8.0.0".into())).unwrap();
        assert_eq!(backend.predict(&model, &query).unwrap(), 1.0);
    }

    #[test]
    fn test_single_class_is_constant() {
        let values = vec![vector(&[1.0]), vector(&[2.0])];
        let param = param(DataType::Vector, KernelType::Linear);
        let backend = SmoBackend::new();

        let model = backend
            .train(&problem(&[3.0, 3.0], &values, DataType::Vector), &param)
            .unwrap();
        assert!(model.classifiers().is_empty());

        let query = SvmData::encode(&vector(&[-100.0])).unwrap();
        assert_eq!(backend.predict(&model, &query).unwrap(), 3.0);
    }

    #[test]
    fn test_tie_goes_to_lowest_label() {
        let param = param(DataType::Vector, KernelType::Linear);
        // every classifier returns -rho: 0 beats 1, 1 beats 2, 2 beats 0
        let classifiers = vec![
            BinaryClassifier {
                positive: 0,
                negative: 1,
                coefficients: vec![],
                rho: -1.0,
                converged: true,
            },
            BinaryClassifier {
                positive: 0,
                negative: 2,
                coefficients: vec![],
                rho: 1.0,
                converged: true,
            },
            BinaryClassifier {
                positive: 1,
                negative: 2,
                coefficients: vec![],
                rho: -1.0,
                converged: true,
            },
        ];
        let model = SvmModel::from_parts(param, vec![0.0, 1.0, 2.0], vec![], classifiers).unwrap();
        assert_eq!(model.predict(&vector(&[1.0])), 0.0);
    }

    #[test]
    fn test_rejects_mismatched_data() {
        let param = param(DataType::Vector, KernelType::Linear);
        let problem = SvmProblem {
            l: 1,
            y: vec![0.0],
            x: vec![SvmData::Bytes(b"abc".to_vec())],
        };
        assert!(matches!(
            SmoBackend::new().train(&problem, &param),
            Err(SVMError::DataTypeMismatch { .. })
        ));

        let empty = SvmProblem {
            l: 0,
            y: vec![],
            x: vec![],
        };
        assert!(matches!(
            SmoBackend::new().train(&empty, &param),
            Err(SVMError::EmptyDataset)
        ));
    }

    #[test]
    fn test_from_parts_checks_structure() {
        let param = param(DataType::Vector, KernelType::Linear);
        assert!(matches!(
            SvmModel::from_parts(param.clone(), vec![], vec![], vec![]),
            Err(SVMError::CorruptModel(_))
        ));
        assert!(matches!(
            SvmModel::from_parts(param.clone(), vec![1.0, 0.0], vec![], vec![]),
            Err(SVMError::CorruptModel(_))
        ));
        let dangling = BinaryClassifier {
            positive: 0,
            negative: 1,
            coefficients: vec![(3, 1.0)],
            rho: 0.0,
            converged: true,
        };
        assert!(matches!(
            SvmModel::from_parts(param, vec![0.0, 1.0], vec![], vec![dangling]),
            Err(SVMError::CorruptModel(_))
        ));
    }
}
