//! Traits at the collaborator seams: the sample store and the SVM solver

use crate::core::Result;
use crate::data::Corpus;
use crate::solver::{SvmData, SvmParameter, SvmProblem};
use std::path::Path;

/// Source of labeled samples
pub trait SampleSource {
    /// Load every sample matching `constraints`, bucketed by the value of `label_column`
    fn load_samples(&self, label_column: &str, constraints: &str) -> Result<Corpus>;
}

/// Contract a classifier session expects from an SVM engine
///
/// The model handle is owned by whoever trained or loaded it and goes back
/// to the solver exactly once through [`NativeSolver::release`].
pub trait NativeSolver {
    /// Opaque trained model
    type Model;

    /// Train a model on a finalized problem
    fn train(&self, problem: &SvmProblem, param: &SvmParameter) -> Result<Self::Model>;

    /// Predict the numeric label of one query
    fn predict(&self, model: &Self::Model, query: &SvmData) -> Result<f64>;

    /// Write the model to `path`
    fn save_model(&self, path: &Path, model: &Self::Model) -> Result<()>;

    /// Read a model from `path`, `None` if there is no model there
    fn load_model(&self, path: &Path) -> Result<Option<Self::Model>>;

    /// Parameters a model was trained with, if the solver records them
    ///
    /// Sessions use this to reject a loaded model trained for a different
    /// problem, and to open a model without restating its parameters.
    fn model_parameter<'m>(&self, _model: &'m Self::Model) -> Option<&'m SvmParameter> {
        None
    }

    /// Give the model back to the solver
    fn release(&self, model: Self::Model) {
        drop(model);
    }
}
