//! Classifier session: accumulate labeled samples, train or load, predict
//!
//! ```text
//! Empty -> Accumulating -> Finalized -> Trained
//!                                        Loaded   (via Session::load)
//! ```
//!
//! No transition goes back. The label map is frozen by `finalize`, and the
//! model handle goes back to the solver when the session is dropped.
//!
//! ```rust,no_run
//! use strsvm::{DataType, EncodedValue, KernelType, ProblemParams, Session};
//!
//! # fn main() -> strsvm::Result<()> {
//! let params = ProblemParams {
//!     data_type: DataType::String,
//!     kernel: KernelType::Edit,
//!     gamma: 0.1,
//!     ..ProblemParams::default()
//! };
//! let mut session = Session::new(&params)?;
//! session.add_sample("curl", EncodedValue::Text("curl/8.1.2".into()))?;
//! session.add_sample("wget", EncodedValue::Text("Wget/1.21.3".into()))?;
//! session.finalize()?;
//! session.train()?;
//! println!("{}", session.predict(&EncodedValue::Text("curl/7.0".into()))?);
//! session.save("models/ua.model")?;
//! # Ok(())
//! # }
//! ```

use crate::config::ProblemParams;
use crate::core::{EncodedValue, NativeSolver, Result, SVMError};
use crate::label_map::{sidecar_path, LabelMap};
use crate::solver::{SmoBackend, SvmData, SvmParameter, SvmProblem};
use log::{debug, info};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Accumulating,
    Finalized,
    Trained,
    Loaded,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Empty => "empty",
            SessionState::Accumulating => "accumulating",
            SessionState::Finalized => "finalized",
            SessionState::Trained => "trained",
            SessionState::Loaded => "loaded",
        };
        f.write_str(name)
    }
}

pub struct Session<S: NativeSolver = SmoBackend> {
    solver: S,
    params: ProblemParams,
    param: SvmParameter,
    state: SessionState,
    labels: Vec<String>,
    values: Vec<EncodedValue>,
    label_map: Option<LabelMap>,
    model: Option<S::Model>,
}

impl Session<SmoBackend> {
    /// Session on the bundled solver
    pub fn new(params: &ProblemParams) -> Result<Self> {
        Self::with_solver(SmoBackend::new(), params)
    }

    /// Session holding the model saved at `path`
    pub fn load<P: AsRef<Path>>(params: &ProblemParams, path: P) -> Result<Self> {
        Self::load_with_solver(SmoBackend::new(), params, path)
    }

    /// Session holding the model saved at `path`, with the parameters it was
    /// trained with
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_solver(SmoBackend::new(), path)
    }
}

impl<S: NativeSolver> Session<S> {
    /// Fails with a configuration error if the kernel does not fit the data
    /// type or a hyperparameter is out of range
    pub fn with_solver(solver: S, params: &ProblemParams) -> Result<Self> {
        let param = SvmParameter::new(params)?;
        Ok(Self::from_parts(solver, params.clone(), param))
    }

    /// Load the model at `path` and its label file
    ///
    /// The model is read first, so a missing model is reported as
    /// `ModelNotFound` even when the label file is missing too. A model
    /// trained with other parameters than `params` is rejected with
    /// `InvalidParameter`.
    pub fn load_with_solver<P: AsRef<Path>>(
        solver: S,
        params: &ProblemParams,
        path: P,
    ) -> Result<Self> {
        Self::load_from(solver, Some(params), path.as_ref())
    }

    /// Load the model at `path`, adopting its stored parameters
    ///
    /// Needs a solver that records model parameters.
    pub fn open_with_solver<P: AsRef<Path>>(solver: S, path: P) -> Result<Self> {
        Self::load_from(solver, None, path.as_ref())
    }

    fn from_parts(solver: S, params: ProblemParams, param: SvmParameter) -> Self {
        Self {
            solver,
            params,
            param,
            state: SessionState::Empty,
            labels: Vec::new(),
            values: Vec::new(),
            label_map: None,
            model: None,
        }
    }

    fn load_from(solver: S, params: Option<&ProblemParams>, path: &Path) -> Result<Self> {
        let model = solver
            .load_model(path)?
            .ok_or_else(|| SVMError::ModelNotFound(path.to_path_buf()))?;

        let resolved = resolve_params(params, solver.model_parameter(&model), path);
        let (params, param) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                solver.release(model);
                return Err(e);
            }
        };
        let mut session = Self::from_parts(solver, params, param);
        session.model = Some(model);

        let label_map = LabelMap::load(sidecar_path(path))?;
        info!(
            "Loaded {} {} model {} with {} labels",
            session.param.kernel_type,
            session.param.data_type,
            path.display(),
            label_map.len()
        );
        session.label_map = Some(label_map);
        session.state = SessionState::Loaded;
        Ok(session)
    }

    pub fn add_sample(&mut self, label: impl Into<String>, value: EncodedValue) -> Result<()> {
        self.check_accumulating()?;
        self.labels.push(label.into());
        self.values.push(value);
        self.state = SessionState::Accumulating;
        Ok(())
    }

    pub fn add_samples<I, L>(&mut self, samples: I) -> Result<()>
    where
        I: IntoIterator<Item = (L, EncodedValue)>,
        L: Into<String>,
    {
        self.check_accumulating()?;
        for (label, value) in samples {
            self.labels.push(label.into());
            self.values.push(value);
        }
        if !self.values.is_empty() {
            self.state = SessionState::Accumulating;
        }
        Ok(())
    }

    /// Freeze the sample set and build the label map
    pub fn finalize(&mut self) -> Result<()> {
        match self.state {
            SessionState::Empty => Err(SVMError::NoData),
            SessionState::Accumulating => {
                let label_map = LabelMap::from_labels(self.labels.iter().cloned());
                debug!(
                    "Finalized {} samples over {} labels",
                    self.values.len(),
                    label_map.len()
                );
                self.label_map = Some(label_map);
                self.state = SessionState::Finalized;
                Ok(())
            }
            _ => Err(SVMError::AlreadyFinalized),
        }
    }

    /// Train on every accumulated sample
    ///
    /// If the solver fails the session stays finalized.
    pub fn train(&mut self) -> Result<()> {
        let label_map = match self.state {
            SessionState::Empty | SessionState::Accumulating => {
                return Err(SVMError::NotFinalized)
            }
            SessionState::Trained | SessionState::Loaded => return Err(SVMError::AlreadyTrained),
            SessionState::Finalized => self.label_map.as_ref().ok_or(SVMError::NotFinalized)?,
        };

        let y = self
            .labels
            .iter()
            .map(|label| {
                label_map
                    .code(label)
                    .map(|code| code as f64)
                    .ok_or_else(|| SVMError::InvalidLabel(label.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        let problem = SvmProblem::new(&y, &self.values, self.param.data_type)?;

        info!(
            "Training {} kernel on {} {} samples, {} labels",
            self.param.kernel_type,
            problem.l,
            self.param.data_type,
            label_map.len()
        );
        let model = self.solver.train(&problem, &self.param)?;
        self.model = Some(model);
        self.state = SessionState::Trained;
        Ok(())
    }

    /// Label predicted for `value`
    pub fn predict(&self, value: &EncodedValue) -> Result<&str> {
        let (model, label_map) = self.model_and_labels()?;
        let query = SvmData::encode_as(value, self.param.data_type)?;
        let code = self.solver.predict(model, &query)?;
        label_map.decode(code)
    }

    pub fn predict_batch(&self, values: &[EncodedValue]) -> Result<Vec<&str>> {
        values.iter().map(|value| self.predict(value)).collect()
    }

    /// Write the model to `path` and the label map to `path.labels`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let (model, label_map) = self.model_and_labels()?;
        self.solver.save_model(path, model)?;
        label_map.save(sidecar_path(path))?;
        info!("Saved model to {}", path.display());
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Present from finalize on
    pub fn label_map(&self) -> Option<&LabelMap> {
        self.label_map.as_ref()
    }

    /// Number of accumulated samples
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn params(&self) -> &ProblemParams {
        &self.params
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    fn check_accumulating(&self) -> Result<()> {
        match self.state {
            SessionState::Empty | SessionState::Accumulating => Ok(()),
            _ => Err(SVMError::AlreadyFinalized),
        }
    }

    fn model_and_labels(&self) -> Result<(&S::Model, &LabelMap)> {
        match (&self.model, &self.label_map) {
            (Some(model), Some(label_map)) => Ok((model, label_map)),
            _ => Err(SVMError::NotTrained),
        }
    }
}

/// Parameters of a loaded session
///
/// Requested parameters must match the ones the model was trained with when
/// the solver records them; without a request the stored ones are adopted.
fn resolve_params(
    requested: Option<&ProblemParams>,
    stored: Option<&SvmParameter>,
    path: &Path,
) -> Result<(ProblemParams, SvmParameter)> {
    match (requested, stored) {
        (Some(params), stored) => {
            let param = SvmParameter::new(params)?;
            if let Some(trained) = stored.map(SvmParameter::problem_params) {
                if trained != *params {
                    return Err(SVMError::InvalidParameter(format!(
                        "Model {} was trained with {}, not {}",
                        path.display(),
                        trained,
                        params
                    )));
                }
            }
            Ok((params.clone(), param))
        }
        (None, Some(stored)) => {
            stored.validate()?;
            Ok((stored.problem_params(), stored.clone()))
        }
        (None, None) => Err(SVMError::InvalidParameter(format!(
            "Parameters of {} are not recorded by the solver and must be given",
            path.display()
        ))),
    }
}

impl<S: NativeSolver> Drop for Session<S> {
    fn drop(&mut self) {
        if let Some(model) = self.model.take() {
            self.solver.release(model);
        }
    }
}

impl<S: NativeSolver> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("params", &self.params)
            .field("samples", &self.values.len())
            .field("labels", &self.label_map.as_ref().map(LabelMap::len))
            .finish()
    }
}
