//! Integration tests for classifier sessions
//!
//! These tests drive sessions through their whole lifecycle: accumulation,
//! finalize, training, persistence and reload.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use strsvm::{
    sidecar_path, DataType, EncodedValue, ErrorKind, KernelType, NativeSolver, ProblemParams,
    Result, SVMError, Session, SessionState, SmoBackend, SparseVector, SvmData, SvmModel,
    SvmParameter, SvmProblem,
};
use tempfile::TempDir;

/// Bundled backend that counts how often models are released
#[derive(Clone, Default)]
struct CountingSolver {
    inner: SmoBackend,
    released: Rc<Cell<usize>>,
    /// Added to every prediction, to simulate a solver out of sync
    prediction_offset: f64,
}

impl NativeSolver for CountingSolver {
    type Model = SvmModel;

    fn train(&self, problem: &SvmProblem, param: &SvmParameter) -> Result<SvmModel> {
        self.inner.train(problem, param)
    }

    fn predict(&self, model: &SvmModel, query: &SvmData) -> Result<f64> {
        Ok(self.inner.predict(model, query)? + self.prediction_offset)
    }

    fn save_model(&self, path: &Path, model: &SvmModel) -> Result<()> {
        self.inner.save_model(path, model)
    }

    fn load_model(&self, path: &Path) -> Result<Option<SvmModel>> {
        self.inner.load_model(path)
    }

    fn model_parameter<'m>(&self, model: &'m SvmModel) -> Option<&'m SvmParameter> {
        self.inner.model_parameter(model)
    }

    fn release(&self, model: SvmModel) {
        self.released.set(self.released.get() + 1);
        drop(model);
    }
}

fn vector_params() -> ProblemParams {
    ProblemParams {
        data_type: DataType::Vector,
        kernel: KernelType::Linear,
        ..ProblemParams::default()
    }
}

/// Token counts drawn around one of two centers
fn clustered(rng: &mut StdRng, label: &str) -> EncodedValue {
    let (x, y) = if label == "left" { (6.0, 1.0) } else { (1.0, 6.0) };
    EncodedValue::Vector(SparseVector::new(
        vec![1, 2],
        vec![x + rng.gen_range(0.0..2.0), y + rng.gen_range(0.0..2.0)],
    ))
}

fn edit_params() -> ProblemParams {
    ProblemParams {
        data_type: DataType::String,
        kernel: KernelType::Edit,
        gamma: 0.2,
        ..ProblemParams::default()
    }
}

fn user_agent_session<S: NativeSolver>(solver: S) -> Session<S> {
    let mut session = Session::with_solver(solver, &edit_params()).expect("valid params");
    session
        .add_samples(vec![
            ("firefox", EncodedValue::Text("Mozilla/5.0 Firefox/115.0".into())),
            ("curl", EncodedValue::Text("curl/8.1.2".into())),
            ("curl", EncodedValue::Text("curl/7.88.1".into())),
        ])
        .expect("accumulating");
    session.finalize().expect("has samples");
    session.train().expect("training succeeds");
    session
}

fn trained_session<S: NativeSolver>(solver: S, rng: &mut StdRng) -> Session<S> {
    let mut session = Session::with_solver(solver, &vector_params()).expect("valid params");
    for k in 0..40 {
        let label = if k % 2 == 0 { "left" } else { "right" };
        session
            .add_sample(label, clustered(rng, label))
            .expect("accumulating");
    }
    session.finalize().expect("has samples");
    session.train().expect("training succeeds");
    session
}

#[test]
fn test_usage_errors() {
    let mut session = Session::new(&vector_params()).unwrap();
    let value = EncodedValue::Vector(SparseVector::new(vec![1], vec![1.0]));

    assert!(matches!(session.train(), Err(SVMError::NotFinalized)));
    assert!(matches!(session.predict(&value), Err(SVMError::NotTrained)));
    assert!(matches!(session.finalize(), Err(SVMError::NoData)));

    session.add_sample("a", value.clone()).unwrap();
    assert!(matches!(session.train(), Err(SVMError::NotFinalized)));
    session.add_sample("b", value.clone()).unwrap();
    session.finalize().unwrap();

    let err = session.finalize().unwrap_err();
    assert!(matches!(err, SVMError::AlreadyFinalized));
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert!(matches!(
        session.add_sample("c", value.clone()),
        Err(SVMError::AlreadyFinalized)
    ));
    assert!(matches!(
        session.save("unused.model"),
        Err(SVMError::NotTrained)
    ));

    session.train().unwrap();
    assert!(matches!(session.train(), Err(SVMError::AlreadyTrained)));
    assert!(matches!(
        session.add_samples(vec![("c", value)]),
        Err(SVMError::AlreadyFinalized)
    ));
}

#[test]
fn test_label_map_frozen_at_finalize() {
    let mut session = Session::new(&vector_params()).unwrap();
    for label in ["zeta", "alpha", "mid", "alpha"] {
        session
            .add_sample(label, EncodedValue::Vector(SparseVector::empty()))
            .unwrap();
    }
    assert!(session.label_map().is_none());
    session.finalize().unwrap();

    let map = session.label_map().unwrap();
    assert_eq!(map.len(), 3);
    for label in ["zeta", "alpha", "mid"] {
        assert_eq!(map.label(map.code(label).unwrap()), Some(label));
    }
}

#[test]
fn test_save_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clusters.model");
    let mut rng = StdRng::seed_from_u64(11);

    let original = trained_session(SmoBackend::new(), &mut rng);
    original.save(&path).unwrap();
    assert!(path.exists());
    assert!(sidecar_path(&path).exists());

    let loaded = Session::load(&vector_params(), &path).unwrap();
    assert_eq!(loaded.state(), SessionState::Loaded);
    assert_eq!(loaded.label_map(), original.label_map());

    let queries: Vec<EncodedValue> = (0..60)
        .map(|k| clustered(&mut rng, if k % 3 == 0 { "left" } else { "right" }))
        .collect();
    let agree = queries
        .iter()
        .filter(|q| original.predict(q).unwrap() == loaded.predict(q).unwrap())
        .count();
    assert!(agree * 100 >= queries.len() * 95, "only {agree} of 60 agree");

    // a loaded session can be saved again
    let copy = dir.path().join("copy.model");
    loaded.save(&copy).unwrap();
    assert_eq!(
        fs::read_to_string(sidecar_path(&copy)).unwrap(),
        fs::read_to_string(sidecar_path(&path)).unwrap()
    );
}

#[test]
fn test_sidecar_contents() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ua.model");
    let session = user_agent_session(SmoBackend::new());
    session.save(&path).unwrap();

    let text = fs::read_to_string(sidecar_path(&path)).unwrap();
    assert_eq!(text, "curl:0\nfirefox:1\n");
    assert_eq!(
        session.predict(&EncodedValue::Text("curl/8.0.1".into())).unwrap(),
        "curl"
    );
}

#[test]
fn test_load_missing_model() {
    let dir = TempDir::new().unwrap();
    let err = Session::load(&vector_params(), dir.path().join("absent.model")).unwrap_err();
    assert!(matches!(err, SVMError::ModelNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::Solver);
}

#[test]
fn test_load_malformed_sidecar() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.model");
    let mut rng = StdRng::seed_from_u64(5);
    trained_session(SmoBackend::new(), &mut rng)
        .save(&path)
        .unwrap();

    fs::write(sidecar_path(&path), "left:0\nright\n").unwrap();
    let err = Session::load(&vector_params(), &path).unwrap_err();
    assert!(matches!(err, SVMError::MalformedLabelFile { line: 2, .. }));
    assert_eq!(err.kind(), ErrorKind::Data);

    // a model without any labels cannot decode a prediction
    fs::write(sidecar_path(&path), "").unwrap();
    let err = Session::load(&vector_params(), &path).unwrap_err();
    assert!(matches!(err, SVMError::MalformedLabelFile { .. }));
    assert_eq!(err.kind(), ErrorKind::Data);
}

#[test]
fn test_load_rejects_other_parameters() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ua.model");
    let solver = CountingSolver::default();
    let released = Rc::clone(&solver.released);

    user_agent_session(solver.clone()).save(&path).unwrap();
    assert_eq!(released.get(), 1);

    let err = Session::load_with_solver(solver.clone(), &vector_params(), &path).unwrap_err();
    assert!(matches!(err, SVMError::InvalidParameter(_)), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("was trained with edit kernel"));
    assert_eq!(released.get(), 2);

    // same kernel, other width
    let wider = ProblemParams {
        gamma: 0.5,
        ..edit_params()
    };
    assert!(matches!(
        Session::load_with_solver(solver.clone(), &wider, &path),
        Err(SVMError::InvalidParameter(_))
    ));
    assert_eq!(released.get(), 3);

    let loaded = Session::load_with_solver(solver, &edit_params(), &path).unwrap();
    assert_eq!(loaded.params(), &edit_params());
}

#[test]
fn test_open_adopts_stored_parameters() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ua.model");
    user_agent_session(SmoBackend::new()).save(&path).unwrap();

    let session = Session::open(&path).unwrap();
    assert_eq!(session.state(), SessionState::Loaded);
    assert_eq!(session.params(), &edit_params());
    assert_eq!(
        session.predict(&EncodedValue::Text("curl/8.0.1".into())).unwrap(),
        "curl"
    );

    assert!(matches!(
        Session::open(dir.path().join("absent.model")),
        Err(SVMError::ModelNotFound(_))
    ));
}

#[test]
fn test_model_released_exactly_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("released.model");
    let solver = CountingSolver::default();
    let released = Rc::clone(&solver.released);
    let mut rng = StdRng::seed_from_u64(3);

    let session = trained_session(solver.clone(), &mut rng);
    session.save(&path).unwrap();
    assert_eq!(released.get(), 0);
    drop(session);
    assert_eq!(released.get(), 1);

    let loaded = Session::load_with_solver(solver.clone(), &vector_params(), &path).unwrap();
    drop(loaded);
    assert_eq!(released.get(), 2);

    // nothing to release without a model
    let empty = Session::with_solver(solver, &vector_params()).unwrap();
    drop(empty);
    assert_eq!(released.get(), 2);
}

#[test]
fn test_model_released_when_sidecar_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orphan.model");
    let solver = CountingSolver::default();
    let released = Rc::clone(&solver.released);
    let mut rng = StdRng::seed_from_u64(8);

    trained_session(solver.clone(), &mut rng).save(&path).unwrap();
    fs::remove_file(sidecar_path(&path)).unwrap();
    assert_eq!(released.get(), 1);

    let err = Session::load_with_solver(solver, &vector_params(), &path).unwrap_err();
    assert!(matches!(err, SVMError::IoError(_)));
    assert_eq!(released.get(), 2);
}

#[test]
fn test_desynchronized_solver_is_reported() {
    let solver = CountingSolver {
        prediction_offset: 10.0,
        ..CountingSolver::default()
    };
    let mut rng = StdRng::seed_from_u64(13);
    let session = trained_session(solver, &mut rng);

    let query = clustered(&mut rng, "left");
    assert!(matches!(
        session.predict(&query),
        Err(SVMError::UnknownNumericLabel(_))
    ));
}

#[test]
fn test_sessions_are_independent() {
    let mut first = Session::new(&vector_params()).unwrap();
    let mut second = Session::new(&vector_params()).unwrap();

    first
        .add_sample("x", EncodedValue::Vector(SparseVector::new(vec![1], vec![1.0])))
        .unwrap();
    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
    assert!(matches!(second.finalize(), Err(SVMError::NoData)));
    first.finalize().unwrap();
    assert_eq!(second.state(), SessionState::Empty);
}
