//! Cross-validation harness
//!
//! Loads a labeled corpus, splits every label bucket into a training part and
//! a held-out part, trains (or reuses) a model for the problem and scores it
//! on the held-out samples.

use crate::config::ProblemParams;
use crate::core::{EncodedValue, Result, SVMError, SampleSource};
use crate::data::{Corpus, Encoder};
use crate::session::Session;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// How many samples of a bucket go to training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitPolicy {
    /// `floor(len * proportion)`
    #[default]
    Exact,
    /// One fewer than `Exact`, reproducing models trained by older tooling
    Legacy,
}

impl SplitPolicy {
    pub fn training_count(&self, len: usize, proportion: f64) -> usize {
        let exact = ((len as f64 * proportion).floor() as usize).min(len);
        match self {
            SplitPolicy::Exact => exact,
            SplitPolicy::Legacy => exact.saturating_sub(1),
        }
    }
}

/// Encoded training set plus the held-out remainder of every bucket
#[derive(Debug, Clone, Default)]
pub struct CorpusSplit {
    /// `(label, value)` in the order samples were drawn
    pub training: Vec<(String, EncodedValue)>,
    pub held_out: BTreeMap<String, Vec<EncodedValue>>,
}

/// Shuffle, truncate and split every bucket of `corpus`
///
/// With `total_proportion < 1` each shuffled bucket is first cut to
/// `floor(len * total_proportion)` samples; the rest is discarded.
pub fn split_corpus<R: Rng + ?Sized>(
    mut corpus: Corpus,
    encoder: &Encoder,
    training_proportion: f64,
    total_proportion: f64,
    policy: SplitPolicy,
    rng: &mut R,
) -> Result<CorpusSplit> {
    check_proportion("training", training_proportion)?;
    check_proportion("total", total_proportion)?;

    let mut split = CorpusSplit::default();
    for (label, bucket) in corpus.buckets_mut() {
        bucket.shuffle(rng);
        if total_proportion < 1.0 {
            let keep = (bucket.len() as f64 * total_proportion).floor() as usize;
            bucket.truncate(keep);
        }

        let n_training = policy.training_count(bucket.len(), training_proportion);
        for _ in 0..n_training {
            if let Some(sample) = bucket.pop() {
                split.training.push((label.clone(), encoder.encode(&sample)?));
            }
        }

        let held_out = bucket
            .iter()
            .map(|sample| encoder.encode(sample))
            .collect::<Result<Vec<_>>>()?;
        info!(
            "{}: {} training, {} held out",
            label,
            n_training,
            held_out.len()
        );
        split.held_out.insert(label.clone(), held_out);
    }
    Ok(split)
}

fn check_proportion(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(SVMError::InvalidParameter(format!(
            "{} proportion must be in (0, 1], got: {}",
            name, value
        )))
    }
}

/// Held-out accuracy for one label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelReport {
    pub label: String,
    pub held_out: usize,
    pub correct: usize,
}

impl LabelReport {
    pub fn accuracy(&self) -> f64 {
        if self.held_out == 0 {
            0.0
        } else {
            self.correct as f64 / self.held_out as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub label_column: String,
    pub model_path: PathBuf,
    /// False when an existing model was reused
    pub trained: bool,
    pub training_samples: usize,
    pub labels: Vec<LabelReport>,
}

impl ValidationReport {
    pub fn held_out(&self) -> usize {
        self.labels.iter().map(|l| l.held_out).sum()
    }

    pub fn correct(&self) -> usize {
        self.labels.iter().map(|l| l.correct).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let held_out = self.held_out();
        if held_out == 0 {
            0.0
        } else {
            self.correct() as f64 / held_out as f64
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Cross-Validation: {} ===", self.label_column)?;
        writeln!(
            f,
            "Model: {} ({})",
            self.model_path.display(),
            if self.trained { "trained" } else { "reused" }
        )?;
        writeln!(f, "Training samples: {}", self.training_samples)?;
        for label in &self.labels {
            writeln!(
                f,
                "  {:<24} {:>6}/{:<6} {:>7}",
                label.label,
                label.correct,
                label.held_out,
                percent(label.correct, label.held_out)
            )?;
        }
        write!(
            f,
            "Overall: {}/{} ({})",
            self.correct(),
            self.held_out(),
            percent(self.correct(), self.held_out())
        )
    }
}

/// `n/a` when nothing was held out
fn percent(correct: usize, held_out: usize) -> String {
    if held_out == 0 {
        "n/a".to_string()
    } else {
        format!("{:.2}%", correct as f64 * 100.0 / held_out as f64)
    }
}

/// Drives loading, splitting, training and scoring
pub struct CrossValidator<Src: SampleSource> {
    source: Src,
    params: ProblemParams,
    model_dir: PathBuf,
    policy: SplitPolicy,
    seed: Option<u64>,
}

impl<Src: SampleSource> CrossValidator<Src> {
    pub fn new(source: Src, params: ProblemParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            source,
            params,
            model_dir: PathBuf::from("models"),
            policy: SplitPolicy::default(),
            seed: None,
        })
    }

    pub fn with_model_dir<P: AsRef<Path>>(mut self, model_dir: P) -> Self {
        self.model_dir = model_dir.as_ref().to_path_buf();
        self
    }

    pub fn with_split_policy(mut self, policy: SplitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fix the shuffle for reproducible splits
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn params(&self) -> &ProblemParams {
        &self.params
    }

    /// Where the model for `label_column` is kept
    pub fn model_path(&self, label_column: &str) -> PathBuf {
        self.params.model_path(&self.model_dir, label_column)
    }

    pub fn cross_validate(
        &self,
        label_column: &str,
        training_proportion: f64,
        total_proportion: f64,
        constraints: &str,
    ) -> Result<ValidationReport> {
        check_proportion("training", training_proportion)?;
        check_proportion("total", total_proportion)?;

        let corpus = self.source.load_samples(label_column, constraints)?;
        if corpus.is_empty() {
            return Err(SVMError::NoData);
        }
        let encoder = Encoder::for_corpus(self.params.data_type, &corpus);

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let split = split_corpus(
            corpus,
            &encoder,
            training_proportion,
            total_proportion,
            self.policy,
            &mut rng,
        )?;
        let training_samples = split.training.len();

        let model_path = self.model_path(label_column);
        let (session, trained) = match Session::load(&self.params, &model_path) {
            Ok(session) => {
                info!("Reusing model {}", model_path.display());
                (session, false)
            }
            Err(SVMError::ModelNotFound(_)) => {
                let mut session = Session::new(&self.params)?;
                session.add_samples(split.training)?;
                session.finalize()?;
                session.train()?;
                fs::create_dir_all(&self.model_dir)?;
                session.save(&model_path)?;
                (session, true)
            }
            Err(e) => return Err(e),
        };

        let mut labels = Vec::with_capacity(split.held_out.len());
        for (label, values) in &split.held_out {
            let mut correct = 0;
            for value in values {
                if session.predict(value)? == label {
                    correct += 1;
                }
            }
            labels.push(LabelReport {
                label: label.clone(),
                held_out: values.len(),
                correct,
            });
        }

        let report = ValidationReport {
            label_column: label_column.to_string(),
            model_path,
            trained,
            training_samples,
            labels,
        };
        info!(
            "{}: {}/{} held-out samples correct",
            label_column,
            report.correct(),
            report.held_out()
        );
        Ok(report)
    }
}
