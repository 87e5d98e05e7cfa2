//! Model serialization and persistence
//!
//! Models are stored as pretty-printed JSON. Support vectors are kept in
//! their wire form so that a file can be checked for framing errors when it
//! is read back.

use crate::core::{Result, SVMError};
use crate::solver::{BinaryClassifier, SvmData, SvmModel, SvmParameter};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

/// Serializable representation of a trained model
#[derive(Debug, Serialize, Deserialize)]
pub struct SerializableModel {
    pub param: SvmParameter,
    /// Class labels, ascending
    pub labels: Vec<f64>,
    pub support_vectors: Vec<SvmData>,
    pub classifiers: Vec<BinaryClassifier>,
    pub metadata: ModelMetadata,
}

/// Model metadata for tracking and validation
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    pub n_support_vectors: usize,
    pub n_classes: usize,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

impl SerializableModel {
    pub fn from_model(model: &SvmModel) -> Result<Self> {
        let support_vectors = model
            .support_vectors()
            .iter()
            .map(SvmData::encode)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            param: model.param().clone(),
            labels: model.labels().to_vec(),
            support_vectors,
            classifiers: model.classifiers().to_vec(),
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                n_support_vectors: model.n_support_vectors(),
                n_classes: model.n_classes(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        })
    }

    /// Rebuild the model; any inconsistency is reported as `CorruptModel`
    pub fn to_model(&self) -> Result<SvmModel> {
        let support_vectors = self
            .support_vectors
            .iter()
            .map(SvmData::decode)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| SVMError::CorruptModel(e.to_string()))?;

        SvmModel::from_parts(
            self.param.clone(),
            self.labels.clone(),
            support_vectors,
            self.classifiers.clone(),
        )
        .map_err(|e| match e {
            SVMError::CorruptModel(_) => e,
            other => SVMError::CorruptModel(other.to_string()),
        })
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        writer.flush()?;
        Ok(())
    }

    /// Read a model file, `None` if the file does not exist
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let model = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| SVMError::CorruptModel(format!("{}: {}", path.display(), e)))?;
        Ok(Some(model))
    }

    /// Human-readable model summary
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== SVM Model Summary ===");
        let _ = writeln!(out, "Data Type: {}", self.param.data_type);
        let _ = writeln!(out, "Kernel Type: {}", self.param.kernel_type);
        let _ = writeln!(out, "Classes: {}", self.metadata.n_classes);
        let _ = writeln!(out, "Support Vectors: {}", self.metadata.n_support_vectors);
        let converged = self.classifiers.iter().all(|c| c.converged);
        let _ = writeln!(
            out,
            "Converged: {}",
            if converged { "yes" } else { "no (iteration limit reached)" }
        );
        let _ = writeln!(out, "Library Version: {}", self.metadata.library_version);
        let _ = writeln!(out, "Created: {}", self.metadata.created_at);
        let _ = writeln!(out, "Training Parameters:");
        let _ = writeln!(out, "  C: {}", self.param.c);
        let _ = writeln!(out, "  Gamma: {}", self.param.gamma);
        let _ = writeln!(out, "  Degree: {}", self.param.degree);
        let _ = writeln!(out, "  Coef0: {}", self.param.coef0);
        let _ = write!(out, "  Shrinking: {}", self.param.shrinking);
        out
    }
}

pub fn save_model(path: &Path, model: &SvmModel) -> Result<()> {
    SerializableModel::from_model(model)?.save_to_file(path)
}

pub fn load_model(path: &Path) -> Result<Option<SvmModel>> {
    SerializableModel::load_from_file(path)?
        .map(|model| model.to_model())
        .transpose()
}
