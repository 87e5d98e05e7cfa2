//! SVM classification over raw strings, token sequences and sparse count vectors
//!
//! A [`Session`] accumulates labeled samples, maps string labels to numeric
//! codes, trains a model through a [`NativeSolver`] and decodes predictions
//! back to labels. The [`CrossValidator`] splits a labeled corpus per label
//! and scores a session on the held-out part.

pub mod cache;
pub mod config;
pub mod core;
pub mod data;
pub mod harness;
pub mod kernel;
pub mod label_map;
pub mod persistence;
pub mod session;
pub mod solver;

// Re-export main types for convenience
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::config::ProblemParams;
pub use crate::core::error::*;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::{Corpus, Encoder, SqliteSource};
pub use crate::harness::{
    split_corpus, CorpusSplit, CrossValidator, LabelReport, SplitPolicy, ValidationReport,
};
pub use crate::kernel::{Kernel, KernelFunction};
pub use crate::label_map::{sidecar_path, LabelMap};
pub use crate::session::{Session, SessionState};
pub use crate::solver::{SmoBackend, SvmData, SvmModel, SvmParameter, SvmProblem};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
