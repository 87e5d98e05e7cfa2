//! Sample loading, bucketing and encoding
//!
//! This module provides the label-bucketed [`Corpus`], the [`Encoder`] that
//! turns samples into solver-ready values, and the SQLite sample store.

pub mod corpus;
pub mod encoder;
pub mod sqlite;

pub use self::corpus::*;
pub use self::encoder::*;
pub use self::sqlite::*;
