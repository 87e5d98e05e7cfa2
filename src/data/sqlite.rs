//! SQLite-backed sample store
//!
//! Rows are read with:
//! `SELECT <raw>, <tokens>, <label_column> FROM <table> <constraints>`
//! where `<constraints>` is a caller-supplied SQL fragment (e.g. a `WHERE` clause).

use crate::core::{Result, SVMError, Sample, SampleSource};
use crate::data::Corpus;
use log::{debug, info};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Sample store backed by a SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
    table: String,
    raw_column: String,
    tokens_column: String,
}

impl SqliteSource {
    /// Source reading table `data` with columns `raw` and `tokens`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            table: "data".to_string(),
            raw_column: "raw".to_string(),
            tokens_column: "tokens".to_string(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_raw_column(mut self, column: impl Into<String>) -> Self {
        self.raw_column = column.into();
        self
    }

    pub fn with_tokens_column(mut self, column: impl Into<String>) -> Self {
        self.tokens_column = column.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn query(&self, label_column: &str, constraints: &str) -> Result<String> {
        for name in [
            &self.table,
            &self.raw_column,
            &self.tokens_column,
            label_column,
        ] {
            check_identifier(name)?;
        }
        Ok(format!(
            "SELECT {}, {}, {} FROM {} {}",
            self.raw_column, self.tokens_column, label_column, self.table, constraints
        ))
    }
}

impl SampleSource for SqliteSource {
    fn load_samples(&self, label_column: &str, constraints: &str) -> Result<Corpus> {
        let sql = self.query(label_column, constraints)?;
        debug!("Loading samples: {sql}");

        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut corpus = Corpus::new();
        let mut row_num = 0;
        while let Some(row) = rows.next()? {
            row_num += 1;
            let raw: String = row.get(0)?;
            let tokens: String = row.get(1)?;
            let label: String = row.get(2)?;
            let sample = Sample::parse(&label, &raw, &tokens)
                .map_err(|e| SVMError::ParseError(format!("Row {row_num}: {e}")))?;
            corpus.push(sample);
        }

        info!(
            "Loaded {} samples across {} labels from {:?} (max token {})",
            corpus.len(),
            corpus.n_labels(),
            self.path,
            corpus.max_token()
        );
        Ok(corpus)
    }
}

/// Table and column names are spliced into SQL, so only plain identifiers pass
fn check_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SVMError::InvalidParameter(format!(
            "Not a valid column or table name: {name:?}"
        )))
    }
}
