//! Conversion of samples into solver-ready values

use crate::core::{DataType, EncodedValue, Result, SVMError, Sample, SparseVector};
use crate::data::Corpus;
use std::collections::BTreeMap;

/// Encodes samples for one configured [`DataType`]
///
/// Vector encodings are bounded by the corpus-wide `max_token`; every
/// encoder fed into one session must share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoder {
    data_type: DataType,
    max_token: u32,
}

impl Encoder {
    pub fn new(data_type: DataType, max_token: u32) -> Self {
        Self {
            data_type,
            max_token,
        }
    }

    /// Encoder sized against a loaded corpus
    pub fn for_corpus(data_type: DataType, corpus: &Corpus) -> Self {
        Self::new(data_type, corpus.max_token())
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn max_token(&self) -> u32 {
        self.max_token
    }

    pub fn encode(&self, sample: &Sample) -> Result<EncodedValue> {
        match self.data_type {
            DataType::String => Ok(EncodedValue::Text(sample.raw.clone())),
            DataType::Tokens => Ok(EncodedValue::Tokens(sample.tokens.clone())),
            DataType::Vector => self.count_vector(&sample.tokens).map(EncodedValue::Vector),
        }
    }

    /// Occurrence count of every token, as a sparse vector over `0..=max_token`
    fn count_vector(&self, tokens: &[u32]) -> Result<SparseVector> {
        let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
        for &token in tokens {
            if token > self.max_token {
                return Err(SVMError::TokenOutOfRange {
                    token,
                    max_token: self.max_token,
                });
            }
            *counts.entry(token).or_insert(0) += 1;
        }

        let (indices, values) = counts
            .into_iter()
            .map(|(token, count)| (token as usize, count as f64))
            .unzip();
        Ok(SparseVector { indices, values })
    }
}
