//! Samples grouped into label buckets

use crate::core::Sample;
use std::collections::BTreeMap;

/// A loaded set of samples, bucketed by label
///
/// Within a bucket samples keep their load order. `max_token` covers the
/// whole corpus and sizes vector encodings.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    buckets: BTreeMap<String, Vec<Sample>>,
    max_token: u32,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples<I: IntoIterator<Item = Sample>>(samples: I) -> Self {
        let mut corpus = Self::new();
        for sample in samples {
            corpus.push(sample);
        }
        corpus
    }

    /// Append a sample to its label bucket
    pub fn push(&mut self, sample: Sample) {
        if let Some(max) = sample.max_token() {
            self.max_token = self.max_token.max(max);
        }
        self.buckets
            .entry(sample.label.clone())
            .or_default()
            .push(sample);
    }

    pub fn max_token(&self) -> u32 {
        self.max_token
    }

    pub fn bucket(&self, label: &str) -> Option<&[Sample]> {
        self.buckets.get(label).map(Vec::as_slice)
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&str, &[Sample])> {
        self.buckets
            .iter()
            .map(|(label, samples)| (label.as_str(), samples.as_slice()))
    }

    pub(crate) fn buckets_mut(&mut self) -> impl Iterator<Item = (&String, &mut Vec<Sample>)> {
        self.buckets.iter_mut()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn n_labels(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of samples across all buckets
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
