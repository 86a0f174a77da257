// src/algorithms/vectorizer.rs

use crate::core::{FeatureVector, IncidentLimeError, Result, VectorizerConfig};
use crate::utils::tokenize_lowercase;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Frozen term -> index mapping plus the IDF learned alongside it.
///
/// Indices are assigned in lexical order of the retained terms and never
/// change after `fit`, so a `ClassModel` trained on top of it stays valid.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
    terms: Vec<String>,
    idf: Vec<f64>,
    config: VectorizerConfig,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    pub fn idf(&self, index: usize) -> Option<f64> {
        self.idf.get(index).copied()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    /// TF-IDF vector of `text`. Terms outside the vocabulary are dropped silently.
    pub fn transform(&self, text: &str) -> FeatureVector {
        let tokens = tokenize_lowercase(text);
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for term in ngrams(&tokens, self.config.ngram_range) {
            if let Some(&idx) = self.index.get(&term) {
                *counts.entry(idx).or_insert(0) += 1;
            }
        }

        let mut features = FeatureVector::new();
        for (idx, count) in counts {
            let tf = if self.config.sublinear_tf {
                1.0 + (count as f64).ln()
            } else {
                count as f64
            };
            features.insert(idx, tf * self.idf[idx]);
        }

        if self.config.l2_normalize {
            let norm = features.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                features.iter_mut().for_each(|w| *w /= norm);
            }
        }
        features
    }
}

/// Learns a [`Vocabulary`] from a corpus and turns text into [`FeatureVector`]s.
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
}

impl TfidfVectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        TfidfVectorizer { config }
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    pub fn fit<S: AsRef<str>>(&self, corpus: &[S]) -> Result<Vocabulary> {
        if corpus.is_empty() {
            return Err(IncidentLimeError::Vectorization(
                "Cannot fit a vocabulary on an empty corpus.".to_string(),
            ));
        }
        let (min_n, max_n) = self.config.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(IncidentLimeError::Vectorization(format!(
                "Invalid n-gram range ({}, {}).",
                min_n, max_n
            )));
        }

        // Document frequency: number of documents each term appears in.
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in corpus {
            let tokens = tokenize_lowercase(doc.as_ref());
            let unique: HashSet<String> = ngrams(&tokens, self.config.ngram_range).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = doc_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.config.max_features);
        ranked.sort_by(|a, b| a.0.cmp(&b.0));

        if ranked.is_empty() {
            warn!(documents = corpus.len(), "Corpus produced no terms; vocabulary is empty");
        }

        // Smoothed IDF: terms present in every document still get weight 1.
        let n_docs = corpus.len() as f64;
        let mut terms = Vec::with_capacity(ranked.len());
        let mut idf = Vec::with_capacity(ranked.len());
        let mut index = HashMap::with_capacity(ranked.len());
        for (i, (term, df)) in ranked.into_iter().enumerate() {
            idf.push(((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0);
            index.insert(term.clone(), i);
            terms.push(term);
        }

        debug!(
            documents = corpus.len(),
            vocabulary_size = terms.len(),
            "Fitted TF-IDF vocabulary"
        );

        Ok(Vocabulary {
            index,
            terms,
            idf,
            config: self.config.clone(),
        })
    }

    pub fn transform(&self, text: &str, vocabulary: &Vocabulary) -> FeatureVector {
        vocabulary.transform(text)
    }
}

/// All n-grams of `tokens` with `n` in the inclusive range, words joined by a space.
fn ngrams(tokens: &[String], (min_n, max_n): (usize, usize)) -> impl Iterator<Item = String> + '_ {
    (min_n.max(1)..=max_n).flat_map(move |n| tokens.windows(n).map(|w| w.join(" ")))
}
