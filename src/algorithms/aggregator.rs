// src/algorithms/aggregator.rs

use crate::core::{Explanation, IncidentLimeError, Result, RootCauseBucket};
use crate::utils::normalize_token;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Bucket that collects features no taxonomy keyword matches.
pub const OTHER_BUCKET: &str = "Other";

/// Feature tokens carrying no root-cause signal.
pub const STOP_WORDS: [&str; 8] = ["and", "the", "of", "in", "to", "by", "with", "from"];

/// Fixed root-cause taxonomy: bucket name -> lower-case keywords.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    buckets: Vec<(String, Vec<String>)>,
}

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bucket, or extends its keywords if the name already exists.
    pub fn with_bucket<I, K>(mut self, name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let name = name.into();
        let keywords = keywords.into_iter().map(|k| k.as_ref().to_lowercase());
        match self.buckets.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => existing.extend(keywords),
            None => self.buckets.push((name, keywords.collect())),
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn bucket_names(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|(n, _)| n.as_str())
    }

    /// Common causes of workplace safety incidents.
    pub fn workplace_safety() -> Self {
        Taxonomy::new()
            .with_bucket("Slip/Trip (wet floor)", ["slip", "slipped", "wet", "floor", "pipe"])
            .with_bucket("Falling objects", ["box", "shelf", "fell", "fall", "foot", "hitting"])
            .with_bucket("Cuts/Sharp object", ["cut", "cutter", "box cutter", "hand"])
            .with_bucket("Chemical spill", ["chemical", "spill", "storage"])
            .with_bucket("Equipment / Forklift", ["forklift", "pallet", "collided", "knocked"])
            .with_bucket("Fire/Overheat", ["fire", "overheated", "alarm", "triggered"])
            .with_bucket("Maintenance/Fall", ["ladder", "maintenance", "task"])
            .with_bucket("Electrical", ["wiring", "electrical", "spark"])
            .with_bucket("Struck by/against", ["head", "beam", "struck"])
    }

    /// Indices of every bucket with a keyword contained in `token`.
    fn matching(&self, token: &str) -> Vec<usize> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, (_, keywords))| keywords.iter().any(|kw| token.contains(kw.as_str())))
            .map(|(i, _)| i)
            .collect()
    }
}

impl From<BTreeMap<String, BTreeSet<String>>> for Taxonomy {
    fn from(map: BTreeMap<String, BTreeSet<String>>) -> Self {
        map.into_iter()
            .fold(Taxonomy::new(), |tax, (name, kws)| tax.with_bucket(name, kws))
    }
}

/// Running per-bucket totals; the last slot is [`OTHER_BUCKET`].
#[derive(Debug, Clone)]
struct Tally {
    scores: Vec<f64>,
    counts: Vec<usize>,
}

impl Tally {
    fn new(n_buckets: usize) -> Self {
        Tally {
            scores: vec![0.0; n_buckets + 1],
            counts: vec![0; n_buckets + 1],
        }
    }

    fn add(&mut self, slot: usize, weight: f64) {
        self.scores[slot] += weight;
        self.counts[slot] += 1;
    }

    fn merge(mut self, other: Tally) -> Tally {
        for (a, b) in self.scores.iter_mut().zip(other.scores) {
            *a += b;
        }
        for (a, b) in self.counts.iter_mut().zip(other.counts) {
            *a += b;
        }
        self
    }
}

/// Rolls per-incident explanations up into ranked root-cause buckets.
#[derive(Debug, Clone)]
pub struct Aggregator {
    taxonomy: Taxonomy,
}

impl Aggregator {
    pub fn new(taxonomy: Taxonomy) -> Result<Self> {
        if taxonomy.is_empty() {
            return Err(IncidentLimeError::Aggregation(
                "Taxonomy defines no root-cause buckets.".to_string(),
            ));
        }
        Ok(Aggregator { taxonomy })
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Buckets sorted by descending score, ties by name. Buckets nothing
    /// matched are left out.
    pub fn aggregate(&self, explanations: &[Explanation]) -> Vec<RootCauseBucket> {
        let tally = explanations
            .iter()
            .fold(Tally::new(self.taxonomy.len()), |mut tally, e| {
                self.absorb(&mut tally, e);
                tally
            });
        self.finish(tally, explanations.len())
    }

    /// Same reduction as [`aggregate`](Self::aggregate), split across threads.
    /// Scores can differ from the sequential result only by float summation order.
    pub fn aggregate_parallel(&self, explanations: &[Explanation]) -> Vec<RootCauseBucket> {
        let n = self.taxonomy.len();
        let tally = explanations
            .par_iter()
            .fold(
                || Tally::new(n),
                |mut tally, e| {
                    self.absorb(&mut tally, e);
                    tally
                },
            )
            .reduce(|| Tally::new(n), Tally::merge);
        self.finish(tally, explanations.len())
    }

    /// Bucket slots a feature token is attributed to, or `None` if it is skipped.
    fn slots_for(&self, token: &str) -> Option<Vec<usize>> {
        let token = normalize_token(token);
        if token.is_empty() || STOP_WORDS.contains(&token.as_str()) {
            return None;
        }

        let mut matched = self.taxonomy.matching(&token);
        if matched.is_empty() {
            matched.push(self.taxonomy.len());
        }
        Some(matched)
    }

    fn absorb(&self, tally: &mut Tally, explanation: &Explanation) {
        for feature in &explanation.ranked_features {
            if let Some(slots) = self.slots_for(&feature.token) {
                let weight = feature.weight.abs();
                for slot in slots {
                    tally.add(slot, weight);
                }
            }
        }
    }

    fn finish(&self, tally: Tally, n_explanations: usize) -> Vec<RootCauseBucket> {
        // Merge by name so a taxonomy bucket called "Other" shares the reserved slot.
        let mut by_name: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        let names = self
            .taxonomy
            .bucket_names()
            .chain(std::iter::once(OTHER_BUCKET));
        for (name, (score, count)) in names.zip(tally.scores.into_iter().zip(tally.counts)) {
            if count == 0 {
                continue;
            }
            let entry = by_name.entry(name).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += count;
        }

        let mut buckets: Vec<RootCauseBucket> = by_name
            .into_iter()
            .map(|(name, (aggregated_score, count))| RootCauseBucket {
                name: name.to_string(),
                aggregated_score,
                count,
            })
            .collect();
        buckets.sort_by(|a, b| {
            b.aggregated_score
                .total_cmp(&a.aggregated_score)
                .then_with(|| a.name.cmp(&b.name))
        });

        debug!(
            explanations = n_explanations,
            buckets = buckets.len(),
            "Aggregated root causes"
        );
        buckets
    }
}

/// Validates `taxonomy` and aggregates `explanations` in one call.
pub fn aggregate(explanations: &[Explanation], taxonomy: &Taxonomy) -> Result<Vec<RootCauseBucket>> {
    Ok(Aggregator::new(taxonomy.clone())?.aggregate(explanations))
}
