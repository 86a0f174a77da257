// src/core/data.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single incident report, as supplied by the producer upstream.
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Unique within a run.
    pub id: String,
    /// ISO-8601 timestamp, kept as the producer wrote it.
    pub timestamp: String,
    pub location: String,
    pub description: String,
    pub witness_count: u32,
    pub injured: bool,
}

/// Sparse TF-IDF vector: vocabulary index -> non-negative weight.
/// Ephemeral; recomputed from text whenever it is needed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    entries: BTreeMap<usize, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize, weight: f64) {
        self.entries.insert(index, weight);
    }

    pub fn get(&self, index: usize) -> f64 {
        self.entries.get(&index).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(index, weight)` pairs in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().map(|(&i, &w)| (i, w))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut f64> + '_ {
        self.entries.values_mut()
    }

    /// Dot product against a dense coefficient row. Indices outside the row
    /// contribute nothing.
    pub fn dot(&self, dense: ndarray::ArrayView1<f64>) -> f64 {
        self.entries
            .iter()
            .filter_map(|(&i, &w)| dense.get(i).map(|c| c * w))
            .sum()
    }
}

/// One perturbed variant of the text being explained.
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbedSample {
    /// One flag per unique token of the original text, in first-appearance
    /// order (true = kept).
    pub token_mask: Vec<bool>,
    /// The original text with every masked-out token removed.
    pub text: String,
    /// Fraction of unique tokens removed: 0 = original, 1 = everything removed.
    pub distance: f64,
}

/// A token and its signed local importance for the predicted class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    #[serde(rename = "feature")]
    pub token: String,
    pub weight: f64,
}

impl FeatureWeight {
    pub fn new(token: impl Into<String>, weight: f64) -> Self {
        FeatureWeight {
            token: token.into(),
            weight,
        }
    }
}

/// Represents the output of a local explanation for a single text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Set when the explained text came from an [`Incident`].
    pub incident_id: Option<String>,
    pub predicted_label: String,
    /// One entry per class of the model, summing to 1.
    pub predicted_probabilities: BTreeMap<String, f64>,
    /// Sorted by descending absolute weight, ties by token; at most `top_k` long.
    pub ranked_features: Vec<FeatureWeight>,
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Explanation:")?;
        if let Some(id) = &self.incident_id {
            writeln!(f, "  Incident:        {}", id)?;
        }
        writeln!(f, "  Predicted Label: {}", self.predicted_label)?;
        writeln!(f, "  Probabilities:")?;
        for (label, p) in &self.predicted_probabilities {
            writeln!(f, "    {}: {:.4}", label, p)?;
        }
        writeln!(f, "  Ranked Features:")?;
        for feat in &self.ranked_features {
            writeln!(f, "    {}: {:+.4}", feat.token, feat.weight)?;
        }
        Ok(())
    }
}

/// A named root cause with the evidence attributed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseBucket {
    pub name: String,
    /// Sum of absolute feature weights matched to this bucket.
    pub aggregated_score: f64,
    /// Number of feature matches.
    pub count: usize,
}

/// An incident joined with its explanation, in the shape external reporting consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentLogEntry {
    pub id: String,
    pub timestamp: String,
    pub location: String,
    pub description: String,
    pub witness_count: u32,
    pub injured: bool,
    pub predicted_severity: String,
    pub predicted_proba: BTreeMap<String, f64>,
    pub explanation: Vec<FeatureWeight>,
    pub summary: String,
}

impl IncidentLogEntry {
    pub fn new(incident: &Incident, explanation: &Explanation) -> Self {
        let phrases: Vec<&str> = explanation
            .ranked_features
            .iter()
            .map(|f| f.token.as_str())
            .collect();
        let summary = format!(
            "Incident at {} on {}: classified as {}. Key contributing phrases: {}.",
            incident.location,
            incident.timestamp,
            explanation.predicted_label,
            phrases.join(", ")
        );

        IncidentLogEntry {
            id: incident.id.clone(),
            timestamp: incident.timestamp.clone(),
            location: incident.location.clone(),
            description: incident.description.clone(),
            witness_count: incident.witness_count,
            injured: incident.injured,
            predicted_severity: explanation.predicted_label.clone(),
            predicted_proba: explanation.predicted_probabilities.clone(),
            explanation: explanation.ranked_features.clone(),
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample_incident() -> Incident {
        Incident {
            id: "inc-7".to_string(),
            timestamp: "2024-03-01T08:15:00".to_string(),
            location: "Loading Dock".to_string(),
            description: "Forklift collided with pallet".to_string(),
            witness_count: 2,
            injured: false,
        }
    }

    #[test]
    fn feature_vector_dot_ignores_out_of_range_indices() {
        let mut fv = FeatureVector::new();
        fv.insert(0, 2.0);
        fv.insert(2, 0.5);
        fv.insert(9, 100.0);
        let row = array![1.0, 7.0, 4.0];
        assert_eq!(fv.dot(row.view()), 4.0);
        assert_eq!(fv.get(1), 0.0);
    }

    #[test]
    fn log_entry_summary_lists_top_phrases() {
        let mut probs = BTreeMap::new();
        probs.insert("major".to_string(), 0.7);
        probs.insert("minor".to_string(), 0.3);
        let explanation = Explanation {
            incident_id: Some("inc-7".to_string()),
            predicted_label: "major".to_string(),
            predicted_probabilities: probs,
            ranked_features: vec![
                FeatureWeight::new("forklift", 0.4),
                FeatureWeight::new("pallet", -0.1),
            ],
        };

        let entry = IncidentLogEntry::new(&sample_incident(), &explanation);
        assert_eq!(
            entry.summary,
            "Incident at Loading Dock on 2024-03-01T08:15:00: classified as major. \
             Key contributing phrases: forklift, pallet."
        );
        assert_eq!(entry.predicted_severity, "major");
        assert_eq!(entry.explanation.len(), 2);
    }

    #[test]
    fn feature_weight_serializes_with_feature_key() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&FeatureWeight::new("fire", 0.25))?;
        assert_eq!(json, r#"{"feature":"fire","weight":0.25}"#);
        Ok(())
    }
}
