// src/algorithms/text_classifier.rs

use crate::algorithms::classifier::{ClassModel, SoftmaxClassifier};
use crate::algorithms::severity::heuristic_label;
use crate::algorithms::vectorizer::{TfidfVectorizer, Vocabulary};
use crate::core::{FeatureVector, Incident, PipelineConfig, Result};
use crate::traits::ProbabilisticTextModel;
use ndarray::Array2;
use std::collections::BTreeMap;

/// A frozen [`Vocabulary`] and the [`ClassModel`] trained on it, joined at
/// the [`FeatureVector`] boundary. Cheap to share across threads: it is
/// never mutated after training.
#[derive(Debug, Clone)]
pub struct TextClassifier {
    vocabulary: Vocabulary,
    model: ClassModel,
}

impl TextClassifier {
    pub fn new(vocabulary: Vocabulary, model: ClassModel) -> Self {
        TextClassifier { vocabulary, model }
    }

    /// Fits the vocabulary, vectorizes the corpus and trains the model.
    pub fn train<S: AsRef<str>, L: AsRef<str>>(
        texts: &[S],
        labels: &[L],
        config: &PipelineConfig,
    ) -> Result<Self> {
        let vectorizer = TfidfVectorizer::new(config.vectorizer.clone());
        let vocabulary = vectorizer.fit(texts)?;
        let features: Vec<FeatureVector> = texts
            .iter()
            .map(|t| vectorizer.transform(t.as_ref(), &vocabulary))
            .collect();
        let model = SoftmaxClassifier::new(config.classifier.clone()).fit(
            &features,
            labels,
            vocabulary.len(),
        )?;
        Ok(TextClassifier { vocabulary, model })
    }

    /// Trains on incident descriptions labelled by [`heuristic_label`].
    pub fn train_on_incidents(incidents: &[Incident], config: &PipelineConfig) -> Result<Self> {
        let texts: Vec<&str> = incidents.iter().map(|i| i.description.as_str()).collect();
        let labels: Vec<&str> = incidents
            .iter()
            .map(|i| heuristic_label(&i.description, i.injured, i.witness_count))
            .collect();
        Self::train(&texts, &labels, config)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn model(&self) -> &ClassModel {
        &self.model
    }

    pub fn features(&self, text: &str) -> FeatureVector {
        self.vocabulary.transform(text)
    }

    pub fn predict(&self, text: &str) -> &str {
        self.model.predict(&self.features(text))
    }

    pub fn label_probabilities(&self, text: &str) -> BTreeMap<String, f64> {
        self.model.label_probabilities(&self.features(text))
    }
}

impl ProbabilisticTextModel for TextClassifier {
    fn classes(&self) -> &[String] {
        self.model.classes()
    }

    fn predict_proba(&self, texts: &[String]) -> Result<Array2<f64>> {
        let n_classes = self.model.classes().len();
        let mut out = Array2::zeros((texts.len(), n_classes));
        for (mut row, text) in out.rows_mut().into_iter().zip(texts) {
            row.assign(&self.model.predict_proba(&self.features(text)));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IncidentLimeError;
    use approx::assert_abs_diff_eq;

    fn incident(id: &str, description: &str, injured: bool) -> Incident {
        Incident {
            id: id.to_string(),
            timestamp: "2024-01-01T00:00:00".to_string(),
            location: "Warehouse A".to_string(),
            description: description.to_string(),
            witness_count: 0,
            injured,
        }
    }

    #[test]
    fn batched_probabilities_have_one_row_per_text() -> Result<()> {
        let clf = TextClassifier::train(
            &["chemical spill near shelf", "worker slipped on wet floor"],
            &["critical", "minor"],
            &PipelineConfig::default(),
        )?;
        let texts = vec![
            "chemical spill".to_string(),
            String::new(),
            "unrelated words".to_string(),
        ];
        let proba = clf.predict_proba(&texts)?;
        assert_eq!(proba.dim(), (3, 2));
        for row in proba.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-6);
        }
        assert_eq!(clf.predict("chemical spill"), "critical");
        Ok(())
    }

    #[test]
    fn trains_from_heuristic_incident_labels() -> Result<()> {
        let incidents = vec![
            incident("a", "Chemical spill near storage shelf", false),
            incident("b", "Ladder slipped during maintenance task", false),
            incident("c", "Employee cut hand while operating box cutter", false),
        ];
        let clf = TextClassifier::train_on_incidents(&incidents, &PipelineConfig::default())?;
        assert_eq!(clf.classes(), &["critical", "minor", "major"]);
        assert_eq!(clf.predict("chemical spill"), "critical");
        Ok(())
    }

    #[test]
    fn empty_corpus_fails_before_training() {
        let texts: Vec<&str> = Vec::new();
        let labels: Vec<&str> = Vec::new();
        let err = TextClassifier::train(&texts, &labels, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, IncidentLimeError::Vectorization(_)));
    }
}
