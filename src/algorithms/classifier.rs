// src/algorithms/classifier.rs

use crate::core::{ClassifierConfig, FeatureVector, IncidentLimeError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// A trained multinomial logistic regression over a frozen vocabulary.
/// Immutable after training; shared read-only by every explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassModel {
    /// Labels in training-time discovery order.
    classes: Vec<String>,
    /// `classes × vocabulary` coefficients.
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl ClassModel {
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn bias(&self) -> &Array1<f64> {
        &self.bias
    }

    pub fn num_features(&self) -> usize {
        self.weights.ncols()
    }

    /// Class probabilities in `classes()` order.
    pub fn predict_proba(&self, features: &FeatureVector) -> Array1<f64> {
        let logits = self.logits(features);
        softmax(logits)
    }

    /// Same as [`predict_proba`](Self::predict_proba), keyed by label.
    pub fn label_probabilities(&self, features: &FeatureVector) -> BTreeMap<String, f64> {
        let proba = self.predict_proba(features);
        self.classes
            .iter()
            .cloned()
            .zip(proba.iter().copied())
            .collect()
    }

    /// Arg-max label; ties go to the class discovered first during training.
    pub fn predict(&self, features: &FeatureVector) -> &str {
        let proba = self.predict_proba(features);
        &self.classes[argmax(&proba)]
    }

    fn logits(&self, features: &FeatureVector) -> Array1<f64> {
        let mut logits = self.bias.clone();
        for (k, logit) in logits.iter_mut().enumerate() {
            *logit += features.dot(self.weights.row(k));
        }
        logits
    }
}

/// Trains [`ClassModel`]s with full-batch gradient descent on the
/// L2-regularised cross-entropy loss.
#[derive(Debug, Clone, Default)]
pub struct SoftmaxClassifier {
    config: ClassifierConfig,
}

impl SoftmaxClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        SoftmaxClassifier { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Fits a model over `num_features` vocabulary columns.
    ///
    /// Stops after `max_iter` iterations or once every gradient component is
    /// below `tolerance`, whichever comes first.
    pub fn fit<S: AsRef<str>>(
        &self,
        features: &[FeatureVector],
        labels: &[S],
        num_features: usize,
    ) -> Result<ClassModel> {
        if features.len() != labels.len() {
            return Err(IncidentLimeError::InvalidInput(format!(
                "Got {} feature vectors but {} labels.",
                features.len(),
                labels.len()
            )));
        }

        let mut classes: Vec<String> = Vec::new();
        let mut targets: Vec<usize> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref();
            let idx = match classes.iter().position(|c| c == label) {
                Some(idx) => idx,
                None => {
                    classes.push(label.to_string());
                    classes.len() - 1
                }
            };
            targets.push(idx);
        }

        if classes.len() < 2 {
            return Err(IncidentLimeError::Training(format!(
                "At least 2 distinct labels are required, found {}.",
                classes.len()
            )));
        }

        let n_classes = classes.len();
        let n_samples = features.len() as f64;
        let lr = self.config.learning_rate;
        let l2 = self.config.l2_penalty;

        let normal = Normal::new(0.0, self.config.init_std_dev).map_err(|e| {
            IncidentLimeError::Training(format!("Invalid initialisation std-dev: {}", e))
        })?;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut weights =
            Array2::from_shape_fn((n_classes, num_features), |_| normal.sample(&mut rng));
        let mut bias = Array1::<f64>::zeros(n_classes);

        info!(
            samples = features.len(),
            classes = n_classes,
            num_features,
            "Training softmax classifier"
        );

        let mut converged = false;
        let mut iterations = 0;
        for _ in 0..self.config.max_iter {
            iterations += 1;
            let mut grad_w = &weights * l2;
            let mut grad_b = Array1::<f64>::zeros(n_classes);

            for (x, &y) in features.iter().zip(&targets) {
                let mut logits = bias.clone();
                for (k, logit) in logits.iter_mut().enumerate() {
                    *logit += x.dot(weights.row(k));
                }
                let mut error = softmax(logits);
                error[y] -= 1.0;

                for k in 0..n_classes {
                    let e = error[k] / n_samples;
                    grad_b[k] += e;
                    for (j, v) in x.iter() {
                        if j < num_features {
                            grad_w[[k, j]] += e * v;
                        }
                    }
                }
            }

            let max_grad = grad_w
                .iter()
                .chain(grad_b.iter())
                .fold(0.0_f64, |acc, g| acc.max(g.abs()));

            weights.scaled_add(-lr, &grad_w);
            bias.scaled_add(-lr, &grad_b);

            if !max_grad.is_finite() {
                break;
            }
            if max_grad < self.config.tolerance {
                converged = true;
                break;
            }
        }

        if weights.iter().chain(bias.iter()).any(|v| !v.is_finite()) {
            return Err(IncidentLimeError::Training(format!(
                "Optimizer diverged after {} iterations (non-finite weights).",
                iterations
            )));
        }

        let model = ClassModel {
            classes,
            weights,
            bias,
        };
        let loss = cross_entropy(&model, features, &targets, l2);
        if converged {
            info!(iterations, loss, "Softmax classifier converged");
        } else {
            warn!(iterations, loss, "Softmax classifier hit the iteration budget");
        }
        debug!(classes = ?model.classes, "Class order");
        Ok(model)
    }
}

/// Numerically stable softmax.
pub(crate) fn softmax(mut logits: Array1<f64>) -> Array1<f64> {
    let max = logits.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    logits.mapv_inplace(|v| (v - max).exp());
    let sum = logits.sum();
    logits /= sum;
    logits
}

/// Index of the largest entry; the first one wins a tie.
pub(crate) fn argmax(values: &Array1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn cross_entropy(model: &ClassModel, features: &[FeatureVector], targets: &[usize], l2: f64) -> f64 {
    let data_loss: f64 = features
        .iter()
        .zip(targets)
        .map(|(x, &y)| -model.predict_proba(x)[y].max(f64::MIN_POSITIVE).ln())
        .sum::<f64>()
        / features.len().max(1) as f64;
    data_loss + 0.5 * l2 * model.weights.iter().map(|w| w * w).sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn fv(entries: &[(usize, f64)]) -> FeatureVector {
        let mut v = FeatureVector::new();
        for &(i, w) in entries {
            v.insert(i, w);
        }
        v
    }

    fn toy_data() -> (Vec<FeatureVector>, Vec<&'static str>) {
        (
            vec![
                fv(&[(0, 1.0)]),
                fv(&[(1, 1.0)]),
                fv(&[(2, 1.0)]),
                fv(&[(0, 0.8), (3, 0.6)]),
            ],
            vec!["critical", "minor", "major", "critical"],
        )
    }

    #[test]
    fn single_label_is_a_training_error() {
        let features = vec![fv(&[(0, 1.0)]), fv(&[(1, 1.0)])];
        let err = SoftmaxClassifier::default()
            .fit(&features, &["minor", "minor"], 2)
            .unwrap_err();
        assert!(matches!(err, IncidentLimeError::Training(_)));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let features = vec![fv(&[(0, 1.0)])];
        let err = SoftmaxClassifier::default()
            .fit(&features, &["a", "b"], 1)
            .unwrap_err();
        assert!(matches!(err, IncidentLimeError::InvalidInput(_)));
    }

    #[test]
    fn classes_keep_discovery_order() -> Result<()> {
        let (features, labels) = toy_data();
        let model = SoftmaxClassifier::default().fit(&features, &labels, 4)?;
        assert_eq!(model.classes(), &["critical", "minor", "major"]);
        assert_eq!(model.weights().dim(), (3, 4));
        Ok(())
    }

    #[test]
    fn fits_separable_training_data() -> Result<()> {
        let (features, labels) = toy_data();
        let model = SoftmaxClassifier::default().fit(&features, &labels, 4)?;
        for (x, label) in features.iter().zip(&labels) {
            assert_eq!(model.predict(x), *label);
        }
        Ok(())
    }

    #[test]
    fn probabilities_sum_to_one() -> Result<()> {
        let (features, labels) = toy_data();
        let model = SoftmaxClassifier::default().fit(&features, &labels, 4)?;
        for x in features.iter().chain(std::iter::once(&FeatureVector::new())) {
            assert_abs_diff_eq!(model.predict_proba(x).sum(), 1.0, epsilon = 1e-6);
            assert_eq!(model.label_probabilities(x).len(), 3);
        }
        Ok(())
    }

    #[test]
    fn training_is_deterministic_for_a_seed() -> Result<()> {
        let (features, labels) = toy_data();
        let a = SoftmaxClassifier::default().fit(&features, &labels, 4)?;
        let b = SoftmaxClassifier::default().fit(&features, &labels, 4)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn divergence_is_a_training_error() {
        let (features, labels) = toy_data();
        let config = ClassifierConfig {
            learning_rate: f64::INFINITY,
            ..Default::default()
        };
        let err = SoftmaxClassifier::new(config)
            .fit(&features, &labels, 4)
            .unwrap_err();
        assert!(matches!(err, IncidentLimeError::Training(_)));
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&array![0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&array![0.1, 0.45, 0.45]), 1);
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let p = softmax(array![1000.0, 1000.0]);
        assert_abs_diff_eq!(p[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(p[1], 0.5, epsilon = 1e-12);
    }
}
