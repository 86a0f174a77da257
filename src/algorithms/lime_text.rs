// src/algorithms/lime_text.rs

use crate::algorithms::classifier::argmax;
use crate::algorithms::perturbation::{PerturbationSampler, TokenizedText};
use crate::algorithms::ridge::{solve_weighted_ridge, RidgeFit};
use crate::core::{
    Explanation, ExplainerConfig, FeatureWeight, Incident, IncidentLimeError, PerturbedSample,
    Result,
};
use crate::traits::ProbabilisticTextModel;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Everything computed while fitting the local surrogate for one text.
#[derive(Debug, Clone)]
pub struct SurrogateFit {
    /// Column of the explained class in the model's output.
    pub target_class: usize,
    /// Unique tokens of the text, one surrogate feature each.
    pub tokens: Vec<String>,
    pub samples: Vec<PerturbedSample>,
    /// Target-class probability of each sample.
    pub targets: Array1<f64>,
    pub kernel_weights: Array1<f64>,
    pub ridge: RidgeFit,
}

/// Explains a text classifier's predictions by fitting a kernel-weighted
/// linear model on token-deletion perturbations of the input.
#[derive(Debug)]
pub struct LocalExplainer<M: ProbabilisticTextModel> {
    model: M,
    sampler: PerturbationSampler,
    config: ExplainerConfig,
}

impl<M: ProbabilisticTextModel> LocalExplainer<M> {
    pub fn new(model: M, config: Option<ExplainerConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        config.validate()?;
        if model.classes().is_empty() {
            return Err(IncidentLimeError::Explanation(
                "Model declares no classes.".to_string(),
            ));
        }
        Ok(LocalExplainer {
            model,
            sampler: PerturbationSampler::new(),
            config,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &ExplainerConfig {
        &self.config
    }

    /// Explains `text` with the configured seed.
    pub fn explain(&self, text: &str) -> Result<Explanation> {
        self.explain_with_seed(text, self.config.seed)
    }

    pub fn explain_with_seed(&self, text: &str, seed: u64) -> Result<Explanation> {
        let (target_class, probabilities) = self.predict_one(text)?;
        let classes = self.model.classes();
        let predicted_label = classes[target_class].clone();
        let predicted_probabilities: BTreeMap<String, f64> = classes
            .iter()
            .cloned()
            .zip(probabilities.iter().copied())
            .collect();

        let tokens = TokenizedText::new(text);
        if tokens.is_empty() {
            // No covariates: report the unconditional prediction only.
            debug!(label = %predicted_label, "Text has no tokens; skipping perturbation");
            return Ok(Explanation {
                incident_id: None,
                predicted_label,
                predicted_probabilities,
                ranked_features: Vec::new(),
            });
        }

        let fit = self.fit_tokens(&tokens, target_class, seed)?;
        let ranked_features = rank_features(&fit.tokens, &fit.ridge.coefficients, self.config.top_k);

        debug!(
            label = %predicted_label,
            tokens = fit.tokens.len(),
            samples = fit.samples.len(),
            intercept = fit.ridge.intercept,
            "Explained text"
        );

        Ok(Explanation {
            incident_id: None,
            predicted_label,
            predicted_probabilities,
            ranked_features,
        })
    }

    /// Runs steps 1-6 of the explanation and returns the intermediate state.
    /// Returns `None` for a text without tokens.
    pub fn fit_surrogate(&self, text: &str, seed: u64) -> Result<Option<SurrogateFit>> {
        let (target_class, _) = self.predict_one(text)?;
        let tokens = TokenizedText::new(text);
        if tokens.is_empty() {
            return Ok(None);
        }
        self.fit_tokens(&tokens, target_class, seed).map(Some)
    }

    pub fn explain_incident(&self, incident: &Incident) -> Result<Explanation> {
        self.explain_incident_with_seed(incident, self.config.seed)
    }

    /// Explains every incident in parallel. Incident `i` uses seed
    /// `config.seed + i`, so the output does not depend on thread scheduling.
    pub fn explain_batch(&self, incidents: &[Incident]) -> Result<Vec<Explanation>>
    where
        M: Sync,
    {
        let base = self.config.seed;
        incidents
            .par_iter()
            .enumerate()
            .map(|(i, incident)| self.explain_incident_with_seed(incident, base.wrapping_add(i as u64)))
            .collect()
    }

    fn explain_incident_with_seed(&self, incident: &Incident, seed: u64) -> Result<Explanation> {
        let mut explanation = self.explain_with_seed(&incident.description, seed)?;
        explanation.incident_id = Some(incident.id.clone());
        Ok(explanation)
    }

    /// Class probabilities of the unperturbed text and the index of the
    /// predicted class.
    fn predict_one(&self, text: &str) -> Result<(usize, Array1<f64>)> {
        let n_classes = self.model.classes().len();
        let proba = self.model.predict_proba(&[text.to_string()])?;
        if proba.dim() != (1, n_classes) {
            return Err(IncidentLimeError::Explanation(format!(
                "Model returned a {:?} probability matrix for 1 text and {} classes.",
                proba.dim(),
                n_classes
            )));
        }
        let row = proba.row(0).to_owned();
        Ok((argmax(&row), row))
    }

    fn fit_tokens(
        &self,
        tokens: &TokenizedText<'_>,
        target_class: usize,
        seed: u64,
    ) -> Result<SurrogateFit> {
        let samples = self
            .sampler
            .sample_tokens(tokens, self.config.num_samples, seed)?;

        let texts: Vec<String> = samples.iter().map(|s| s.text.clone()).collect();
        let proba = self.model.predict_proba(&texts)?;
        if proba.nrows() != samples.len() || target_class >= proba.ncols() {
            return Err(IncidentLimeError::Explanation(format!(
                "Model returned a {:?} probability matrix for {} samples; class {} is missing.",
                proba.dim(),
                samples.len(),
                target_class
            )));
        }
        let targets = proba.column(target_class).to_owned();

        let width_sq = self.config.kernel_width * self.config.kernel_width;
        let kernel_weights: Array1<f64> = samples
            .iter()
            .map(|s| (-(s.distance * s.distance) / width_sq).exp())
            .collect();

        let m = tokens.num_unique();
        let design = Array2::from_shape_fn((samples.len(), m), |(i, j)| {
            if samples[i].token_mask[j] {
                1.0
            } else {
                0.0
            }
        });

        let ridge = solve_weighted_ridge(
            design.view(),
            targets.view(),
            kernel_weights.view(),
            self.config.ridge_alpha,
        )?;

        Ok(SurrogateFit {
            target_class,
            tokens: tokens.unique_tokens().iter().map(|t| t.to_string()).collect(),
            samples,
            targets,
            kernel_weights,
            ridge,
        })
    }
}

/// Sorts tokens by descending absolute coefficient, ties by token, and keeps `top_k`.
pub(crate) fn rank_features(tokens: &[String], coefficients: &Array1<f64>, top_k: usize) -> Vec<FeatureWeight> {
    let mut ranked: Vec<FeatureWeight> = tokens
        .iter()
        .zip(coefficients.iter())
        .map(|(t, &w)| FeatureWeight::new(t.clone(), w))
        .collect();
    ranked.sort_by(|a, b| {
        b.weight
            .abs()
            .total_cmp(&a.weight.abs())
            .then_with(|| a.token.cmp(&b.token))
    });
    ranked.truncate(top_k);
    ranked
}
