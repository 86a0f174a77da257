// src/core/config.rs
use crate::core::{IncidentLimeError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the TF-IDF vectorizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Vocabulary cap, by document frequency.
    pub max_features: usize,
    /// Inclusive n-gram range; `(1, 2)` keeps unigrams and bigrams.
    pub ngram_range: (usize, usize),
    /// Use `1 + ln(tf)` instead of raw term counts.
    pub sublinear_tf: bool,
    /// Scale each vector to unit Euclidean length.
    pub l2_normalize: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        VectorizerConfig {
            max_features: 2000,
            ngram_range: (1, 2),
            sublinear_tf: false,
            l2_normalize: true,
        }
    }
}

/// Configuration for the multinomial logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub learning_rate: f64,
    /// Iteration budget; training stops here even if not converged.
    pub max_iter: usize,
    /// Converged once the largest absolute gradient component drops below this.
    pub tolerance: f64,
    /// L2 penalty on the weights (the bias is not penalised).
    pub l2_penalty: f64,
    /// Seed for weight initialisation.
    pub seed: u64,
    pub init_std_dev: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            learning_rate: 0.5,
            max_iter: 1000,
            tolerance: 1e-6,
            l2_penalty: 1e-3,
            seed: 42,
            init_std_dev: 0.01,
        }
    }
}

/// Configuration for the local surrogate explainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainerConfig {
    /// Perturbed samples per explanation, the unperturbed text included.
    pub num_samples: usize,
    pub top_k: usize,
    /// Width of the exponential kernel over the removed-token fraction.
    pub kernel_width: f64,
    /// Ridge penalty of the surrogate fit. Must be positive so the fit is
    /// unique even with fewer samples than tokens.
    pub ridge_alpha: f64,
    pub seed: u64,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        ExplainerConfig {
            num_samples: 1000,
            top_k: 5,
            kernel_width: 0.25,
            ridge_alpha: 1.0,
            seed: 42,
        }
    }
}

impl ExplainerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_samples == 0 {
            return Err(IncidentLimeError::Explanation(
                "num_samples must be at least 1.".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(IncidentLimeError::Explanation(
                "top_k must be at least 1.".to_string(),
            ));
        }
        if !(self.kernel_width.is_finite() && self.kernel_width > 0.0) {
            return Err(IncidentLimeError::Explanation(format!(
                "kernel_width must be positive and finite, got {}.",
                self.kernel_width
            )));
        }
        if !(self.ridge_alpha.is_finite() && self.ridge_alpha > 0.0) {
            return Err(IncidentLimeError::Explanation(format!(
                "ridge_alpha must be positive and finite, got {}.",
                self.ridge_alpha
            )));
        }
        Ok(())
    }
}

/// Everything needed to train a classifier and explain its predictions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub vectorizer: VectorizerConfig,
    pub classifier: ClassifierConfig,
    pub explainer: ExplainerConfig,
}

impl PipelineConfig {
    /// Parses a (possibly partial) JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() -> Result<()> {
        let config = PipelineConfig::from_json_str(
            r#"{ "explainer": { "num_samples": 200 }, "vectorizer": { "max_features": 50 } }"#,
        )?;
        assert_eq!(config.explainer.num_samples, 200);
        assert_eq!(config.explainer.top_k, 5);
        assert_eq!(config.vectorizer.max_features, 50);
        assert_eq!(config.vectorizer.ngram_range, (1, 2));
        assert_eq!(config.classifier, ClassifierConfig::default());
        Ok(())
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = PipelineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, IncidentLimeError::Config(_)));
    }

    #[test]
    fn zero_samples_is_rejected() {
        let config = ExplainerConfig {
            num_samples: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(IncidentLimeError::Explanation(_))
        ));
    }

    #[test]
    fn non_positive_kernel_width_is_rejected() {
        let config = ExplainerConfig {
            kernel_width: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ExplainerConfig::default().validate().is_ok());
    }
}
