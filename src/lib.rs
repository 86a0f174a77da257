// src/lib.rs

//! `incident_lime` classifies short incident descriptions by severity and explains
//! each prediction with a LIME-style local surrogate: the text is perturbed by
//! deleting tokens, the classifier is queried on every variant, and a
//! kernel-weighted ridge regression turns the responses into per-token importances.
//! Explanations for many incidents can then be rolled up into ranked root-cause buckets.
//!
//! ```no_run
//! use incident_lime::{Aggregator, LocalExplainer, PipelineConfig, Taxonomy, TextClassifier};
//!
//! # fn main() -> incident_lime::Result<()> {
//! let config = PipelineConfig::default();
//! let classifier = TextClassifier::train(
//!     &["fire alarm overheated", "worker slipped on wet floor", "forklift collided with pallet"],
//!     &["critical", "minor", "major"],
//!     &config,
//! )?;
//!
//! let explainer = LocalExplainer::new(&classifier, Some(config.explainer.clone()))?;
//! let explanation = explainer.explain("fire alarm triggered")?;
//! println!("{}", explanation);
//!
//! let report = Aggregator::new(Taxonomy::workplace_safety())?.aggregate(&[explanation]);
//! for bucket in report {
//!     println!("{}: {:.3} ({})", bucket.name, bucket.aggregated_score, bucket.count);
//! }
//! # Ok(())
//! # }
//! ```

// Declare the main modules of the crate
pub mod algorithms;
pub mod core;
pub mod traits;
pub mod utils;

// Re-export key components for easier use by library consumers
pub use crate::algorithms::{
    aggregate, heuristic_label, Aggregator, ClassModel, LocalExplainer, PerturbationSampler,
    SoftmaxClassifier, Taxonomy, TextClassifier, TfidfVectorizer, Vocabulary,
};
pub use crate::core::{
    ClassifierConfig, Explanation, ExplainerConfig, FeatureVector, FeatureWeight, Incident,
    IncidentLimeError, IncidentLogEntry, PerturbedSample, PipelineConfig, Result, RootCauseBucket,
    VectorizerConfig,
};
pub use crate::traits::ProbabilisticTextModel;
