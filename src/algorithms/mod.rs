pub mod aggregator;
pub mod classifier;
pub mod lime_text;
pub mod perturbation;
pub mod ridge;
pub mod severity;
pub mod text_classifier;
pub mod vectorizer;

pub use aggregator::{aggregate, Aggregator, Taxonomy, OTHER_BUCKET, STOP_WORDS};
pub use classifier::{ClassModel, SoftmaxClassifier};
pub use lime_text::{LocalExplainer, SurrogateFit};
pub use perturbation::{PerturbationSampler, TokenizedText};
pub use ridge::{solve_weighted_ridge, RidgeFit};
pub use severity::heuristic_label;
pub use text_classifier::TextClassifier;
pub use vectorizer::{TfidfVectorizer, Vocabulary};
