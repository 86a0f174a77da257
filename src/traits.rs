// src/traits.rs
use crate::core::Result;
use ndarray::Array2;

/// A text classifier that can be explained.
///
/// The explainer only ever talks to the model through this trait, so any
/// probabilistic text classifier can be plugged in, not just [`crate::TextClassifier`].
pub trait ProbabilisticTextModel {
    /// Class labels in the model's column order.
    fn classes(&self) -> &[String];

    /// Class probabilities for a batch of texts: one row per text, one column
    /// per entry of [`classes`](Self::classes), each row summing to 1.
    fn predict_proba(&self, texts: &[String]) -> Result<Array2<f64>>;
}

impl<T: ProbabilisticTextModel + ?Sized> ProbabilisticTextModel for &T {
    fn classes(&self) -> &[String] {
        (**self).classes()
    }

    fn predict_proba(&self, texts: &[String]) -> Result<Array2<f64>> {
        (**self).predict_proba(texts)
    }
}
