// src/algorithms/perturbation.rs

use crate::core::{IncidentLimeError, PerturbedSample, Result};
use crate::utils::token_spans;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Distribution, Uniform};
use std::collections::HashMap;
use std::ops::Range;

/// A text split into its alphanumeric tokens, independent of any vocabulary.
///
/// Perturbation works on *unique* tokens: dropping a token drops every
/// occurrence of it.
#[derive(Debug, Clone)]
pub struct TokenizedText<'a> {
    text: &'a str,
    spans: Vec<Range<usize>>,
    /// For each span, its position in `unique`.
    span_token: Vec<usize>,
    unique: Vec<&'a str>,
}

impl<'a> TokenizedText<'a> {
    pub fn new(text: &'a str) -> Self {
        let spans = token_spans(text);
        let mut seen: HashMap<&'a str, usize> = HashMap::new();
        let mut unique = Vec::new();
        let mut span_token = Vec::with_capacity(spans.len());

        for span in &spans {
            let token = &text[span.clone()];
            let id = *seen.entry(token).or_insert_with(|| {
                unique.push(token);
                unique.len() - 1
            });
            span_token.push(id);
        }

        TokenizedText {
            text,
            spans,
            span_token,
            unique,
        }
    }

    /// Unique tokens in order of first appearance.
    pub fn unique_tokens(&self) -> &[&'a str] {
        &self.unique
    }

    pub fn num_unique(&self) -> usize {
        self.unique.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Rebuilds the text keeping only tokens whose mask entry is true. Each
    /// kept token after the first is preceded by the separator that directly
    /// preceded it in the original text; separators of dropped tokens go with them.
    pub fn reconstruct(&self, mask: &[bool]) -> String {
        let mut out = String::with_capacity(self.text.len());
        for (i, span) in self.spans.iter().enumerate() {
            if !mask[self.span_token[i]] {
                continue;
            }
            if !out.is_empty() {
                let sep_start = if i == 0 { 0 } else { self.spans[i - 1].end };
                out.push_str(&self.text[sep_start..span.start]);
            }
            out.push_str(&self.text[span.clone()]);
        }
        out
    }
}

/// Generates seeded token-deletion perturbations of a text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerturbationSampler;

impl PerturbationSampler {
    pub fn new() -> Self {
        PerturbationSampler
    }

    /// Draws `num_samples` perturbations of `text`. The first sample is
    /// always the unperturbed text at distance 0. Each further sample draws
    /// a keep probability uniformly from `[0, 1)` and keeps each unique token
    /// with that probability.
    ///
    /// A text without tokens yields only the unperturbed sample.
    /// Identical `(text, num_samples, seed)` reproduce identical output.
    pub fn sample(&self, text: &str, num_samples: usize, seed: u64) -> Result<Vec<PerturbedSample>> {
        let tokens = TokenizedText::new(text);
        self.sample_tokens(&tokens, num_samples, seed)
    }

    pub fn sample_tokens(
        &self,
        tokens: &TokenizedText<'_>,
        num_samples: usize,
        seed: u64,
    ) -> Result<Vec<PerturbedSample>> {
        if num_samples == 0 {
            return Err(IncidentLimeError::Explanation(
                "num_samples must be at least 1.".to_string(),
            ));
        }

        let m = tokens.num_unique();
        let mut samples = Vec::with_capacity(num_samples);
        samples.push(PerturbedSample {
            token_mask: vec![true; m],
            text: tokens.text.to_string(),
            distance: 0.0,
        });
        if m == 0 {
            return Ok(samples);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let keep_probability = Uniform::new(0.0, 1.0);

        for _ in 1..num_samples {
            let p = keep_probability.sample(&mut rng);
            let keep = Bernoulli::new(p).map_err(|e| {
                IncidentLimeError::Explanation(format!("Invalid keep probability {}: {}", p, e))
            })?;
            let mask: Vec<bool> = (0..m).map(|_| keep.sample(&mut rng)).collect();
            let removed = mask.iter().filter(|&&kept| !kept).count();

            samples.push(PerturbedSample {
                text: tokens.reconstruct(&mask),
                distance: removed as f64 / m as f64,
                token_mask: mask,
            });
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_sample_is_the_original() -> Result<()> {
        let text = "Forklift collided with pallet";
        let samples = PerturbationSampler::new().sample(text, 20, 7)?;
        assert_eq!(samples.len(), 20);
        assert_eq!(samples[0].text, text);
        assert_eq!(samples[0].distance, 0.0);
        assert!(samples[0].token_mask.iter().all(|&k| k));
        Ok(())
    }

    #[test]
    fn zero_samples_is_an_explanation_error() {
        let err = PerturbationSampler::new().sample("fire alarm", 0, 1).unwrap_err();
        assert!(matches!(err, IncidentLimeError::Explanation(_)));
    }

    #[test]
    fn empty_text_yields_only_the_original() -> Result<()> {
        let samples = PerturbationSampler::new().sample("  ,; ", 50, 3)?;
        assert_eq!(samples.len(), 1);
        assert!(samples[0].token_mask.is_empty());
        Ok(())
    }

    #[test]
    fn duplicate_tokens_share_one_mask_entry() {
        let tokens = TokenizedText::new("water on floor, water everywhere");
        assert_eq!(tokens.unique_tokens(), &["water", "on", "floor", "everywhere"]);
        assert_eq!(tokens.reconstruct(&[false, true, true, true]), "on floor everywhere");
    }

    #[test]
    fn reconstruction_keeps_original_separators() {
        let tokens = TokenizedText::new("Chemical spill; near  storage shelf");
        assert_eq!(
            tokens.reconstruct(&[true, true, false, true, true]),
            "Chemical spill  storage shelf"
        );
        assert_eq!(tokens.reconstruct(&[false, false, false, false, false]), "");
    }

    #[test]
    fn mask_and_distance_agree_with_text() -> Result<()> {
        let samples = PerturbationSampler::new().sample("worker slipped on wet floor", 100, 11)?;
        for s in &samples {
            let kept = s.token_mask.iter().filter(|&&k| k).count();
            assert!((s.distance - (5 - kept) as f64 / 5.0).abs() < 1e-12);
            assert_eq!(s.text.split_whitespace().count(), kept);
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn same_seed_same_samples(text in "[a-z ]{0,40}", n in 1usize..40, seed in any::<u64>()) {
            let sampler = PerturbationSampler::new();
            let a = sampler.sample(&text, n, seed).unwrap();
            let b = sampler.sample(&text, n, seed).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn distances_stay_in_unit_interval(text in "[a-z]{1,6}( [a-z]{1,6}){0,8}", seed in any::<u64>()) {
            let samples = PerturbationSampler::new().sample(&text, 30, seed).unwrap();
            prop_assert!(samples.iter().any(|s| s.distance == 0.0));
            prop_assert!(samples.iter().all(|s| (0.0..=1.0).contains(&s.distance)));
        }
    }
}
