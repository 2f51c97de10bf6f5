//! The seam between request handling and the model: a `Classifier` maps a
//! normalized `Sample` to a `Distribution` over the ten digit classes

use crate::shape::{CLASSES, SAMPLE_LEN};
use anyhow::{anyhow, Result};
use std::fmt::Debug;

/// A preprocessed input: 28x28 grayscale pixels, row-major, each in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Sample(Vec<f32>);

impl Sample {
    pub fn new(pixels: Vec<f32>) -> Result<Self> {
        if pixels.len() != SAMPLE_LEN {
            return Err(anyhow!(
                "sample must have {SAMPLE_LEN} pixels, got {}",
                pixels.len()
            ));
        }
        Ok(Sample(pixels))
    }

    pub fn pixels(&self) -> &[f32] {
        &self.0
    }
}

/// How far the probabilities of a distribution may sum away from 1
const SUM_TOLERANCE: f32 = 1e-3;

/// Class probabilities, indexed by digit. Every value is in [0, 1] and
/// they sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution(Vec<f32>);

impl Distribution {
    pub fn new(probabilities: Vec<f32>) -> Result<Self> {
        if probabilities.len() != CLASSES {
            return Err(anyhow!(
                "classifier must output {CLASSES} probabilities, got {}",
                probabilities.len()
            ));
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(anyhow!("classifier output contains non-finite values"));
        }
        if probabilities.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(anyhow!(
                "classifier output is not a probability distribution: {probabilities:?}"
            ));
        }
        let total: f32 = probabilities.iter().sum();
        if (total - 1.0).abs() > SUM_TOLERANCE {
            return Err(anyhow!(
                "classifier probabilities sum to {total}, expected 1"
            ));
        }
        Ok(Distribution(probabilities))
    }

    pub fn probabilities(&self) -> &[f32] {
        &self.0
    }

    /// The most probable class. Ties go to the lowest digit.
    pub fn top(&self) -> Prediction {
        let (label, confidence) = self
            .0
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            });
        Prediction {
            label: label as u8,
            confidence,
        }
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

/// A single digit prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: u8,
    pub confidence: f32,
}

/// A pre-trained digit classifier. Implementations are loaded once and
/// shared read-only between requests.
pub trait Classifier: Send + Sync + Debug {
    fn classify(&self, sample: &Sample) -> Result<Distribution>;
}
