//! The inference service: image source in, digit prediction out. Holds the
//! classifier that was loaded at startup and never mutates it.

use crate::classifier::{Classifier, Distribution, Prediction};
use crate::error::PredictError;
use crate::preprocess::{self, ImageSource, Polarity};
use image::GenericImageView;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of running the built-in synthetic digit through the model
#[derive(Debug, Clone)]
pub struct SelfTest {
    pub prediction: Prediction,
    pub distribution: Distribution,
}

#[derive(Debug, Clone)]
pub struct InferenceService {
    classifier: Arc<dyn Classifier>,
    polarity: Polarity,
}

impl InferenceService {
    pub fn new(classifier: Arc<dyn Classifier>, polarity: Polarity) -> Self {
        InferenceService {
            classifier,
            polarity,
        }
    }

    /// Decode, normalize and classify a single image
    pub fn predict(&self, source: &ImageSource) -> Result<Prediction, PredictError> {
        let image = source.decode()?;
        let (width, height) = image.dimensions();
        debug!("decoded {} image ({width}x{height})", source.kind());

        let sample = preprocess::preprocess(&image, self.polarity)?;
        let prediction = self.classifier.classify(&sample)?.top();

        info!(
            label = prediction.label,
            confidence = prediction.confidence,
            "predicted digit {} with confidence {:.4}",
            prediction.label,
            prediction.confidence
        );
        Ok(prediction)
    }

    /// Classify a fixed synthetic digit through the same path as `predict`
    pub fn self_test(&self) -> Result<SelfTest, PredictError> {
        let image = preprocess::self_test_image(self.polarity);
        let sample = preprocess::preprocess(&image, self.polarity)?;
        let distribution = self.classifier.classify(&sample)?;
        let prediction = distribution.top();

        info!(
            "self test predicted digit {} with confidence {:.4}",
            prediction.label, prediction.confidence
        );
        Ok(SelfTest {
            prediction,
            distribution,
        })
    }
}
