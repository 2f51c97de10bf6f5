//! Code for loading and running a trained TorchScript digit classifier

use crate::classifier::{Classifier, Distribution, Sample};
use crate::shape::{SAMPLE_LEN, SIDE};
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use tch::{no_grad, Device, Kind, Tensor};
use tracing::info;

/// The tensor shape the model's `forward` expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputLayout {
    /// `[1, 784]`, for dense models
    Flat,

    /// `[1, 1, 28, 28]`, for convolutional models
    Image,
}

impl InputLayout {
    fn dims(self) -> Vec<i64> {
        let side = SIDE as i64;
        match self {
            Self::Flat => vec![1, SAMPLE_LEN as i64],
            Self::Image => vec![1, 1, side, side],
        }
    }
}

/// What the last layer of the model produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputActivation {
    /// Raw logits: softmax is applied here
    Softmax,

    /// The model already outputs probabilities
    Identity,
}

/// A TorchScript module loaded on the CPU
#[derive(Debug)]
pub struct TorchClassifier {
    model: tch::CModule,
    layout: InputLayout,
    activation: OutputActivation,
}

impl TorchClassifier {
    pub fn load(
        filename: impl AsRef<Path>,
        layout: InputLayout,
        activation: OutputActivation,
    ) -> Result<Self> {
        let filename = filename.as_ref();
        if !filename.is_file() {
            return Err(anyhow!("model file {} not found", filename.display()));
        }

        let model = tch::CModule::load_on_device(filename, Device::Cpu)?;
        info!(
            "loaded model {} ({layout:?} input, {activation:?} output)",
            filename.display()
        );

        Ok(TorchClassifier {
            model,
            layout,
            activation,
        })
    }
}

impl Classifier for TorchClassifier {
    fn classify(&self, sample: &Sample) -> Result<Distribution> {
        let input = Tensor::from_slice(sample.pixels()).view(self.layout.dims().as_slice());

        let output = no_grad(|| self.model.forward_ts(&[input]))?;
        let output = match self.activation {
            OutputActivation::Softmax => output.softmax(-1, Some(Kind::Float)),
            OutputActivation::Identity => output.to_kind(Kind::Float),
        };

        let probabilities = Vec::<f32>::try_from(&output.view([-1]))?;
        Distribution::new(probabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::{self, Polarity};

    #[test]
    fn test_missing_model() {
        let err = TorchClassifier::load("models/nope.pt", InputLayout::Flat, OutputActivation::Softmax)
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_layout_dims() {
        assert_eq!(InputLayout::Flat.dims(), vec![1, 784]);
        assert_eq!(InputLayout::Image.dims(), vec![1, 1, 28, 28]);
    }

    #[test]
    #[ignore = "needs a trained model at models/mnist.pt"]
    fn test_mnist() {
        let model =
            TorchClassifier::load("models/mnist.pt", InputLayout::Flat, OutputActivation::Softmax)
                .unwrap();
        let image = preprocess::self_test_image(Polarity::LightOnDark);
        let sample = preprocess::preprocess(&image, Polarity::LightOnDark).unwrap();
        let distribution = model.classify(&sample).unwrap();
        let total: f32 = distribution.probabilities().iter().sum();
        assert!((total - 1.0).abs() < 1e-3);
        println!("outputs: {:?}", distribution.top());
    }
}
