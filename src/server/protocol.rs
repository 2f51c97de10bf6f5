use crate::classifier::Prediction;
use crate::service::SelfTest;
use serde::{Deserialize, Serialize};

/// Body of a urlencoded `/predict` request
#[derive(Deserialize)]
pub struct DataUriForm {
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: u8,
    pub confidence: f32,
}

impl From<Prediction> for PredictResponse {
    fn from(p: Prediction) -> Self {
        PredictResponse {
            prediction: p.label,
            confidence: p.confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SelfTestResponse {
    pub test_prediction: u8,
    pub test_confidence: f32,
    pub all_predictions: Vec<f32>,
}

impl From<SelfTest> for SelfTestResponse {
    fn from(t: SelfTest) -> Self {
        SelfTestResponse {
            test_prediction: t.prediction.label,
            test_confidence: t.prediction.confidence,
            all_predictions: t.distribution.into_inner(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
