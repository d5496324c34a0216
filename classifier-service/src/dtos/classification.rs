use crate::models::Prediction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub classification: String,
    pub confidence: f64,
}

impl From<Prediction> for ClassificationResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            classification: prediction.label,
            confidence: f64::from(prediction.confidence),
        }
    }
}
