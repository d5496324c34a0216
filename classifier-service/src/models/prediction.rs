use serde::Serialize;

/// Top-1 result of a single classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub class_index: usize,
    pub label: String,
    pub confidence: f32,
}
