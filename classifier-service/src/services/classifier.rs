use crate::config::ModelConfig;
use crate::models::{LabelSet, Prediction};
use crate::services::error::ClassifyError;
use crate::services::model::{argmax, ImageModel, OnnxModel};
use crate::services::preprocess::preprocess_image;
use anyhow::Context;
use std::sync::Arc;

/// A loaded model together with the labels for its outputs.
#[derive(Clone)]
pub struct Classifier {
    model: Arc<dyn ImageModel>,
    labels: LabelSet,
}

impl Classifier {
    pub fn new(model: Arc<dyn ImageModel>, labels: LabelSet) -> anyhow::Result<Self> {
        if labels.is_empty() {
            anyhow::bail!("label set is empty");
        }
        Ok(Self { model, labels })
    }

    /// Load the ONNX model and label file named in `config`.
    pub fn load(config: &ModelConfig) -> anyhow::Result<Self> {
        let labels = LabelSet::load(&config.labels_path)?;
        let model = OnnxModel::load(&config.model_path)?;

        tracing::info!(
            model_path = %config.model_path,
            labels_path = %config.labels_path,
            classes = labels.len(),
            "Loaded classification model"
        );

        Self::new(Arc::new(model), labels).context("cannot serve a model without labels")
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Run the full pipeline on raw upload bytes. CPU bound; call it off the
    /// async executor.
    pub fn classify(&self, image_bytes: &[u8]) -> Result<Prediction, ClassifyError> {
        let input = preprocess_image(image_bytes)?;
        let scores = self
            .model
            .predict(&input)
            .map_err(ClassifyError::Inference)?;

        let (class_index, confidence) = argmax(&scores).ok_or(ClassifyError::EmptyScores)?;
        if !confidence.is_finite() {
            return Err(ClassifyError::NonFiniteScore {
                index: class_index,
                score: confidence,
            });
        }
        if !is_probability(confidence) {
            tracing::warn!(
                class_index,
                score = confidence,
                "Model score outside [0, 1]; is the exported model missing its softmax?"
            );
        }
        let label = self
            .labels
            .display_name(class_index)
            .ok_or(ClassifyError::UnknownClass(class_index))?
            .to_string();

        Ok(Prediction {
            class_index,
            label,
            confidence,
        })
    }
}

fn is_probability(score: f32) -> bool {
    (0.0..=1.0).contains(&score)
}
