//! Model runtime.
//!
//! The handler only needs "tensor in, class scores out", so the runtime sits
//! behind [`ImageModel`]. Production uses [`OnnxModel`]; tests plug in stubs.

use anyhow::Context;
use std::path::Path;
use tract_onnx::prelude::tract_ndarray::{Array4, Axis};
use tract_onnx::prelude::*;

use crate::services::preprocess::INPUT_SIZE;

pub trait ImageModel: Send + Sync {
    /// Score every class for a single `(1, H, W, 3)` example.
    fn predict(&self, input: &Array4<f32>) -> anyhow::Result<Vec<f32>>;
}

/// ONNX model executed with tract.
pub struct OnnxModel {
    plan: TypedRunnableModel<TypedModel>,
}

impl OnnxModel {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let side = INPUT_SIZE as usize;

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to read ONNX model {}", path.display()))?
            .with_input_fact(0, f32::fact([1, side, side, 3]).into())?
            .into_optimized()?
            .into_runnable()
            .with_context(|| format!("failed to prepare ONNX model {}", path.display()))?;

        Ok(Self { plan })
    }
}

impl ImageModel for OnnxModel {
    fn predict(&self, input: &Array4<f32>) -> anyhow::Result<Vec<f32>> {
        let outputs = self.plan.run(tvec!(Tensor::from(input.clone()).into()))?;
        let output = outputs
            .first()
            .context("model produced no outputs")?
            .to_array_view::<f32>()?;

        let scores = if output.ndim() > 1 {
            output.index_axis(Axis(0), 0).iter().copied().collect()
        } else {
            output.iter().copied().collect()
        };

        Ok(scores)
    }
}

/// Index and value of the highest score; ties go to the lowest index.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            Some(_) if score.is_nan() => {}
            _ => best = Some((index, score)),
        }
    }
    best
}
