pub mod labels;
pub mod prediction;

pub use labels::LabelSet;
pub use prediction::Prediction;
