pub mod classifier;
pub mod error;
pub mod metrics;
pub mod model;
pub mod preprocess;

pub use classifier::Classifier;
pub use error::ClassifyError;
pub use self::metrics::{get_metrics, init_metrics};
pub use model::{ImageModel, OnnxModel};
pub use preprocess::preprocess_image;
