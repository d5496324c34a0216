use crate::services::preprocess::PreprocessError;
use service_core::error::AppError;
use thiserror::Error;

const MIB: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Model or labels not loaded")]
    ModelNotLoaded,

    #[error("No image file provided")]
    MissingFile,

    #[error("No selected file")]
    EmptyFilename,

    #[error("Invalid file type. Please use PNG, JPG, or JPEG")]
    InvalidFileType,

    #[error("File size exceeds the {} limit", format_limit(.limit))]
    FileTooLarge { limit: usize },

    #[error("Invalid multipart request: {0}")]
    Multipart(String),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),

    #[error("model returned no scores")]
    EmptyScores,

    #[error("class {index} has non-finite score {score}")]
    NonFiniteScore { index: usize, score: f32 },

    #[error("class index {0} has no label")]
    UnknownClass(usize),
}

impl ClassifyError {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ClassifyError::MissingFile
                | ClassifyError::EmptyFilename
                | ClassifyError::InvalidFileType
                | ClassifyError::FileTooLarge { .. }
                | ClassifyError::Multipart(_)
        )
    }
}

fn format_limit(bytes: &usize) -> String {
    let bytes = *bytes;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} byte", bytes)
    }
}

impl From<ClassifyError> for AppError {
    fn from(err: ClassifyError) -> Self {
        match err {
            e @ ClassifyError::ModelNotLoaded => AppError::ServerError(e.to_string()),
            e if e.is_client_error() => AppError::BadRequest(anyhow::anyhow!(e.to_string())),
            e => {
                tracing::error!(error = %e, "Error processing image");
                AppError::ServerError("Failed to process image".to_string())
            }
        }
    }
}
