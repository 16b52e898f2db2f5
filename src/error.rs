use thiserror::Error;

/// Errors surfaced outside the recognition core.
///
/// The pipeline itself never fails; these only cover loading an image and
/// building a reader from inconsistent options.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl ScanError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
