//! Everything that can go wrong while serving a single prediction

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictError {
    /// The request carried no `image` file part or form field
    #[error("No image provided")]
    MissingImage,

    #[error("image payload exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("malformed upload: {0}")]
    Upload(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("cannot decode image: {0}")]
    Image(#[from] image::ImageError),

    /// Classifier failures and anything else unexpected
    #[error(transparent)]
    Inference(#[from] anyhow::Error),
}

impl PredictError {
    /// Whether the failure is the caller's fault rather than a malformed
    /// payload or an internal error
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingImage | Self::TooLarge { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_messages() {
        assert_eq!(PredictError::MissingImage.to_string(), "No image provided");
        assert_eq!(
            PredictError::TooLarge { limit: 10 }.to_string(),
            "image payload exceeds 10 bytes"
        );
        let err: PredictError = anyhow!("forward failed").into();
        assert_eq!(err.to_string(), "forward failed");
    }

    #[test]
    fn test_client_errors() {
        assert!(PredictError::MissingImage.is_client_error());
        assert!(PredictError::TooLarge { limit: 1 }.is_client_error());
        assert!(!PredictError::Upload("eof".into()).is_client_error());
        assert!(!PredictError::Inference(anyhow!("boom")).is_client_error());
    }
}
