//! Error types for the lockscreen pipeline.

use thiserror::Error;

/// Errors that can occur while producing a lockscreen.
#[derive(Error, Debug)]
pub enum LockscreenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed fetch error: {0}")]
    Fetch(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Background error: {0}")]
    Background(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LockscreenError {
    /// Whether this error aborts the run.
    ///
    /// Feed errors only cost the events of one calendar, so the run carries on
    /// with whatever the other feeds returned.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, LockscreenError::Fetch(_) | LockscreenError::IcsParse(_))
    }
}

/// Result type alias for lockscreen operations.
pub type LockscreenResult<T> = Result<T, LockscreenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_errors_are_recoverable() {
        assert!(!LockscreenError::Fetch("timeout".into()).is_fatal());
        assert!(!LockscreenError::IcsParse("bad".into()).is_fatal());
    }

    #[test]
    fn test_pipeline_errors_are_fatal() {
        assert!(LockscreenError::Background("empty".into()).is_fatal());
        assert!(LockscreenError::Render("bad colour".into()).is_fatal());
        assert!(LockscreenError::Upload("denied".into()).is_fatal());
        assert!(LockscreenError::Config("missing".into()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = LockscreenError::Upload("S3 bucket 'x' does not exist".into());
        assert_eq!(err.to_string(), "Upload error: S3 bucket 'x' does not exist");
    }
}
