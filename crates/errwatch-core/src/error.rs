use thiserror::Error;

/// All the ways things can go wrong in errwatch
#[derive(Error, Debug)]
pub enum Error {
    #[error("API request failed: {0}")]
    ApiError(#[from] errwatch_api::ApiError),

    #[error("Error source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::ConfigError("source.limit must be at least 1".into());
        assert_eq!(err.to_string(), "Configuration error: source.limit must be at least 1");

        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::IoError(_)));
        assert_eq!(err.to_string(), "IO error: gone");
    }
}
