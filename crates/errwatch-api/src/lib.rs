// HTTP client for the error-log store
pub mod error_logs;
pub mod retry;

// Re-export common types
pub use error_logs::{
    ApiError, EndpointKind, ErrorLogBatch, ErrorLogClient, WireErrorLog, WireId,
};
pub use retry::RetryConfig;
