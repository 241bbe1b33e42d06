// Provider implementations for error stores
pub mod error_log;

pub use error_log::ErrorLogProvider;
