pub mod diagnostics;
pub mod error;
pub mod scan;
pub mod span;

// Re-export commonly used items for convenience
pub use tracing;

pub use span::Span;

// Alias for error types
pub type Error = crate::error::Error;
pub type Result<T> = crate::error::Result<T>;
