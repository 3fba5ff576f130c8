// Public modules
pub mod cache;
pub mod credentials;
pub mod envelope;
pub mod error;
pub mod git;
pub mod invoker;
pub mod lock;
pub mod pipeline;
pub mod runner;
pub mod wskprops;

// Internal modules - not part of public API
pub(crate) mod paths;

// Public modules for CLI access
pub mod defaults;

// Re-export common types for convenience
pub use envelope::Envelope;
pub use error::{Error, ErrorCode, Result};
pub use pipeline::{Pipeline, PipelineReport, Stage};
