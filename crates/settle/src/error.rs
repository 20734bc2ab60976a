//! Error types for controller construction

use thiserror::Error;

/// Errors raised while building a controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The default timer driver needs an ambient Tokio runtime and none
    /// was found. Either build inside a runtime or inject a driver
    /// explicitly.
    #[error("no tokio runtime available for the default timer driver")]
    NoRuntime,
}
