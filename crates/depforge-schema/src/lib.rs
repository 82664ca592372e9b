//! Shared vocabulary for depforge: target platforms, architectures, byte
//! order, and the output kinds a host build system may request.

pub mod arch;
pub mod output;
pub mod platform;

// Re-exports
pub use arch::*;
pub use output::*;
pub use platform::*;

/// Errors produced when parsing or converting target descriptions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The platform name is not one depforge knows about.
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    /// The architecture name is not one depforge knows about.
    #[error("Unknown architecture: {0}")]
    UnknownArch(String),

    /// The requested output kind string is not recognised.
    #[error("Unknown output kind: {0}")]
    UnknownOutput(String),

    /// The output kind is valid but the module does not support it.
    #[error("Unsupported output kind '{output}' for {module}; expected one of {expected}")]
    UnsupportedOutput {
        /// Module that rejected the output kind.
        module: &'static str,
        /// The rejected output kind.
        output: OutputKind,
        /// Human-readable list of accepted kinds.
        expected: &'static str,
    },
}
