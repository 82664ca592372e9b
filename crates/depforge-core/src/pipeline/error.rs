//! Pipeline failures. All of them abort the run; there is no retry.

use depforge_schema::SchemaError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a pipeline run stopped.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A prerequisite tool's sub-build exited non-zero.
    #[error("Building {tool} failed with exit code {exit_code}: {stderr}")]
    BuildToolFailure {
        /// Tool being built.
        tool: String,
        /// Exit code of the sub-build.
        exit_code: i32,
        /// Captured stderr, verbatim.
        stderr: String,
    },

    /// The sub-build succeeded without producing the tool binary.
    #[error("Sub-build of {tool} succeeded but {} does not exist", path.display())]
    ToolMissing {
        /// Tool that was built.
        tool: String,
        /// Where the binary was expected.
        path: PathBuf,
    },

    /// `icupkg` exited non-zero.
    #[error("Unpacking ICU data failed with exit code {exit_code}: {stderr}")]
    UnpackFailure {
        /// Exit code of `icupkg`.
        exit_code: i32,
        /// Captured stderr, verbatim.
        stderr: String,
    },

    /// `pkgdata` exited non-zero.
    #[error("Packaging ICU data failed with exit code {exit_code}: {stderr}")]
    PackagingFailure {
        /// Exit code of `pkgdata`.
        exit_code: i32,
        /// Captured stderr, verbatim.
        stderr: String,
    },

    /// A tool could not be started at all.
    #[error("Failed to start {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error while preparing or relocating files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request cannot be packaged.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl PipelineError {
    /// Captured stderr of the failing tool, when the failure came from one.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::BuildToolFailure { stderr, .. }
            | Self::UnpackFailure { stderr, .. }
            | Self::PackagingFailure { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// Exit code of the failing tool, when the failure came from one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::BuildToolFailure { exit_code, .. }
            | Self::UnpackFailure { exit_code, .. }
            | Self::PackagingFailure { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}
