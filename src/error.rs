//! Build helper error types and exit-code mapping

use std::path::PathBuf;

/// Process exit code for usage and configuration lookup errors
pub const EXIT_USAGE: i32 = 1;
/// Process exit code for failures while initializing a build
pub const EXIT_INIT: i32 = 2;
/// Process exit code for a build interrupted by Ctrl-C or timeout
pub const EXIT_CANCELLED: i32 = 130;

/// Main error type for build helper operations
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// None of the recognized recipe files exists below the directory
    #[error("Could not find a build recipe (lipkg/build.yml, build.yml or .travis.yml) in {}", dir.display())]
    ConfigurationNotFound { dir: PathBuf },
    /// Recipe file exists but is not a mapping of command lists
    #[error("Invalid build recipe {}: {reason}", path.display())]
    ConfigurationParseError { path: PathBuf, reason: String },
    /// Sandboxing was requested without naming a sandbox
    #[error("You need to specify a chroot (use --chroot <NAME> or --no-chroot)")]
    SandboxConfigurationError,
    /// Build script exited with a non-zero status
    #[error("Build command failed with non-zero exit status {code}")]
    ExecutionError { code: i32 },
    /// Build was interrupted before the script finished
    #[error("Build cancelled")]
    Cancelled,
    /// Filesystem or process I/O failed
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Maps an error to the exit code the process terminates with.
///
/// A failed build passes the script's own status through untouched.
pub fn exit_code(err: &BuildError) -> i32 {
    match err {
        BuildError::ConfigurationNotFound { .. } => EXIT_USAGE,
        BuildError::SandboxConfigurationError => EXIT_USAGE,
        BuildError::ConfigurationParseError { .. } => EXIT_INIT,
        BuildError::ExecutionError { code } => *code,
        BuildError::Cancelled => EXIT_CANCELLED,
        BuildError::Io { .. } => EXIT_INIT,
    }
}

pub type Result<T, E = BuildError> = std::result::Result<T, E>;
