//! Error types for devpush-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reading a devfile or reading/writing the preferences file.
#[derive(Debug, Error)]
pub enum DevfileError {
    /// Reading the devfile, or touching `~/.devpush/`, failed at the OS level.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Preferences could not be encoded by `save_preferences_at`.
    #[error("unable to encode preferences: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A devfile or preferences document is not valid YAML for its model.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// No home directory to hold the preferences file.
    #[error("cannot locate ~/.devpush: no home directory")]
    HomeNotFound,

    /// The devfile did not exist at the expected path.
    #[error("devfile not found at {path}")]
    DevfileNotFound { path: PathBuf },
}
