//! User preferences.
//!
//! # Storage layout
//!
//! ```text
//! ~/.devpush/
//!   preferences.yaml   (mode 0600, written atomically)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DevfileError;

/// Image whose contents seed the shared supervisor volume.
pub const DEFAULT_BOOTSTRAP_IMAGE: &str = "quay.io/devpush/devpush-init-image:1.1.2";

/// Environment variable overriding the bootstrap image.
pub const BOOTSTRAP_IMAGE_ENV: &str = "DEVPUSH_BOOTSTRAPPER_IMAGE";

/// Shell used to wrap exec command lines.
pub const DEFAULT_SHELL: &str = "/bin/sh";

const PREFERENCES_FILE: &str = "preferences.yaml";

/// Tunables read once per push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_image: Option<String>,
    pub shell: String,
    pub log_filter: String,
    /// Emit JSON execution events instead of tracing lines.
    pub machine_output: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            bootstrap_image: None,
            shell: DEFAULT_SHELL.to_string(),
            log_filter: "info".to_string(),
            machine_output: false,
        }
    }
}

impl Preferences {
    /// Bootstrap image: env var, then preferences, then the built-in default.
    pub fn bootstrap_image(&self) -> String {
        resolve_bootstrap_image(std::env::var(BOOTSTRAP_IMAGE_ENV).ok(), self)
    }
}

fn resolve_bootstrap_image(from_env: Option<String>, prefs: &Preferences) -> String {
    from_env
        .filter(|v| !v.trim().is_empty())
        .or_else(|| prefs.bootstrap_image.clone())
        .unwrap_or_else(|| DEFAULT_BOOTSTRAP_IMAGE.to_string())
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.devpush/preferences.yaml`: pure, no I/O.
pub fn preferences_path_at(home: &Path) -> PathBuf {
    home.join(".devpush").join(PREFERENCES_FILE)
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load preferences; a missing file yields [`Preferences::default`].
pub fn load_preferences_at(home: &Path) -> Result<Preferences, DevfileError> {
    let path = preferences_path_at(home);
    if !path.exists() {
        return Ok(Preferences::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| DevfileError::Parse { path, source: e })
}

/// `load_preferences_at` convenience wrapper.
pub fn load_preferences() -> Result<Preferences, DevfileError> {
    load_preferences_at(&home()?)
}

/// Atomically save preferences.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_preferences_at(home: &Path, prefs: &Preferences) -> Result<(), DevfileError> {
    let path = preferences_path_at(home);
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp_path = path.with_file_name(format!("{PREFERENCES_FILE}.tmp"));

    let yaml = serde_yaml::to_string(prefs)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_preferences_at` convenience wrapper.
pub fn save_preferences(prefs: &Preferences) -> Result<(), DevfileError> {
    save_preferences_at(&home()?, prefs)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, DevfileError> {
    dirs::home_dir().ok_or(DevfileError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), DevfileError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), DevfileError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), DevfileError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), DevfileError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
