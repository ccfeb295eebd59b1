//! Settings file location discovery
//!
//! - User level: ~/.config/hookgate/settings.json
//! - Project level: .hookgate/settings.json
//! - Local level: .hookgate/settings.local.json (uncommitted)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const PROJECT_DIR: &str = ".hookgate";

/// Where a settings file (and therefore a hook command) came from
///
/// Ordered from most general to most specific; this is also the merge order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SettingsSource {
    /// User-level settings (~/.config/hookgate/)
    User = 1,
    /// Project-level settings (.hookgate/)
    Project = 2,
    /// Local-level settings (.hookgate/*.local.json)
    Local = 3,
    /// Added programmatically at runtime
    #[default]
    Runtime = 4,
}

impl SettingsSource {
    /// Merge rank; lower ranks are merged first
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsSource::User => write!(f, "user"),
            SettingsSource::Project => write!(f, "project"),
            SettingsSource::Local => write!(f, "local"),
            SettingsSource::Runtime => write!(f, "runtime"),
        }
    }
}

/// One settings file to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub kind: SettingsSource,
    pub path: PathBuf,
    /// Directory that relative command paths resolve against
    pub base_dir: PathBuf,
}

impl ConfigSource {
    pub fn new(kind: SettingsSource, path: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            base_dir: base_dir.into(),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} settings ({})", self.kind, self.path.display())
    }
}

/// Settings file locations
#[derive(Debug, Clone)]
pub struct SettingsLocations {
    /// User-level settings (~/.config/hookgate/settings.json)
    pub user: PathBuf,

    /// User home, the base for user-level command paths
    pub home: PathBuf,

    /// Project-level settings (.hookgate/settings.json)
    pub project: Option<PathBuf>,

    /// Local-level settings (.hookgate/settings.local.json)
    pub local: Option<PathBuf>,

    /// Project root directory
    pub project_root: Option<PathBuf>,
}

impl SettingsLocations {
    /// Discover settings locations from the current directory
    pub fn discover() -> Self {
        Self::discover_from(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Discover settings locations from a specific directory
    ///
    /// Paths are returned whether or not the files exist; missing files are skipped
    /// at load time.
    pub fn discover_from(start_dir: impl AsRef<Path>) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let user = Self::user_settings_path(&home);
        let project_root = Self::find_project_root(&start_dir);

        let (project, local) = match &project_root {
            Some(root) => {
                let dir = root.join(PROJECT_DIR);
                (
                    Some(dir.join("settings.json")),
                    Some(dir.join("settings.local.json")),
                )
            }
            None => (None, None),
        };

        Self {
            user,
            home,
            project,
            local,
            project_root,
        }
    }

    /// Get the user settings path under `home`
    pub fn user_settings_path(home: &Path) -> PathBuf {
        home.join(".config").join("hookgate").join("settings.json")
    }

    /// Sources in canonical merge order: user, project, local
    pub fn sources(&self) -> Vec<ConfigSource> {
        let mut sources = vec![ConfigSource::new(
            SettingsSource::User,
            &self.user,
            &self.home,
        )];
        if let Some(root) = &self.project_root {
            if let Some(project) = &self.project {
                sources.push(ConfigSource::new(SettingsSource::Project, project, root));
            }
            if let Some(local) = &self.local {
                sources.push(ConfigSource::new(SettingsSource::Local, local, root));
            }
        }
        sources
    }

    /// Find the project root by looking for .hookgate directory or .git
    fn find_project_root(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
        let start = start_dir.as_ref().to_path_buf();
        let mut current = if start.is_absolute() {
            start
        } else {
            std::env::current_dir()
                .ok()?
                .join(start)
                .canonicalize()
                .ok()?
        };

        loop {
            if current.join(PROJECT_DIR).is_dir() || current.join(".git").exists() {
                return Some(current);
            }
            if !current.pop() {
                return None;
            }
        }
    }
}

impl Default for SettingsLocations {
    fn default() -> Self {
        Self::discover()
    }
}
