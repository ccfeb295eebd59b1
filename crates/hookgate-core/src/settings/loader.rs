//! Hook configuration loader
//!
//! [`ConfigStore`] reads every configured source, skips the ones that cannot be
//! used (recording why), and concatenates the hook entries of the rest per event in
//! source order. A source can add hooks but never remove another source's hooks.

use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::hooks::{DispatchOptions, EventDispatcher, HookConfigTable};

use super::locations::{ConfigSource, SettingsLocations};
use super::types::{HookSettings, SettingsFile};
use super::validation;

/// Outcome of loading all sources. Loading itself never fails.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub table: HookConfigTable,
    pub settings: HookSettings,
    /// Sources that contributed to the table
    pub loaded: Vec<ConfigSource>,
    /// Sources that were skipped, and why
    pub warnings: Vec<ConfigError>,
}

impl LoadedConfig {
    pub fn dispatch_options(&self) -> DispatchOptions {
        self.settings.dispatch_options()
    }

    /// Build a dispatcher over the loaded table
    pub fn into_dispatcher(self) -> EventDispatcher {
        let options = self.dispatch_options();
        EventDispatcher::with_options(self.table, options)
    }
}

/// Loads and merges hook configuration from settings files
#[derive(Debug, Clone)]
pub struct ConfigStore {
    sources: Vec<ConfigSource>,
}

impl ConfigStore {
    /// Use explicit sources. They are merged by source rank, keeping the given
    /// order within a rank.
    pub fn new(sources: Vec<ConfigSource>) -> Self {
        let mut sources = sources;
        sources.sort_by_key(|source| source.kind.rank());
        Self { sources }
    }

    /// Standard locations discovered from the current directory
    pub fn discover() -> Self {
        Self::with_locations(&SettingsLocations::discover())
    }

    /// Standard locations discovered from `dir`
    pub fn from_directory(dir: impl AsRef<Path>) -> Self {
        Self::with_locations(&SettingsLocations::discover_from(dir))
    }

    pub fn with_locations(locations: &SettingsLocations) -> Self {
        Self::new(locations.sources())
    }

    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Load every source and build the table
    pub fn load(&self) -> LoadedConfig {
        let mut warnings = Vec::new();
        let mut parsed = Vec::new();

        for source in &self.sources {
            match Self::load_source(source) {
                Ok(file) => {
                    debug!("Loaded {}", source);
                    parsed.push((source, file));
                }
                Err(err @ ConfigError::NotFound { .. }) => {
                    debug!("Skipping {}: {}", source, err);
                    warnings.push(err);
                }
                Err(err) => {
                    warn!("Skipping {}: {}", source, err);
                    warnings.push(err);
                }
            }
        }

        // Engine settings merge first so default timeouts apply across all sources.
        let mut settings = HookSettings::default();
        for (_, file) in &parsed {
            if let Some(patch) = &file.hook_settings {
                settings.merge(patch);
            }
        }

        let mut builder = HookConfigTable::builder();
        let mut loaded = Vec::new();
        for (source, file) in parsed {
            match file.to_entries(source, settings.default_timeout) {
                Ok(entries) => {
                    for (event, entry) in entries {
                        builder.push(event, entry);
                    }
                    loaded.push(source.clone());
                }
                Err(message) => {
                    let err = ConfigError::SchemaInvalid {
                        path: source.path.clone(),
                        message,
                    };
                    warn!("Skipping {}: {}", source, err);
                    warnings.push(err);
                }
            }
        }

        let table = builder.build();
        info!(
            "Loaded {} hook command(s) from {} of {} settings source(s)",
            table.command_count(),
            loaded.len(),
            self.sources.len()
        );

        LoadedConfig {
            table,
            settings,
            loaded,
            warnings,
        }
    }

    /// Re-read the same sources into a fresh table
    pub fn reload(&self) -> LoadedConfig {
        info!("Reloading hook configuration");
        self.load()
    }

    /// Read, parse and validate one source
    pub fn load_source(source: &ConfigSource) -> Result<SettingsFile, ConfigError> {
        let path = &source.path;
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound { path: path.clone() },
            _ => ConfigError::Io {
                path: path.clone(),
                message: e.to_string(),
            },
        })?;

        let value: serde_json::Value =
            serde_json::from_str(&strip_json_comments(&content)).map_err(|e| {
                ConfigError::MalformedJson {
                    path: path.clone(),
                    message: e.to_string(),
                }
            })?;

        if !value.is_object() {
            return Err(ConfigError::SchemaInvalid {
                path: path.clone(),
                message: "top level must be a JSON object".to_string(),
            });
        }

        let file: SettingsFile =
            serde_json::from_value(value).map_err(|e| ConfigError::SchemaInvalid {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let result = validation::validate(&file);
        for warning in &result.warnings {
            warn!("{}: {}", path.display(), warning);
        }
        if !result.is_valid() {
            return Err(ConfigError::SchemaInvalid {
                path: path.clone(),
                message: result.error_message(),
            });
        }

        Ok(file)
    }
}

/// Strip `//` and `/* */` comments outside of string literals
pub fn strip_json_comments(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        result.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                result.push(c);
            }
            ('/', Some('/')) => {
                while chars.next_if(|&ch| ch != '\n').is_some() {}
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for ch in chars.by_ref() {
                    if previous == '*' && ch == '/' {
                        break;
                    }
                    previous = ch;
                }
            }
            _ => result.push(c),
        }
    }

    result
}
