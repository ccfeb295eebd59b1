//! Settings file schema
//!
//! The raw types mirror the JSON on disk. They are only used while loading; the
//! rest of the engine sees the validated [`HookConfigTable`](crate::hooks::HookConfigTable).
//!
//! ```json,ignore
//! {
//!   "hooks": {
//!     "PreAction": [
//!       { "matcher": "Write|Edit", "hooks": [ { "type": "command", "command": "./hooks/guard.sh", "timeout": 10 } ] }
//!     ]
//!   },
//!   "hook_settings": { "default_timeout": 30, "max_concurrent_hooks": 4 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::hooks::command_hook::{default_timeout, resolve_token};
use crate::hooks::dispatcher::DispatchOptions;
use crate::hooks::process::{ProcessOptions, DEFAULT_MAX_OUTPUT_BYTES};
use crate::hooks::{EventKind, HookCommand, HookEntry};

use super::locations::ConfigSource;

/// One settings file as written on disk
///
/// Unknown top-level keys are ignored so the file can be shared with other tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    /// Event name to hook groups
    #[serde(default)]
    pub hooks: BTreeMap<String, Vec<HookGroup>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_settings: Option<HookSettingsPatch>,
}

/// Matcher plus the hooks it guards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    pub hooks: Vec<HookDefinition>,
}

/// One hook as written on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookDefinition {
    #[serde(rename = "type")]
    pub hook_type: String,
    #[serde(default)]
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
}

/// Engine settings as written in one file; every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_hooks: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_bytes: Option<i64>,
}

/// Effective engine settings after merging all sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookSettings {
    /// Timeout for commands that do not set their own, in seconds
    pub default_timeout: u64,
    /// Maximum hooks running at once per event; `None` is unbounded
    pub max_concurrent_hooks: Option<usize>,
    /// Per-stream output cap in bytes
    pub max_output_bytes: usize,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            default_timeout: default_timeout(),
            max_concurrent_hooks: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl HookSettings {
    /// Apply a later source's values over these. Values were validated as positive.
    pub fn merge(&mut self, patch: &HookSettingsPatch) {
        if let Some(timeout) = patch.default_timeout {
            self.default_timeout = timeout as u64;
        }
        if let Some(limit) = patch.max_concurrent_hooks {
            self.max_concurrent_hooks = Some(limit as usize);
        }
        if let Some(bytes) = patch.max_output_bytes {
            self.max_output_bytes = bytes as usize;
        }
    }

    /// Dispatcher options implied by these settings
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            max_concurrency: self.max_concurrent_hooks,
            process: ProcessOptions {
                max_output_bytes: self.max_output_bytes,
                ..ProcessOptions::default()
            },
        }
    }
}

impl SettingsFile {
    /// Convert into table entries, resolving paths against `source.base_dir`
    ///
    /// Expects a file that passed validation.
    pub fn to_entries(
        &self,
        source: &ConfigSource,
        default_timeout: u64,
    ) -> Result<Vec<(EventKind, HookEntry)>, String> {
        let mut entries = Vec::new();
        for (event_name, groups) in &self.hooks {
            let event: EventKind = event_name.parse()?;
            for group in groups {
                let commands = group
                    .hooks
                    .iter()
                    .map(|hook| hook.to_command(source, default_timeout))
                    .collect::<Result<Vec<_>, _>>()?;
                entries.push((event, HookEntry::new(group.matcher.as_deref(), commands)));
            }
        }
        Ok(entries)
    }
}

impl HookDefinition {
    fn to_command(&self, source: &ConfigSource, default_timeout: u64) -> Result<HookCommand, String> {
        let timeout = self
            .timeout
            .map(|t| t as u64)
            .unwrap_or(default_timeout);
        let mut command = HookCommand::from_command_line(&self.command, &source.base_dir)?
            .with_timeout(timeout)
            .with_source(source.kind);
        if let Some(dir) = &self.working_directory {
            command = command.with_working_dir(resolve_dir(dir, &source.base_dir));
        }
        Ok(command)
    }
}

fn resolve_dir(dir: &str, base_dir: &Path) -> PathBuf {
    let resolved = PathBuf::from(resolve_token(dir, base_dir, false));
    if resolved.is_relative() {
        base_dir.join(resolved)
    } else {
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsSource;

    fn source() -> ConfigSource {
        ConfigSource::new(SettingsSource::Project, "/proj/.hookgate/settings.json", "/proj")
    }

    #[test]
    fn test_parse_schema() {
        let json = r#"{
            "hooks": {
                "PreAction": [
                    {"matcher": "Write", "hooks": [{"type": "command", "command": "./guard.sh", "timeout": 5}]}
                ]
            },
            "unrelated": {"theme": "dark"}
        }"#;
        let file: SettingsFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.hooks["PreAction"][0].matcher.as_deref(), Some("Write"));
        assert_eq!(file.hooks["PreAction"][0].hooks[0].timeout, Some(5));
        assert!(file.hook_settings.is_none());
    }

    #[test]
    fn test_to_entries_resolves_paths_and_timeouts() {
        let file: SettingsFile = serde_json::from_str(
            r#"{"hooks": {"PostAction": [{"hooks": [
                {"type": "command", "command": "./fmt.sh --check", "working_directory": "sub"},
                {"type": "command", "command": "/bin/lint", "timeout": 9}
            ]}]}}"#,
        )
        .unwrap();
        let entries = file.to_entries(&source(), 30).unwrap();
        assert_eq!(entries.len(), 1);
        let (event, entry) = &entries[0];
        assert_eq!(*event, EventKind::PostAction);
        assert_eq!(entry.pattern(), None);

        let fmt = &entry.commands[0];
        assert_eq!(fmt.program, PathBuf::from("/proj/fmt.sh"));
        assert_eq!(fmt.args, vec!["--check"]);
        assert_eq!(fmt.timeout_secs, 30);
        assert_eq!(fmt.working_dir, Some(PathBuf::from("/proj/sub")));
        assert_eq!(fmt.source, SettingsSource::Project);

        assert_eq!(entry.commands[1].timeout_secs, 9);
    }

    #[test]
    fn test_settings_merge_and_dispatch_options() {
        let mut settings = HookSettings::default();
        assert_eq!(settings.default_timeout, 60);
        settings.merge(&HookSettingsPatch {
            default_timeout: Some(10),
            max_concurrent_hooks: Some(2),
            max_output_bytes: None,
        });
        settings.merge(&HookSettingsPatch {
            default_timeout: Some(20),
            ..Default::default()
        });
        assert_eq!(settings.default_timeout, 20);
        assert_eq!(settings.max_concurrent_hooks, Some(2));

        let options = settings.dispatch_options();
        assert_eq!(options.max_concurrency, Some(2));
        assert_eq!(options.process.max_output_bytes, DEFAULT_MAX_OUTPUT_BYTES);
    }
}
