//! List command implementation

use anyhow::Context;
use colored::*;
use hookgate_core::settings::{ConfigStore, LoadedConfig};
use hookgate_core::{ConfigError, EventKind};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ListedHook {
    event: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    matcher: Option<String>,
    command: String,
    timeout_secs: u64,
    source: String,
}

/// Show the merged hook table
pub fn execute(store: &ConfigStore, event: Option<EventKind>, json: bool) -> anyhow::Result<()> {
    let loaded = store.load();
    let hooks = collect(&loaded, event);

    if json {
        let output = serde_json::to_string_pretty(&hooks).context("Failed to serialize hooks")?;
        println!("{}", output);
        return Ok(());
    }

    println!("{}", "Configured Hooks".bold());
    for source in &loaded.loaded {
        println!("  {} {}", "loaded".green(), source);
    }
    for warning in &loaded.warnings {
        if !matches!(warning, ConfigError::NotFound { .. }) {
            println!("  {} {}", "skipped".yellow(), warning);
        }
    }
    println!();

    if hooks.is_empty() {
        println!("No hooks configured.");
        return Ok(());
    }

    let mut current = None;
    for hook in &hooks {
        if current != Some(hook.event) {
            println!(
                "{} {}",
                hook.event.to_string().cyan().bold(),
                format!("({})", hook.event.description()).dimmed()
            );
            current = Some(hook.event);
        }
        let matcher = hook.matcher.as_deref().unwrap_or("*");
        println!(
            "  {:<20} {}  {}",
            matcher,
            hook.command,
            format!("[{}s, {}]", hook.timeout_secs, hook.source).dimmed()
        );
    }
    println!();
    println!("Total hooks: {}", hooks.len());
    Ok(())
}

fn collect(loaded: &LoadedConfig, only: Option<EventKind>) -> Vec<ListedHook> {
    let mut hooks = Vec::new();
    for event in loaded.table.events() {
        if only.is_some_and(|kind| kind != event) {
            continue;
        }
        for entry in loaded.table.entries(event) {
            for command in &entry.commands {
                hooks.push(ListedHook {
                    event,
                    matcher: entry.pattern().map(str::to_string),
                    command: command.command.clone(),
                    timeout_secs: command.timeout_secs,
                    source: command.source.to_string(),
                });
            }
        }
    }
    hooks
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookgate_core::settings::{ConfigSource, SettingsSource};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_filters_by_event() {
        let dir = TempDir::new().unwrap();
        let settings_dir = dir.path().join(".hookgate");
        fs::create_dir_all(&settings_dir).unwrap();
        fs::write(
            settings_dir.join("settings.json"),
            r#"{"hooks": {
                "PreAction": [{"matcher": "Write", "hooks": [{"type": "command", "command": "/bin/true", "timeout": 5}]}],
                "PromptSubmit": [{"hooks": [{"type": "command", "command": "/bin/date"}]}]
            }}"#,
        )
        .unwrap();

        let store = ConfigStore::new(vec![ConfigSource::new(
            SettingsSource::Project,
            settings_dir.join("settings.json"),
            dir.path(),
        )]);
        let loaded = store.load();

        let all = collect(&loaded, None);
        assert_eq!(all.len(), 2);

        let pre = collect(&loaded, Some(EventKind::PreAction));
        assert_eq!(pre.len(), 1);
        assert_eq!(pre[0].matcher.as_deref(), Some("Write"));
        assert_eq!(pre[0].command, "/bin/true");
        assert_eq!(pre[0].timeout_secs, 5);
        assert_eq!(pre[0].source, "project");

        let prompt = collect(&loaded, Some(EventKind::PromptSubmit));
        assert!(prompt[0].matcher.is_none());
    }
}
