//! Check command implementation

use colored::*;
use hookgate_core::settings::{validate, ConfigSource, ConfigStore};
use hookgate_core::ConfigError;
use std::process::ExitCode;

/// Result of checking one settings source
#[derive(Debug)]
enum SourceStatus {
    Missing,
    Valid { hooks: usize, warnings: Vec<String> },
    Invalid(ConfigError),
}

/// Validate every settings source; fails if any existing source is unusable
pub fn execute(store: &ConfigStore) -> anyhow::Result<ExitCode> {
    println!("{}", "Settings Check".bold());

    let mut invalid = 0;
    for source in store.sources() {
        match check_source(source) {
            SourceStatus::Missing => {
                println!("  {} {}", "-".dimmed(), format!("{} (not present)", source).dimmed());
            }
            SourceStatus::Valid { hooks, warnings } => {
                println!("  {} {} - {} hook(s)", "✓".green(), source, hooks);
                for warning in warnings {
                    println!("      {} {}", "warning:".yellow(), warning);
                }
            }
            SourceStatus::Invalid(err) => {
                invalid += 1;
                println!("  {} {}", "✗".red(), source);
                println!("      {} [{}] {}", "error:".red(), err.kind(), err);
            }
        }
    }

    println!();
    if invalid == 0 {
        println!("{}", "All settings sources are usable.".green());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{}",
            format!("{} settings source(s) will be skipped.", invalid).red()
        );
        Ok(ExitCode::FAILURE)
    }
}

fn check_source(source: &ConfigSource) -> SourceStatus {
    match ConfigStore::load_source(source) {
        Ok(file) => SourceStatus::Valid {
            hooks: file
                .hooks
                .values()
                .flatten()
                .map(|group| group.hooks.len())
                .sum(),
            warnings: validate(&file).warnings,
        },
        Err(ConfigError::NotFound { .. }) => SourceStatus::Missing,
        Err(err) => SourceStatus::Invalid(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookgate_core::settings::SettingsSource;
    use std::fs;
    use tempfile::TempDir;

    fn source(dir: &TempDir, name: &str, content: Option<&str>) -> ConfigSource {
        let path = dir.path().join(name);
        if let Some(content) = content {
            fs::write(&path, content).unwrap();
        }
        ConfigSource::new(SettingsSource::Project, path, dir.path())
    }

    #[test]
    fn test_check_source_statuses() {
        let dir = TempDir::new().unwrap();

        let missing = source(&dir, "missing.json", None);
        assert!(matches!(check_source(&missing), SourceStatus::Missing));

        let valid = source(
            &dir,
            "valid.json",
            Some(
                r#"{"hooks": {"PromptSubmit": [{"matcher": "x", "hooks": [
                    {"type": "command", "command": "/bin/true"},
                    {"type": "command", "command": "/bin/date"}
                ]}]}}"#,
            ),
        );
        match check_source(&valid) {
            SourceStatus::Valid { hooks, warnings } => {
                assert_eq!(hooks, 2);
                assert_eq!(warnings.len(), 1);
            }
            other => panic!("unexpected status: {:?}", other),
        }

        let broken = source(&dir, "broken.json", Some("{ not json"));
        match check_source(&broken) {
            SourceStatus::Invalid(err) => assert_eq!(err.kind(), "malformed_json"),
            other => panic!("unexpected status: {:?}", other),
        }
    }
}
