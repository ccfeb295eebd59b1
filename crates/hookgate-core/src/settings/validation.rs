//! Settings validation
//!
//! Errors make the whole source unusable (`SchemaInvalid`); warnings are reported
//! but the source is still loaded.

use crate::hooks::{EventKind, PatternMatcher};

use super::types::{HookSettingsPatch, SettingsFile};

/// Result of validating one settings file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl SettingsValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// All errors joined into one message
    pub fn error_message(&self) -> String {
        self.errors.join("; ")
    }
}

/// Validate a parsed settings file
pub fn validate(file: &SettingsFile) -> SettingsValidationResult {
    let mut result = SettingsValidationResult::default();

    for (event_name, groups) in &file.hooks {
        let event = match event_name.parse::<EventKind>() {
            Ok(event) => event,
            Err(e) => {
                result.errors.push(e);
                continue;
            }
        };

        for (group_index, group) in groups.iter().enumerate() {
            let location = format!("hooks.{}[{}]", event_name, group_index);

            if let Some(pattern) = group.matcher.as_deref().filter(|p| !p.is_empty()) {
                if let Some(err) = PatternMatcher::compile(Some(pattern)).error() {
                    result.warnings.push(format!("{}: {}", location, err));
                }
                if !event.has_subject() && pattern != "*" {
                    result.warnings.push(format!(
                        "{}: {} events have no subject, matcher '{}' never fires",
                        location, event, pattern
                    ));
                }
            }

            if group.hooks.is_empty() {
                result
                    .warnings
                    .push(format!("{}: group has no hooks", location));
            }

            for (hook_index, hook) in group.hooks.iter().enumerate() {
                let location = format!("{}.hooks[{}]", location, hook_index);
                if hook.hook_type != "command" {
                    result.errors.push(format!(
                        "{}: unsupported hook type '{}' (expected 'command')",
                        location, hook.hook_type
                    ));
                }
                if hook.command.trim().is_empty() {
                    result
                        .errors
                        .push(format!("{}: command must not be empty", location));
                } else if let Err(e) = shell_words::split(&hook.command) {
                    result
                        .errors
                        .push(format!("{}: cannot parse command: {}", location, e));
                }
                if let Some(timeout) = hook.timeout {
                    if timeout <= 0 {
                        result.errors.push(format!(
                            "{}: timeout must be a positive number of seconds",
                            location
                        ));
                    }
                }
            }
        }
    }

    if let Some(settings) = &file.hook_settings {
        validate_hook_settings(settings, &mut result);
    }

    result
}

fn validate_hook_settings(settings: &HookSettingsPatch, result: &mut SettingsValidationResult) {
    let fields = [
        ("default_timeout", settings.default_timeout),
        ("max_concurrent_hooks", settings.max_concurrent_hooks),
        ("max_output_bytes", settings.max_output_bytes),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            if value <= 0 {
                result
                    .errors
                    .push(format!("hook_settings.{} must be positive, got {}", name, value));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SettingsFile {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_valid_file() {
        let file = parse(
            r#"{"hooks": {"PreAction": [{"matcher": "Write", "hooks": [{"type": "command", "command": "guard"}]}]}}"#,
        );
        let result = validate(&file);
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_unknown_event_is_error() {
        let file = parse(r#"{"hooks": {"PreToolUse": []}}"#);
        let result = validate(&file);
        assert!(!result.is_valid());
        assert!(result.error_message().contains("PreToolUse"));
    }

    #[test]
    fn test_hook_definition_errors() {
        let file = parse(
            r#"{"hooks": {"PostAction": [{"hooks": [
                {"type": "python", "command": "x"},
                {"type": "command", "command": "  "},
                {"type": "command", "command": "ok", "timeout": 0}
            ]}]}}"#,
        );
        let result = validate(&file);
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors[0].contains("unsupported hook type 'python'"));
        assert!(result.errors[1].contains("hooks.PostAction[0].hooks[1]"));
        assert!(result.errors[2].contains("timeout"));
    }

    #[test]
    fn test_pattern_warnings() {
        let file = parse(
            r#"{"hooks": {
                "PreAction": [{"matcher": "[bad", "hooks": [{"type": "command", "command": "x"}]}],
                "PromptSubmit": [{"matcher": "Write", "hooks": [{"type": "command", "command": "x"}]}]
            }}"#,
        );
        let result = validate(&file);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_hook_settings_must_be_positive() {
        let file = parse(r#"{"hook_settings": {"default_timeout": 0, "max_concurrent_hooks": -1}}"#);
        let result = validate(&file);
        assert_eq!(result.errors.len(), 2);
    }
}
