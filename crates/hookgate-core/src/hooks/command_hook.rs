//! Command hook definition

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::settings::SettingsSource;

/// Default timeout in seconds for hooks
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub(crate) fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// One external command configured for an event
///
/// Paths are already absolute when the command comes from a settings file; the
/// executor never resolves them again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookCommand {
    /// Command line as written in the settings file
    pub command: String,
    /// Executable to spawn
    pub program: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Settings source the command was loaded from; orders merging only
    #[serde(default)]
    pub source: SettingsSource,
}

impl HookCommand {
    /// Create a command that runs `program` with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        Self {
            command: program.display().to_string(),
            program,
            args: Vec::new(),
            timeout_secs: default_timeout(),
            working_dir: None,
            source: SettingsSource::Runtime,
        }
    }

    /// Parse a shell-style command line, resolving path-like tokens against `base_dir`
    pub fn from_command_line(line: &str, base_dir: &Path) -> Result<Self, String> {
        let words = shell_words::split(line).map_err(|e| format!("cannot parse '{}': {}", line, e))?;
        let (program, args) = words
            .split_first()
            .ok_or_else(|| "command must not be empty".to_string())?;

        Ok(Self {
            command: line.to_string(),
            program: PathBuf::from(resolve_token(program, base_dir, true)),
            args: args
                .iter()
                .map(|arg| resolve_token(arg, base_dir, false))
                .collect(),
            timeout_secs: default_timeout(),
            working_dir: None,
            source: SettingsSource::Runtime,
        })
    }

    /// Set the arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self.command = std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self
    }

    /// Set the timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the settings source
    pub fn with_source(mut self, source: SettingsSource) -> Self {
        self.source = source;
        self
    }

    /// Get the timeout duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Resolve `~` and relative path segments of one command-line token
pub(crate) fn resolve_token(token: &str, base_dir: &Path, is_program: bool) -> String {
    if token.starts_with('~') {
        return shellexpand::tilde(token).into_owned();
    }

    let path = Path::new(token);
    let relative_path = token.starts_with("./") || token.starts_with("../");
    let relative_program = is_program && path.is_relative() && token.contains('/');
    if relative_path || relative_program {
        return base_dir
            .join(path)
            .components()
            .collect::<PathBuf>()
            .display()
            .to_string();
    }

    token.to_string()
}

impl fmt::Display for HookCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_new() {
        let hook = HookCommand::new("/usr/bin/true");
        assert_eq!(hook.program, PathBuf::from("/usr/bin/true"));
        assert!(hook.args.is_empty());
        assert_eq!(hook.timeout_secs, 60);
        assert_eq!(hook.source, SettingsSource::Runtime);
    }

    #[test]
    fn test_command_builder() {
        let hook = HookCommand::new("/bin/sh")
            .with_args(["-c", "exit 0"])
            .with_timeout(5);
        assert_eq!(hook.args, vec!["-c", "exit 0"]);
        assert_eq!(hook.timeout(), Duration::from_secs(5));
        assert_eq!(hook.to_string(), "/bin/sh -c exit 0");
    }

    #[test]
    fn test_from_command_line_resolves_relative_script() {
        let base = Path::new("/project");
        let hook =
            HookCommand::from_command_line("python3 ./hooks/check.py --strict", base).unwrap();
        assert_eq!(hook.program, PathBuf::from("python3"));
        assert_eq!(hook.args, vec!["/project/hooks/check.py", "--strict"]);
        assert_eq!(hook.command, "python3 ./hooks/check.py --strict");
    }

    #[test]
    fn test_from_command_line_resolves_relative_program() {
        let base = Path::new("/project");
        let hook = HookCommand::from_command_line("scripts/guard.sh", base).unwrap();
        assert_eq!(hook.program, PathBuf::from("/project/scripts/guard.sh"));

        let hook = HookCommand::from_command_line("../shared/guard.sh", base).unwrap();
        assert_eq!(hook.program, PathBuf::from("/project/../shared/guard.sh"));
    }

    #[test]
    fn test_from_command_line_expands_tilde() {
        let hook = HookCommand::from_command_line("~/bin/guard.sh", Path::new("/p")).unwrap();
        if dirs::home_dir().is_some() {
            assert!(!hook.program.display().to_string().starts_with('~'));
            assert!(hook.program.ends_with("bin/guard.sh"));
        }
    }

    #[test]
    fn test_from_command_line_keeps_bare_names_and_absolute_paths() {
        let base = Path::new("/project");
        let hook = HookCommand::from_command_line("/opt/guard --mode strict", base).unwrap();
        assert_eq!(hook.program, PathBuf::from("/opt/guard"));
        assert_eq!(hook.args, vec!["--mode", "strict"]);
    }

    #[test]
    fn test_from_command_line_quoting() {
        let hook =
            HookCommand::from_command_line("sh -c 'echo \"hi there\"'", Path::new("/")).unwrap();
        assert_eq!(hook.args, vec!["-c", "echo \"hi there\""]);
    }

    #[test]
    fn test_from_command_line_rejects_empty_and_unbalanced() {
        assert!(HookCommand::from_command_line("   ", Path::new("/")).is_err());
        assert!(HookCommand::from_command_line("sh -c 'oops", Path::new("/")).is_err());
    }

    #[test]
    fn test_command_serialization() {
        let hook = HookCommand::new("/bin/true").with_timeout(3);
        let json = serde_json::to_string(&hook).unwrap();
        let back: HookCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(hook, back);
    }
}
