//! Multi-level hook settings
//!
//! Hook configuration is read from up to three JSON files, in this order:
//!
//! 1. **User settings** - `~/.config/hookgate/settings.json`
//! 2. **Project settings** - `.hookgate/settings.json` (committed)
//! 3. **Local settings** - `.hookgate/settings.local.json` (uncommitted)
//!
//! Hook entries from all readable files are concatenated per event in that order;
//! a later file never overrides or removes an earlier file's hooks. Only the
//! engine-wide `hook_settings` values are overridden key by key.
//!
//! Files may contain `//` and `/* */` comments. A missing, malformed or invalid
//! file is skipped with a warning and never stops the others from loading.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use hookgate_core::settings::ConfigStore;
//!
//! let loaded = ConfigStore::discover().load();
//! for warning in &loaded.warnings {
//!     eprintln!("skipped: {}", warning);
//! }
//! let dispatcher = loaded.into_dispatcher();
//! ```

pub mod loader;
pub mod locations;
pub mod types;
pub mod validation;

pub use loader::{strip_json_comments, ConfigStore, LoadedConfig};
pub use locations::{ConfigSource, SettingsLocations, SettingsSource};
pub use types::{HookDefinition, HookGroup, HookSettings, HookSettingsPatch, SettingsFile};
pub use validation::{validate, SettingsValidationResult};
