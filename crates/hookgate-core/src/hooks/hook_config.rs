//! Hook configuration table
//!
//! [`HookConfigTable`] is the validated, immutable form of all merged settings
//! sources. It is built once and shared read-only by the dispatcher; a reload
//! builds a new table instead of mutating this one.

use std::collections::BTreeMap;
use std::fmt;

use super::command_hook::HookCommand;
use super::events::EventKind;
use super::matcher::PatternMatcher;
use crate::error::{HookgateError, HookgateResult};

/// Matcher pattern plus the commands it guards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEntry {
    matcher: PatternMatcher,
    pub commands: Vec<HookCommand>,
}

impl HookEntry {
    /// Create an entry. An empty pattern is treated as absent.
    pub fn new(pattern: Option<&str>, commands: Vec<HookCommand>) -> Self {
        let pattern = pattern.filter(|p| !p.is_empty());
        Self {
            matcher: PatternMatcher::compile(pattern),
            commands,
        }
    }

    /// Entry that applies to every subject
    pub fn unconditional(commands: Vec<HookCommand>) -> Self {
        Self::new(None, commands)
    }

    /// Entry guarded by `pattern`
    pub fn with_pattern(pattern: &str, commands: Vec<HookCommand>) -> Self {
        Self::new(Some(pattern), commands)
    }

    /// Configured pattern, `None` when the entry is unconditional
    pub fn pattern(&self) -> Option<&str> {
        self.matcher.pattern()
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    /// Check whether this entry applies to `subject`
    pub fn matches(&self, subject: Option<&str>) -> bool {
        self.matcher.matches(subject)
    }
}

impl fmt::Display for HookEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pattern() {
            Some(pattern) => write!(f, "Pattern: {}", pattern)?,
            None => write!(f, "Match all")?,
        }
        write!(f, ", Commands: {}", self.commands.len())
    }
}

/// Immutable mapping from event kind to its ordered hook entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookConfigTable {
    events: BTreeMap<EventKind, Vec<HookEntry>>,
}

impl HookConfigTable {
    /// Table with no hooks
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a table by appending entries in merge order
    pub fn builder() -> HookConfigTableBuilder {
        HookConfigTableBuilder::default()
    }

    /// Build a table from one list per event kind
    ///
    /// Listing the same event kind twice is a programming error and fails.
    pub fn try_from_events<I>(events: I) -> HookgateResult<Self>
    where
        I: IntoIterator<Item = (EventKind, Vec<HookEntry>)>,
    {
        let mut table = BTreeMap::new();
        for (event, entries) in events {
            if table.insert(event, entries).is_some() {
                return Err(HookgateError::invariant(format!(
                    "duplicate event key '{}' in hook table",
                    event
                )));
            }
        }
        Ok(Self { events: table })
    }

    /// Entries for `event`, in merge order
    pub fn entries(&self, event: EventKind) -> &[HookEntry] {
        self.events.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Event kinds that have at least one entry
    pub fn events(&self) -> Vec<EventKind> {
        self.events
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(event, _)| *event)
            .collect()
    }

    /// Commands whose entry matches `subject`, flattened in merge order
    pub fn matching_commands(&self, event: EventKind, subject: Option<&str>) -> Vec<&HookCommand> {
        self.entries(event)
            .iter()
            .filter(|entry| entry.matches(subject))
            .flat_map(|entry| entry.commands.iter())
            .collect()
    }

    /// Total number of configured commands across all events
    pub fn command_count(&self) -> usize {
        self.events
            .values()
            .flat_map(|entries| entries.iter())
            .map(|entry| entry.commands.len())
            .sum()
    }

    /// Check if any event has a command configured
    pub fn is_empty(&self) -> bool {
        self.command_count() == 0
    }
}

/// Accumulates entries per event, concatenating in the order they are added
#[derive(Debug, Default)]
pub struct HookConfigTableBuilder {
    events: BTreeMap<EventKind, Vec<HookEntry>>,
}

impl HookConfigTableBuilder {
    /// Append one entry after all entries already added for `event`
    pub fn push(&mut self, event: EventKind, entry: HookEntry) -> &mut Self {
        self.events.entry(event).or_default().push(entry);
        self
    }

    /// Append an entry, builder style
    pub fn entry(mut self, event: EventKind, entry: HookEntry) -> Self {
        self.push(event, entry);
        self
    }

    /// Rewrite every command, e.g. to fill in a default timeout
    pub fn for_each_command(&mut self, mut f: impl FnMut(&mut HookCommand)) -> &mut Self {
        self.events
            .values_mut()
            .flat_map(|entries| entries.iter_mut())
            .flat_map(|entry| entry.commands.iter_mut())
            .for_each(&mut f);
        self
    }

    pub fn build(self) -> HookConfigTable {
        HookConfigTable {
            events: self.events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(name: &str) -> HookCommand {
        HookCommand::new(format!("/hooks/{}", name))
    }

    #[test]
    fn test_entry_empty_pattern_is_unconditional() {
        let entry = HookEntry::new(Some(""), vec![cmd("a")]);
        assert_eq!(entry.pattern(), None);
        assert!(entry.matches(None));
        assert!(entry.matches(Some("Write")));
    }

    #[test]
    fn test_entry_display() {
        let entry = HookEntry::with_pattern("Write|Edit", vec![cmd("a"), cmd("b")]);
        assert_eq!(entry.to_string(), "Pattern: Write|Edit, Commands: 2");
        let entry = HookEntry::unconditional(vec![]);
        assert_eq!(entry.to_string(), "Match all, Commands: 0");
    }

    #[test]
    fn test_duplicate_event_key_is_invariant_violation() {
        let result = HookConfigTable::try_from_events(vec![
            (EventKind::PreAction, vec![HookEntry::unconditional(vec![cmd("a")])]),
            (EventKind::PreAction, vec![HookEntry::unconditional(vec![cmd("b")])]),
        ]);
        assert!(matches!(result, Err(HookgateError::Invariant(_))));
    }

    #[test]
    fn test_builder_concatenates_in_order() {
        let table = HookConfigTable::builder()
            .entry(EventKind::PreAction, HookEntry::with_pattern("Write", vec![cmd("global")]))
            .entry(EventKind::PreAction, HookEntry::unconditional(vec![cmd("project")]))
            .entry(EventKind::PreAction, HookEntry::with_pattern("Write", vec![cmd("local")]))
            .build();

        let names: Vec<_> = table
            .matching_commands(EventKind::PreAction, Some("Write"))
            .into_iter()
            .map(|c| c.command.clone())
            .collect();
        assert_eq!(names, vec!["/hooks/global", "/hooks/project", "/hooks/local"]);

        let names: Vec<_> = table
            .matching_commands(EventKind::PreAction, Some("Read"))
            .into_iter()
            .map(|c| c.command.clone())
            .collect();
        assert_eq!(names, vec!["/hooks/project"]);
    }

    #[test]
    fn test_introspection() {
        let table = HookConfigTable::try_from_events(vec![
            (EventKind::PromptSubmit, vec![HookEntry::unconditional(vec![cmd("a"), cmd("b")])]),
            (EventKind::PostAction, vec![]),
        ])
        .unwrap();
        assert_eq!(table.events(), vec![EventKind::PromptSubmit]);
        assert_eq!(table.command_count(), 2);
        assert!(!table.is_empty());
        assert!(table.entries(EventKind::PostAction).is_empty());
        assert!(table.entries(EventKind::PreAction).is_empty());
        assert!(HookConfigTable::empty().is_empty());
    }

    #[test]
    fn test_for_each_command() {
        let mut builder = HookConfigTable::builder();
        builder.push(EventKind::PreAction, HookEntry::unconditional(vec![cmd("a")]));
        builder.for_each_command(|c| c.timeout_secs = 7);
        let table = builder.build();
        assert_eq!(table.entries(EventKind::PreAction)[0].commands[0].timeout_secs, 7);
    }
}
