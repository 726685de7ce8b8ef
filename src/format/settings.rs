//! Settings replay.
//!
//! Projects carry a list of `{module, function, value}` triples that restore
//! global toggles contributed by independent parts of the viewer. Each triple
//! is resolved through a [`SettingsRegistry`] populated at startup: a setter
//! capability is invoked with the value, a plain capability is overwritten.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use tmap_viewer::lenient::is_truthy;

/// Identifier of one setting: the owning module and the setting name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SettingKey {
    pub module: String,
    pub function: String,
}

impl SettingKey {
    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.function)
    }
}

/// A saved setting as it appears in a project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingEntry {
    pub module: String,
    pub function: String,
    #[serde(default)]
    pub value: Value,
}

impl SettingEntry {
    pub fn new(
        module: impl Into<String>,
        function: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> SettingKey {
        SettingKey::new(&self.module, &self.function)
    }

    pub fn is(&self, module: &str, function: &str) -> bool {
        self.module == module && self.function == function
    }
}

/// A user-facing boolean toggle offered in the project settings window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingDescriptor {
    pub module: &'static str,
    pub function: &'static str,
    pub description: &'static str,
}

/// Toggles offered by default.
pub const DEFAULT_TOGGLES: [SettingDescriptor; 4] = [
    SettingDescriptor {
        module: "dataUtils",
        function: "_autoLoadCSV",
        description: "Automatically load csv with default headers",
    },
    SettingDescriptor {
        module: "markerUtils",
        function: "_startMarkersOn",
        description: "Load with all markers visible",
    },
    SettingDescriptor {
        module: "overlayUtils",
        function: "_linkMarkersToChannels",
        description: "Link markers to channels in slider",
    },
    SettingDescriptor {
        module: "projectUtils",
        function: "_hideCSVImport",
        description: "Hide CSV file input on project load",
    },
];

type Setter<S> = Box<dyn Fn(&mut S, &Value)>;

/// What a registered setting resolves to.
enum Capability<S> {
    /// Invoked with the saved value
    Setter(Setter<S>),
    /// Overwritten with the saved value
    Value(Value),
}

impl<S> fmt::Debug for Capability<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Setter(_) => f.write_str("Setter(..)"),
            Capability::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// Result of replaying one setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// A setter was called
    Invoked,
    /// A plain value was assigned (or created)
    Assigned,
    /// The module is unknown; nothing happened
    Skipped,
}

/// Counts of a replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub invoked: usize,
    pub assigned: usize,
    pub skipped: usize,
}

impl ReplaySummary {
    fn record(&mut self, outcome: ReplayOutcome) {
        match outcome {
            ReplayOutcome::Invoked => self.invoked += 1,
            ReplayOutcome::Assigned => self.assigned += 1,
            ReplayOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.invoked + self.assigned + self.skipped
    }
}

/// Registry of settings capabilities, grouped by module.
///
/// `S` is the state setters act on.
pub struct SettingsRegistry<S> {
    modules: BTreeMap<String, BTreeMap<String, Capability<S>>>,
}

impl<S> SettingsRegistry<S> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// Make a module known without registering anything in it.
    pub fn register_module(&mut self, module: impl Into<String>) {
        self.modules.entry(module.into()).or_default();
    }

    /// Register a plain value with its default.
    pub fn register_value(
        &mut self,
        module: impl Into<String>,
        function: impl Into<String>,
        default: impl Into<Value>,
    ) {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(function.into(), Capability::Value(default.into()));
    }

    /// Register a setter.
    pub fn register_setter<F>(
        &mut self,
        module: impl Into<String>,
        function: impl Into<String>,
        setter: F,
    ) where
        F: Fn(&mut S, &Value) + 'static,
    {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(function.into(), Capability::Setter(Box::new(setter)));
    }

    fn capability(&self, module: &str, function: &str) -> Option<&Capability<S>> {
        self.modules.get(module)?.get(function)
    }

    /// Current plain value of a setting.
    pub fn value(&self, module: &str, function: &str) -> Option<&Value> {
        match self.capability(module, function)? {
            Capability::Value(v) => Some(v),
            Capability::Setter(_) => None,
        }
    }

    /// Truthiness of a plain value; unknown settings are false.
    pub fn flag(&self, module: &str, function: &str) -> bool {
        self.value(module, function).is_some_and(is_truthy)
    }

    /// Replay one saved setting against `target`.
    pub fn apply(&mut self, target: &mut S, entry: &SettingEntry) -> ReplayOutcome {
        let Some(module) = self.modules.get_mut(&entry.module) else {
            log::debug!("Skipping setting {}: unknown module", entry.key());
            return ReplayOutcome::Skipped;
        };

        match module.get_mut(&entry.function) {
            Some(Capability::Setter(setter)) => {
                log::trace!("Invoking {} with {}", entry.key(), entry.value);
                (**setter)(target, &entry.value);
                ReplayOutcome::Invoked
            }
            Some(Capability::Value(current)) => {
                log::trace!("Assigning {} = {}", entry.key(), entry.value);
                *current = entry.value.clone();
                ReplayOutcome::Assigned
            }
            None => {
                log::trace!("Creating {} = {}", entry.key(), entry.value);
                module.insert(
                    entry.function.clone(),
                    Capability::Value(entry.value.clone()),
                );
                ReplayOutcome::Assigned
            }
        }
    }

    /// Replay a list of saved settings in order.
    pub fn apply_all(&mut self, target: &mut S, entries: &[SettingEntry]) -> ReplaySummary {
        let mut summary = ReplaySummary::default();
        for entry in entries {
            summary.record(self.apply(target, entry));
        }
        log::debug!(
            "Replayed {} settings ({} invoked, {} assigned, {} skipped)",
            summary.total(),
            summary.invoked,
            summary.assigned,
            summary.skipped
        );
        summary
    }
}

impl<S> Default for SettingsRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for SettingsRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.modules.iter()).finish()
    }
}
