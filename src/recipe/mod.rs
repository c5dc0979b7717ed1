pub mod locator;
pub mod store;

pub use locator::{locate, LocatedRecipe};
pub use store::{load, parse};

use std::fmt;

/// A named stage of a build, always run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    BeforeScript,
    Script,
    AfterScript,
}

impl Phase {
    /// Execution order, independent of key order in the recipe file.
    pub const ALL: [Phase; 3] = [Phase::BeforeScript, Phase::Script, Phase::AfterScript];

    /// Key used in the recipe file
    pub fn key(self) -> &'static str {
        match self {
            Phase::BeforeScript => "before_script",
            Phase::Script => "script",
            Phase::AfterScript => "after_script",
        }
    }

    /// Human readable section title shown in the build log
    pub fn display_name(self) -> &'static str {
        match self {
            Phase::BeforeScript => "Preparing Build Environment",
            Phase::Script => "Build",
            Phase::AfterScript => "Cleanup",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Parsed build recipe: ordered shell commands per phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipe {
    before_script: Vec<String>,
    script: Vec<String>,
    after_script: Vec<String>,
}

impl Recipe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_phase<I, S>(mut self, phase: Phase, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.slot_mut(phase) = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn commands(&self, phase: Phase) -> &[String] {
        match phase {
            Phase::BeforeScript => &self.before_script,
            Phase::Script => &self.script,
            Phase::AfterScript => &self.after_script,
        }
    }

    /// A recipe without build commands is valid and does nothing.
    pub fn has_build_steps(&self) -> bool {
        !self.script.is_empty()
    }

    fn slot_mut(&mut self, phase: Phase) -> &mut Vec<String> {
        match phase {
            Phase::BeforeScript => &mut self.before_script,
            Phase::Script => &mut self.script,
            Phase::AfterScript => &mut self.after_script,
        }
    }
}
