//! Runtime configuration and per-run build context.
//!
//! Settings come from `LIPKBH_*` environment variables and are then
//! overridden by command line flags.

use crate::error::{BuildError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tool used to run the script inside a named chroot.
pub const DEFAULT_SANDBOX_TOOL: &str = "schroot";

/// Locale forced on every build script so tool output is stable.
pub const LOCALE_ENV: [(&str, &str); 2] = [("LANG", "C"), ("LC_ALL", "C")];

/// Which flavour of build script to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptProfile {
    /// bash script exporting `BUILDROOT` and running the cleanup phase
    #[default]
    Full,
    /// POSIX sh script without `BUILDROOT` or cleanup phase
    Legacy,
}

impl ScriptProfile {
    pub fn interpreter(self) -> &'static str {
        match self {
            ScriptProfile::Full => "/bin/bash",
            ScriptProfile::Legacy => "/bin/sh",
        }
    }

    pub fn default_shell(self) -> &'static str {
        match self {
            ScriptProfile::Full => "bash",
            ScriptProfile::Legacy => "sh",
        }
    }

    /// Whether the script exports `BUILDROOT` and runs `after_script`.
    pub fn supports_cleanup(self) -> bool {
        matches!(self, ScriptProfile::Full)
    }
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub sandbox_tool: String,
    /// Explicit shell; `None` uses the profile's default
    pub shell: Option<String>,
    pub profile: ScriptProfile,
    /// Kill the build after this long. Unlimited when unset.
    pub timeout: Option<Duration>,
    /// Extra environment passed to the launched script
    pub child_env: Vec<(String, String)>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            sandbox_tool: DEFAULT_SANDBOX_TOOL.to_string(),
            shell: None,
            profile: ScriptProfile::Full,
            timeout: None,
            child_env: LOCALE_ENV
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl BuildConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(tool) = lookup("LIPKBH_SANDBOX_TOOL").filter(|s| !s.trim().is_empty()) {
            config.sandbox_tool = tool;
        }
        config.shell = lookup("LIPKBH_SHELL").filter(|s| !s.trim().is_empty());

        if lookup("LIPKBH_LEGACY").is_some_and(|v| is_truthy(&v)) {
            config.profile = ScriptProfile::Legacy;
        }

        config.timeout = lookup("LIPKBH_TIMEOUT_SECS").and_then(|s| match s.parse::<u64>() {
            Ok(0) => None,
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(_) => {
                tracing::warn!("Invalid LIPKBH_TIMEOUT_SECS: {}, running without timeout", s);
                None
            }
        });

        config
    }

    /// Override with CLI parameters
    pub fn with_cli_overrides(mut self, legacy: bool, timeout_secs: Option<u64>) -> Self {
        if legacy {
            self.profile = ScriptProfile::Legacy;
        }
        if let Some(secs) = timeout_secs {
            self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        self
    }

    pub fn shell(&self) -> &str {
        self.shell
            .as_deref()
            .unwrap_or_else(|| self.profile.default_shell())
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes")
}

/// Where and how one build runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    work_dir: PathBuf,
    sandbox: Option<String>,
    use_sandbox: bool,
}

impl BuildContext {
    /// Fails when a sandbox is required but none was named.
    pub fn new(work_dir: impl Into<PathBuf>, sandbox: Option<String>, use_sandbox: bool) -> Result<Self> {
        let sandbox = sandbox.filter(|name| !name.trim().is_empty());
        if use_sandbox && sandbox.is_none() {
            return Err(BuildError::SandboxConfigurationError);
        }
        Ok(Self {
            work_dir: work_dir.into(),
            sandbox,
            use_sandbox,
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The sandbox to run in, or `None` for direct execution.
    pub fn sandbox(&self) -> Option<&str> {
        if self.use_sandbox {
            self.sandbox.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BuildConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.sandbox_tool, "schroot");
        assert_eq!(config.shell(), "bash");
        assert_eq!(config.profile, ScriptProfile::Full);
        assert!(config.timeout.is_none());
        assert!(config.child_env.contains(&("LC_ALL".to_string(), "C".to_string())));
    }

    #[test]
    fn test_env_values() {
        let config = BuildConfig::from_lookup(lookup_from(&[
            ("LIPKBH_SANDBOX_TOOL", "/usr/local/bin/schroot"),
            ("LIPKBH_LEGACY", "yes"),
            ("LIPKBH_TIMEOUT_SECS", "90"),
        ]));
        assert_eq!(config.sandbox_tool, "/usr/local/bin/schroot");
        assert_eq!(config.profile, ScriptProfile::Legacy);
        assert_eq!(config.shell(), "sh");
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_invalid_timeout_ignored() {
        let config = BuildConfig::from_lookup(lookup_from(&[("LIPKBH_TIMEOUT_SECS", "soon")]));
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let config = BuildConfig::from_lookup(lookup_from(&[("LIPKBH_TIMEOUT_SECS", "90")]))
            .with_cli_overrides(true, Some(0));
        assert_eq!(config.profile, ScriptProfile::Legacy);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_explicit_shell_wins() {
        let config = BuildConfig::from_lookup(lookup_from(&[("LIPKBH_SHELL", "dash")]))
            .with_cli_overrides(true, None);
        assert_eq!(config.shell(), "dash");
    }

    #[test]
    fn test_context_requires_sandbox_name() {
        let err = BuildContext::new("/src", None, true).unwrap_err();
        assert!(matches!(err, BuildError::SandboxConfigurationError));
        let err = BuildContext::new("/src", Some("  ".to_string()), true).unwrap_err();
        assert!(matches!(err, BuildError::SandboxConfigurationError));
    }

    #[test]
    fn test_context_direct_mode_ignores_name() {
        let ctx = BuildContext::new("/src", Some("sid-amd64".to_string()), false).unwrap();
        assert_eq!(ctx.sandbox(), None);

        let ctx = BuildContext::new("/src", Some("sid-amd64".to_string()), true).unwrap();
        assert_eq!(ctx.sandbox(), Some("sid-amd64"));
        assert_eq!(ctx.work_dir(), Path::new("/src"));
    }
}
