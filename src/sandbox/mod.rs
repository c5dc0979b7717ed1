use crate::config::{BuildConfig, BuildContext};
use std::fmt;
use std::path::Path;

pub mod process;

pub use process::{ChildProcess, ProcessLauncher, TokioLauncher};

/// A fully resolved command line plus the environment it runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Where the build script runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sandbox {
    /// Straight under the host shell
    Direct { shell: String },
    /// Inside a named chroot, entered through an external tool
    Chroot {
        tool: String,
        name: String,
        shell: String,
    },
}

impl Sandbox {
    pub fn for_context(ctx: &BuildContext, config: &BuildConfig) -> Self {
        let shell = config.shell().to_string();
        match ctx.sandbox() {
            Some(name) => Sandbox::Chroot {
                tool: config.sandbox_tool.clone(),
                name: name.to_string(),
                shell,
            },
            None => Sandbox::Direct { shell },
        }
    }

    /// Command that runs `script` here: `<shell> <script>` directly or
    /// `<tool> -c <name> -- <shell> <script>` in a chroot.
    pub fn launch_spec(&self, script: &Path, env: &[(String, String)]) -> LaunchSpec {
        let script = script.to_string_lossy().into_owned();
        let (program, args) = match self {
            Sandbox::Direct { shell } => (shell.clone(), vec![script]),
            Sandbox::Chroot { tool, name, shell } => (
                tool.clone(),
                vec![
                    "-c".to_string(),
                    name.clone(),
                    "--".to_string(),
                    shell.clone(),
                    script,
                ],
            ),
        };
        LaunchSpec {
            program,
            args,
            env: env.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_direct_launch() {
        let ctx = BuildContext::new("/src", None, false).unwrap();
        let sandbox = Sandbox::for_context(&ctx, &BuildConfig::default());
        let spec = sandbox.launch_spec(&PathBuf::from("/tmp/x_lbs.sh"), &[]);
        assert_eq!(spec.program, "bash");
        assert_eq!(spec.args, vec!["/tmp/x_lbs.sh"]);
    }

    #[test]
    fn test_chroot_launch() {
        let ctx = BuildContext::new("/src", Some("sid".to_string()), true).unwrap();
        let config = BuildConfig::default();
        let sandbox = Sandbox::for_context(&ctx, &config);
        let spec = sandbox.launch_spec(&PathBuf::from("/tmp/x_lbs.sh"), &config.child_env);
        assert_eq!(spec.to_string(), "schroot -c sid -- bash /tmp/x_lbs.sh");
        assert!(spec.env.contains(&("LANG".to_string(), "C".to_string())));
    }
}
