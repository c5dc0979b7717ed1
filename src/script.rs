//! Turns a recipe into one linear shell script.
//!
//! The script starts with `set -e`, so the first failing command aborts the
//! remaining phases with that command's exit status. Every command is echoed
//! before it runs so the streamed log shows what failed. stderr is folded
//! into stdout right after the header, so a command's diagnostics always
//! follow its echo line in the log.

use crate::config::{BuildContext, ScriptProfile};
use crate::recipe::{Phase, Recipe};

/// Extra box characters around a section title
const BANNER_PADDING: usize = 14;

/// Generated build script, one shell line per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledScript {
    lines: Vec<String>,
}

impl AssembledScript {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Newline-terminated script text
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptAssembler {
    profile: ScriptProfile,
}

impl ScriptAssembler {
    pub fn new(profile: ScriptProfile) -> Self {
        Self { profile }
    }

    /// Returns `None` when the recipe has no build commands; such a run
    /// succeeds without launching anything.
    pub fn assemble(&self, ctx: &BuildContext, recipe: &Recipe) -> Option<AssembledScript> {
        if !recipe.has_build_steps() {
            return None;
        }

        let work_dir = shell_quote(&ctx.work_dir().to_string_lossy());
        let mut lines = vec![
            format!("#!{}", self.profile.interpreter()),
            "set -e".to_string(),
            "exec 2>&1".to_string(),
            String::new(),
            format!("cd {}", work_dir),
        ];
        if self.profile.supports_cleanup() {
            lines.push(format!("export BUILDROOT={}", work_dir));
        }
        lines.push(String::new());

        for phase in Phase::ALL {
            if phase == Phase::AfterScript && !self.profile.supports_cleanup() {
                let skipped = recipe.commands(phase).len();
                if skipped > 0 {
                    tracing::warn!(skipped, "Legacy script profile ignores after_script commands");
                }
                continue;
            }
            push_phase(&mut lines, phase, recipe.commands(phase));
        }

        Some(AssembledScript { lines })
    }
}

fn push_phase(lines: &mut Vec<String>, phase: Phase, commands: &[String]) {
    if commands.is_empty() {
        return;
    }

    let title = phase.display_name();
    let rule = "─".repeat(title.chars().count() + BANNER_PADDING);
    lines.push("echo \" \"".to_string());
    lines.push(format!("echo \"┌{}┐\"", rule));
    lines.push(format!("echo \"│ {}{} │\"", title, " ".repeat(BANNER_PADDING - 2)));
    lines.push(format!("echo \"└{}┘\"", rule));
    lines.push("echo \" \"".to_string());
    lines.push(format!("echo \" ! [{}]\"", phase.key()));

    for cmd in commands {
        lines.push(echo_command(cmd));
        lines.push(cmd.clone());
    }
}

/// Line printing the command text exactly, without evaluating it.
///
/// Uses `printf` with a single-quoted argument; `echo` expands backslash
/// escapes under dash.
pub fn echo_command(cmd: &str) -> String {
    format!("printf ' ! %s\\n' {}", shell_quote(cmd))
}

/// Single-quote `s` for the shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
