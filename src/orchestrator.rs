//! Locate → load → validate → assemble → execute, for one build.

use crate::config::{BuildConfig, BuildContext};
use crate::error::Result;
use crate::executor::{ExecutionResult, SandboxExecutor};
use crate::recipe::{self, Recipe};
use crate::sandbox::{ProcessLauncher, Sandbox};
use crate::script::{AssembledScript, ScriptAssembler};
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::watch;

/// What the user asked to build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub path: PathBuf,
    pub chroot: Option<String>,
    pub use_chroot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The recipe has no `script` commands; nothing was launched.
    NoBuildSteps,
    Completed(ExecutionResult),
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::NoBuildSteps => 0,
            RunOutcome::Completed(result) => result.exit_code,
        }
    }
}

/// A build prepared up to, but not including, execution.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub context: BuildContext,
    pub recipe: Recipe,
    pub script: Option<AssembledScript>,
}

pub struct Orchestrator<L: ProcessLauncher> {
    config: BuildConfig,
    launcher: L,
}

impl<L: ProcessLauncher + Clone> Orchestrator<L> {
    pub fn new(config: BuildConfig, launcher: L) -> Self {
        Self { config, launcher }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Prepare the build script without running it.
    pub fn plan(&self, request: &BuildRequest) -> Result<BuildPlan> {
        let located = recipe::locate(&request.path)?;
        let recipe = recipe::load(&located.recipe_path)?;
        let context = BuildContext::new(located.root_dir, request.chroot.clone(), request.use_chroot)?;
        let script = ScriptAssembler::new(self.config.profile).assemble(&context, &recipe);

        Ok(BuildPlan {
            context,
            recipe,
            script,
        })
    }

    /// Build and run the script, streaming its output into `sink`.
    ///
    /// A failing script surfaces as `ExecutionError` with the script's own
    /// exit status.
    pub async fn run<F>(
        &self,
        request: &BuildRequest,
        sink: F,
        cancel: watch::Receiver<bool>,
    ) -> Result<RunOutcome>
    where
        F: FnMut(&str),
    {
        let plan = self.plan(request)?;
        let Some(script) = plan.script else {
            tracing::info!("Recipe has no build commands, nothing to do");
            return Ok(RunOutcome::NoBuildSteps);
        };

        let sandbox = Sandbox::for_context(&plan.context, &self.config);
        match &sandbox {
            Sandbox::Chroot { name, .. } => tracing::info!(
                root = %plan.context.work_dir().display(),
                chroot = %name,
                "Starting build"
            ),
            Sandbox::Direct { .. } => tracing::info!(
                root = %plan.context.work_dir().display(),
                "Starting build without chroot"
            ),
        }

        let executor = SandboxExecutor::new(
            self.launcher.clone(),
            sandbox,
            self.config.child_env.clone(),
        );
        let started = Instant::now();
        let result = executor.execute(&script, sink, cancel).await;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            success = result.is_ok(),
            "Build finished"
        );

        result.map(RunOutcome::Completed)
    }
}
