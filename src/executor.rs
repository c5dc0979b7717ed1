use crate::error::{BuildError, Result};
use crate::sandbox::{ChildProcess, ProcessLauncher, Sandbox};
use crate::script::AssembledScript;
use std::io::Write;
use tempfile::NamedTempFile;
use tokio::sync::watch;

/// Outcome of a build script that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
}

pub struct SandboxExecutor<L: ProcessLauncher> {
    launcher: L,
    sandbox: Sandbox,
    env: Vec<(String, String)>,
}

impl<L: ProcessLauncher> SandboxExecutor<L> {
    pub fn new(launcher: L, sandbox: Sandbox, env: Vec<(String, String)>) -> Self {
        Self {
            launcher,
            sandbox,
            env,
        }
    }

    /// Run `script`, handing every output line to `sink` as it arrives.
    ///
    /// The temporary script file lives exactly as long as this call. A
    /// non-zero exit becomes `ExecutionError` carrying that status; setting
    /// `cancel` to `true` kills the script and returns `Cancelled`.
    pub async fn execute<F>(
        &self,
        script: &AssembledScript,
        mut sink: F,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<ExecutionResult>
    where
        F: FnMut(&str),
    {
        let file = write_script(script)?;
        let spec = self.sandbox.launch_spec(file.path(), &self.env);
        tracing::debug!(command = %spec, "Launching build script");

        let mut child = self
            .launcher
            .launch(&spec)
            .map_err(|e| BuildError::io(format!("Failed to launch '{}'", spec.program), e))?;

        loop {
            tokio::select! {
                line = child.next_line() => match line {
                    Some(Ok(line)) => sink(&line),
                    Some(Err(e)) => return Err(BuildError::io("Failed to read build output", e)),
                    None => break,
                },
                _ = cancelled(&mut cancel) => return Err(stop(child.as_mut()).await),
            }
        }

        let exit_code = tokio::select! {
            status = child.wait() => {
                status.map_err(|e| BuildError::io("Failed to wait for build script", e))?
            }
            _ = cancelled(&mut cancel) => return Err(stop(child.as_mut()).await),
        };

        drop(file);
        tracing::debug!(exit_code, "Build script finished");
        if exit_code != 0 {
            return Err(BuildError::ExecutionError { code: exit_code });
        }
        Ok(ExecutionResult { exit_code })
    }
}

async fn stop(child: &mut dyn ChildProcess) -> BuildError {
    tracing::warn!("Build cancelled, killing build script");
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill build script: {}", e);
    }
    BuildError::Cancelled
}

/// Resolves once `rx` reads `true`. Never resolves if the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Write the script to a fresh executable temp file, synced to disk.
fn write_script(script: &AssembledScript) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("lipkbh-")
        .suffix("_lbs.sh")
        .tempfile()
        .map_err(|e| BuildError::io("Failed to create temporary build script", e))?;

    let path = file.path().to_path_buf();
    let write_err = |e| BuildError::io(format!("Failed to write {}", path.display()), e);
    file.write_all(script.render().as_bytes()).map_err(write_err)?;
    file.flush().map_err(write_err)?;
    file.as_file().sync_all().map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| BuildError::io("Failed to mark build script executable", e))?;
    }

    Ok(file)
}
