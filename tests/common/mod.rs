#![allow(dead_code)]

use async_trait::async_trait;
use lipkbh::config::BuildConfig;
use lipkbh::sandbox::{ChildProcess, LaunchSpec, ProcessLauncher};
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// What the fake child saw when it was launched.
#[derive(Debug, Clone)]
pub struct Launch {
    pub spec: LaunchSpec,
    pub script_path: PathBuf,
    pub script: String,
    pub mode: u32,
}

/// Launcher that records launches and replays canned output.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    pub output: Vec<String>,
    pub exit_code: i32,
    /// Keep the output open after the canned lines until killed
    pub hang: bool,
    pub fail_launch: bool,
    pub launches: Arc<Mutex<Vec<Launch>>>,
    pub killed: Arc<AtomicBool>,
}

impl FakeLauncher {
    pub fn new(output: &[&str], exit_code: i32) -> Self {
        Self {
            output: output.iter().map(|s| s.to_string()).collect(),
            exit_code,
            ..Default::default()
        }
    }

    pub fn launches(&self) -> Vec<Launch> {
        self.launches.lock().unwrap().clone()
    }

    pub fn was_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, spec: &LaunchSpec) -> io::Result<Box<dyn ChildProcess>> {
        let script_path = PathBuf::from(spec.args.last().expect("script path argument"));
        let script = std::fs::read_to_string(&script_path)?;
        self.launches.lock().unwrap().push(Launch {
            spec: spec.clone(),
            mode: file_mode(&script_path),
            script_path,
            script,
        });

        if self.fail_launch {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such program"));
        }

        Ok(Box::new(FakeChild {
            lines: self.output.iter().cloned().collect(),
            exit_code: self.exit_code,
            hang: self.hang,
            killed: self.killed.clone(),
        }))
    }
}

struct FakeChild {
    lines: VecDeque<String>,
    exit_code: i32,
    hang: bool,
    killed: Arc<AtomicBool>,
}

#[async_trait]
impl ChildProcess for FakeChild {
    async fn next_line(&mut self) -> Option<io::Result<String>> {
        match self.lines.pop_front() {
            Some(line) => Some(Ok(line)),
            None if self.hang => std::future::pending().await,
            None => None,
        }
    }

    async fn wait(&mut self) -> io::Result<i32> {
        Ok(self.exit_code)
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.killed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o777)
        .unwrap_or(0)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> u32 {
    0
}

/// Config that runs scripts under plain `sh`, available everywhere tests run.
pub fn sh_config() -> BuildConfig {
    BuildConfig {
        shell: Some("sh".to_string()),
        ..BuildConfig::default()
    }
}

pub fn write_recipe(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
