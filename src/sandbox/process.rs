use super::LaunchSpec;
use async_trait::async_trait;
use std::io;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// Lines buffered between the pipe readers and the consumer
const LINE_BUFFER: usize = 64;

/// A running build script as seen by the executor.
#[async_trait]
pub trait ChildProcess: Send {
    /// Next line of merged stdout/stderr, `None` once the output is closed.
    async fn next_line(&mut self) -> Option<io::Result<String>>;
    /// Exit status; signals map to `128 + signo`.
    async fn wait(&mut self) -> io::Result<i32>;
    async fn kill(&mut self) -> io::Result<()>;
}

pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, spec: &LaunchSpec) -> io::Result<Box<dyn ChildProcess>>;
}

/// Launches real processes on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl ProcessLauncher for TokioLauncher {
    fn launch(&self, spec: &LaunchSpec) -> io::Result<Box<dyn ChildProcess>> {
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Build scripts fold stderr into stdout themselves, so only the
        // sandbox tool's own diagnostics arrive on stderr. The channel
        // closes when both readers finish.
        let (tx, lines) = mpsc::channel(LINE_BUFFER);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx));
        }

        Ok(Box::new(TokioChild { child, lines }))
    }
}

struct TokioChild {
    child: Child,
    lines: mpsc::Receiver<io::Result<String>>,
}

#[async_trait]
impl ChildProcess for TokioChild {
    async fn next_line(&mut self) -> Option<io::Result<String>> {
        self.lines.recv().await
    }

    async fn wait(&mut self) -> io::Result<i32> {
        let status = self.child.wait().await?;
        Ok(status_code(status))
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}

async fn forward_lines<R>(reader: R, tx: mpsc::Sender<io::Result<String>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(Ok(line)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }
}

fn status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> LaunchSpec {
        LaunchSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            env: vec![("LC_ALL".to_string(), "C".to_string())],
        }
    }

    async fn collect(child: &mut Box<dyn ChildProcess>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(line) = child.next_line().await {
            out.push(line.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_merges_stdout_and_stderr() {
        let mut child = TokioLauncher
            .launch(&sh("echo out; echo err 1>&2; exit 4"))
            .unwrap();
        let mut lines = collect(&mut child).await;
        lines.sort();
        assert_eq!(lines, vec!["err", "out"]);
        assert_eq!(child.wait().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_env_is_passed() {
        let mut child = TokioLauncher.launch(&sh("echo \"$LC_ALL\"")).unwrap();
        assert_eq!(collect(&mut child).await, vec!["C"]);
        assert_eq!(child.wait().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let mut child = TokioLauncher.launch(&sh("printf 'a\\377b\\r\\n'")).unwrap();
        assert_eq!(collect(&mut child).await, vec!["a\u{FFFD}b"]);
    }

    #[tokio::test]
    async fn test_signal_exit_code() {
        let mut child = TokioLauncher.launch(&sh("kill -9 $$")).unwrap();
        collect(&mut child).await;
        assert_eq!(child.wait().await.unwrap(), 137);
    }
}
