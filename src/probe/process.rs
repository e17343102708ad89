//! External process invocation under a deadline.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::{ProbeError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn status_string(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "signal".to_string(),
        }
    }
}

/// Runs an external program and waits for it, never longer than `timeout`.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, program: &Path, args: &[String], timeout: Duration) -> Result<ProcessOutput>;
}

/// Spawns the process with a watchdog thread that kills it at the deadline.
///
/// stdout and stderr are drained on their own threads so a chatty process
/// cannot block on a full pipe while the caller waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchdogRunner;

fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string_lossy().into_owned())
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut s) = source {
            if let Err(e) = s.read_to_end(&mut buf) {
                log::debug!("pipe read failed: {e}");
            }
        }
        buf
    })
}

/// Kill `child` unless it has already exited. Returns whether it was still
/// running, so an exit racing the deadline is not reported as a timeout.
fn expire(child: &Mutex<Child>) -> bool {
    let mut child = child.lock();
    match child.try_wait() {
        Ok(Some(_)) => false,
        Ok(None) | Err(_) => {
            if let Err(e) = child.kill() {
                log::debug!("kill failed: {e}");
            }
            true
        }
    }
}

impl ProcessRunner for WatchdogRunner {
    fn run(&self, program: &Path, args: &[String], timeout: Duration) -> Result<ProcessOutput> {
        let tool = tool_name(program);
        log::debug!("running {tool} {}", args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let child: Arc<Mutex<Child>> = Arc::new(Mutex::new(child));
        let killed = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel::<()>();

        let watchdog = {
            let child = Arc::clone(&child);
            let killed = Arc::clone(&killed);
            let tool = tool.clone();
            thread::spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(timeout) {
                    if expire(&child) {
                        log::warn!("{tool} exceeded {timeout:?}, killed");
                        killed.store(true, Ordering::SeqCst);
                    }
                }
            })
        };

        let status = loop {
            let polled = child.lock().try_wait();
            match polled {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => break Err(e),
            }
        };

        // The watchdog is either already done or waiting on this.
        let _ = done_tx.send(());
        let _ = watchdog.join();
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if killed.load(Ordering::SeqCst) {
            return Err(ProbeError::Timeout { tool, timeout });
        }
        let status = status.map_err(|source| ProbeError::Io {
            path: program.to_path_buf(),
            source,
        })?;

        Ok(ProcessOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn run(program: &str, args: &[&str], timeout: Duration) -> Result<ProcessOutput> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        WatchdogRunner.run(Path::new(program), &args, timeout)
    }

    #[test]
    fn captures_stdout() {
        let out = run("echo", &["hello"], Duration::from_secs(10)).unwrap();
        assert!(out.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[test]
    fn reports_exit_code() {
        let out = run("sh", &["-c", "echo oops >&2; exit 3"], Duration::from_secs(10)).unwrap();
        assert!(!out.success());
        assert_eq!(out.code, Some(3));
        assert_eq!(String::from_utf8_lossy(&out.stderr).trim(), "oops");
    }

    #[test]
    fn watchdog_kills_at_deadline() {
        let start = Instant::now();
        let result = run("sleep", &["5"], Duration::from_millis(200));
        assert!(matches!(result, Err(ProbeError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn exited_child_is_not_expired() {
        let mut child = Command::new("true").spawn().unwrap();
        child.wait().unwrap();
        assert!(!expire(&Mutex::new(child)));

        let running = Mutex::new(Command::new("sleep").arg("5").spawn().unwrap());
        assert!(expire(&running));
        assert!(running.lock().wait().is_ok());
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let result = run("/nonexistent/definitely-not-here", &[], Duration::from_secs(1));
        assert!(matches!(result, Err(ProbeError::Spawn { .. })));
    }
}
