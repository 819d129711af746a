//! Handle for one spawned OS child process.
//!
//! The handle owns liveness polling, timed waits and the terminate/kill
//! escalation used during session teardown. Identity is the OS process:
//! dropping the handle does not reap the child, only `wait`/`force_kill` do.

use crate::error::{ProcError, ProcResult};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Which escalation tier ended up reaping a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTier {
    /// Process was already gone when shutdown started.
    AlreadyExited,
    /// SIGTERM sufficed.
    Terminated,
    /// SIGKILL was required.
    Killed,
}

impl std::fmt::Display for ShutdownTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyExited => write!(f, "already-exited"),
            Self::Terminated => write!(f, "terminated"),
            Self::Killed => write!(f, "killed"),
        }
    }
}

/// One spawned child process.
#[derive(Debug)]
pub struct ChildProcessHandle {
    name: String,
    child: Child,
    /// Exit status once reaped. `try_wait` and `wait` both record it so
    /// repeated cleanup calls stay no-ops.
    exit: Option<ExitStatus>,
}

impl ChildProcessHandle {
    /// Spawn a child from a prepared command.
    pub fn spawn(name: impl Into<String>, command: &mut Command) -> ProcResult<Self> {
        let name = name.into();
        let child = command.spawn().map_err(|e| ProcError::Spawn {
            name: name.clone(),
            source: e,
        })?;

        info!(name = %name, pid = ?child.id(), "Spawned child process");

        Ok(Self {
            name,
            child,
            exit: None,
        })
    }

    /// Display name given at spawn time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS process identifier. `None` once the child has been reaped.
    pub fn pid(&self) -> Option<u32> {
        if self.exit.is_some() {
            None
        } else {
            self.child.id()
        }
    }

    /// Exit code, if the child has been reaped and reported one.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit.and_then(|s| s.code())
    }

    /// Poll whether the process is still running. Never returns a cached
    /// stale answer: each call re-polls the OS unless the child is already
    /// reaped.
    pub fn is_alive(&mut self) -> bool {
        if self.exit.is_some() {
            return false;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(name = %self.name, ?status, "Child exited");
                self.exit = Some(status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!(name = %self.name, ?e, "try_wait failed, assuming child is gone");
                false
            }
        }
    }

    /// Block until the child exits.
    pub async fn wait(&mut self) -> ProcResult<ExitStatus> {
        if let Some(status) = self.exit {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.exit = Some(status);
        Ok(status)
    }

    /// Wait for the child to exit, up to `timeout`. Returns `Ok(None)` when
    /// the deadline passes with the child still running.
    pub async fn wait_timeout(&mut self, timeout: Duration) -> ProcResult<Option<ExitStatus>> {
        if let Some(status) = self.exit {
            return Ok(Some(status));
        }
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.exit = Some(status);
                Ok(Some(status))
            }
            Ok(Err(e)) => Err(ProcError::Io(e)),
            Err(_) => Ok(None),
        }
    }

    /// Send SIGTERM. Polls first: a no-op on an already-dead child.
    pub fn terminate(&mut self) {
        if !self.is_alive() {
            debug!(name = %self.name, "terminate skipped, child already exited");
            return;
        }
        if let Some(pid) = self.child.id() {
            match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => info!(name = %self.name, pid, "Sent SIGTERM"),
                Err(e) => warn!(name = %self.name, pid, ?e, "SIGTERM delivery failed"),
            }
        }
    }

    /// Send SIGKILL and reap. Idempotent on an already-dead child.
    pub async fn force_kill(&mut self) -> ProcResult<()> {
        if !self.is_alive() {
            return Ok(());
        }
        let pid = self.child.id();
        self.child.kill().await?;
        // kill() waits for exit; record it so pid()/is_alive agree.
        if let Ok(Some(status)) = self.child.try_wait() {
            self.exit = Some(status);
        }
        info!(name = %self.name, ?pid, "Sent SIGKILL");
        Ok(())
    }

    /// Terminate, wait out a grace period, then escalate to a forced kill.
    ///
    /// Used for helper processes (monitor, feeder subprocess) during
    /// teardown. Returns the tier that ended up reaping the child.
    pub async fn shutdown_graceful(&mut self, grace: Duration) -> ProcResult<ShutdownTier> {
        if !self.is_alive() {
            debug!(name = %self.name, "Child already exited before shutdown");
            return Ok(ShutdownTier::AlreadyExited);
        }

        self.terminate();
        if self.wait_timeout(grace).await?.is_some() {
            info!(name = %self.name, "Child exited after SIGTERM");
            return Ok(ShutdownTier::Terminated);
        }

        warn!(name = %self.name, grace_secs = grace.as_secs(), "Grace period elapsed, killing");
        self.force_kill().await?;
        Ok(ShutdownTier::Killed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn test_spawn_and_reap() {
        let mut handle = ChildProcessHandle::spawn("true", &mut sh("exit 0")).unwrap();
        let status = handle.wait().await.unwrap();
        assert!(status.success());
        assert_eq!(handle.exit_code(), Some(0));
        assert!(!handle.is_alive());
        assert!(handle.pid().is_none());
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let mut cmd = Command::new("/nonexistent/definitely-not-a-binary");
        let err = ChildProcessHandle::spawn("ghost", &mut cmd).unwrap_err();
        assert!(matches!(err, ProcError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_wait_timeout_expires() {
        let mut handle = ChildProcessHandle::spawn("sleeper", &mut sh("sleep 30")).unwrap();
        let res = handle
            .wait_timeout(Duration::from_millis(100))
            .await
            .unwrap();
        assert!(res.is_none());
        assert!(handle.is_alive());
        handle.force_kill().await.unwrap();
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_terminate_is_idempotent_on_dead_child() {
        let mut handle = ChildProcessHandle::spawn("short", &mut sh("exit 3")).unwrap();
        handle.wait().await.unwrap();
        // Both must be no-ops after the child is reaped.
        handle.terminate();
        handle.force_kill().await.unwrap();
        assert_eq!(handle.exit_code(), Some(3));
    }

    #[tokio::test]
    async fn test_graceful_shutdown_via_sigterm() {
        let mut handle = ChildProcessHandle::spawn("sleeper", &mut sh("sleep 30")).unwrap();
        let tier = handle
            .shutdown_graceful(Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(tier, ShutdownTier::Terminated);
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_term_resistant_child_is_killed() {
        // Child ignores SIGTERM; escalation must reach SIGKILL.
        let mut handle =
            ChildProcessHandle::spawn("stubborn", &mut sh("trap '' TERM; sleep 30")).unwrap();
        // Give the shell a moment to install the trap.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let tier = handle
            .shutdown_graceful(Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(tier, ShutdownTier::Killed);
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_shutdown_on_already_dead_child() {
        let mut handle = ChildProcessHandle::spawn("short", &mut sh("exit 0")).unwrap();
        handle.wait().await.unwrap();
        let tier = handle
            .shutdown_graceful(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(tier, ShutdownTier::AlreadyExited);
    }
}
