//! Session lifecycle state machine.
//!
//! Owns and drives every child of the session: builds the engine, launches
//! it with the monitor attached, starts the feeder, waits out the run
//! duration, then tears down with escalating force. Teardown order is a
//! hard invariant: engine reaped, then helpers reaped, then sentinel
//! removed, then report generated. Reversing it risks orphaned helpers
//! outliving a crashed engine or a stale sentinel leaking into the next
//! session.

use crate::builder::BuildStep;
use crate::config::SessionConfig;
use crate::error::AppResult;
use crate::report::ReportTrigger;
use runsess_core::{SessionOutcome, SessionState};
use runsess_feed::MarketDataClient;
use runsess_proc::{ChildProcessHandle, StopSignalChannel};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Liveness poll cadence while waiting on the sentinel grace period.
const LIVENESS_POLL: Duration = Duration::from_millis(100);

/// How long to wait for the feeder task to honor cancellation.
const FEEDER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Supervisor for one timed execution session of the trading engine.
pub struct SessionSupervisor {
    config: SessionConfig,
    state: SessionState,
    sentinel: StopSignalChannel,
}

impl SessionSupervisor {
    pub fn new(config: SessionConfig) -> Self {
        let sentinel = StopSignalChannel::new(config.sentinel_path.clone());
        Self {
            config,
            state: SessionState::NotStarted,
            sentinel,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "Session state transition");
        self.state = next;
    }

    /// Drive one complete session.
    ///
    /// Returns `Err` only for the two fatal classes (build failure, engine
    /// spawn failure); every other problem is handled inside the session
    /// and still produces a `Completed` outcome.
    pub async fn run(&mut self) -> AppResult<SessionOutcome> {
        // NotStarted -> Building
        self.transition(SessionState::Building);
        if let Err(e) = BuildStep::new(&self.config.build).run().await {
            error!(%e, "Build failed, aborting before any process spawn");
            self.transition(SessionState::Failed);
            return Err(e);
        }

        // Building -> Running: engine first, monitor second, feeder last.
        let mut engine = match self.spawn_engine() {
            Ok(engine) => engine,
            Err(e) => {
                error!(%e, "Engine spawn failed, session aborted");
                self.transition(SessionState::Failed);
                return Err(e);
            }
        };

        let monitor = self.spawn_monitor(&engine);

        // Settle delay: give the engine's listening socket a moment before
        // the feeder starts. The feeder retries on its own as well.
        tokio::time::sleep(self.config.settle_delay()).await;

        let feeder_cancel = CancellationToken::new();
        let feeder = self.spawn_feeder(&feeder_cancel);

        self.transition(SessionState::Running);

        // Primary timeout: run duration plus a fixed margin compensating
        // for the settle delay, cut short if the engine exits on its own.
        let window = self.config.run_duration() + self.config.wait_margin();
        info!(
            duration_secs = self.config.run_duration_secs,
            window_secs = window.as_secs(),
            "Session running"
        );

        let early_exit = tokio::select! {
            res = engine.wait_timeout(window) => res?,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupt received, entering shutdown early");
                None
            }
        };

        self.transition(SessionState::ShutdownRequested);
        if let Some(status) = early_exit {
            info!(?status, "Engine exited on its own, skipping to cleanup");
        } else {
            self.escalate_engine_shutdown(&mut engine).await?;
        }

        let engine_exit = engine.exit_code();

        // Helpers are torn down only after the engine is confirmed reaped.
        self.stop_feeder(feeder, feeder_cancel).await;
        self.stop_monitor(monitor).await;

        // Exactly once, whichever tier fired: a stale sentinel must not
        // leak into the next session.
        self.sentinel.remove();

        self.transition(SessionState::Completed);
        info!(?engine_exit, "Session completed");

        ReportTrigger::new(&self.config).trigger().await;

        Ok(SessionOutcome::completed(engine_exit))
    }

    /// Spawn the engine with stdout/stderr captured into the result file.
    fn spawn_engine(&self) -> AppResult<ChildProcessHandle> {
        std::fs::create_dir_all(&self.config.result_dir)?;
        let result_file = std::fs::File::create(self.config.result_file())?;
        let stderr_file = result_file.try_clone()?;

        let mut command = Command::new(&self.config.engine_executable);
        command
            .stdout(Stdio::from(result_file))
            .stderr(Stdio::from(stderr_file));

        let engine = ChildProcessHandle::spawn("engine", &mut command)?;
        info!(
            executable = %self.config.engine_executable.display(),
            result_file = %self.config.result_file().display(),
            "Engine started as server"
        );
        Ok(engine)
    }

    /// Spawn the performance monitor against the engine's PID. Failure
    /// degrades monitoring but never aborts the session.
    fn spawn_monitor(&self, engine: &ChildProcessHandle) -> Option<ChildProcessHandle> {
        if self.config.monitor_command.is_empty() {
            info!("No monitor command configured, running unmonitored");
            return None;
        }
        let Some(pid) = engine.pid() else {
            warn!("Engine has no PID (already exited?), skipping monitor");
            return None;
        };

        let argv = &self.config.monitor_command;
        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]).args([
            "--pid",
            &pid.to_string(),
            "--interval",
            &self.config.sampling_interval_secs.to_string(),
            "--limit",
            &self.config.trend_aggregation_size.to_string(),
            "--raw",
            &self.config.raw_csv().display().to_string(),
            "--trend",
            &self.config.trend_csv().display().to_string(),
        ]);

        match ChildProcessHandle::spawn("monitor", &mut command) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(%e, "Monitor spawn failed, continuing without monitoring");
                None
            }
        }
    }

    /// Start the feeder as a cancellable in-process task.
    fn spawn_feeder(
        &self,
        cancel: &CancellationToken,
    ) -> Option<JoinHandle<runsess_feed::FeedResult<runsess_feed::FeedSummary>>> {
        match MarketDataClient::new(self.config.feed_config()) {
            Ok(client) => {
                info!(addr = %self.config.feed.engine_addr, "Market data feeder started as client");
                Some(tokio::spawn(client.run(cancel.clone())))
            }
            Err(e) => {
                warn!(%e, "Feeder setup failed, continuing without market data");
                None
            }
        }
    }

    /// Escalating engine shutdown: sentinel, then SIGTERM, then SIGKILL.
    /// Bounded: at most sentinel grace + terminate grace of wall time.
    async fn escalate_engine_shutdown(&mut self, engine: &mut ChildProcessHandle) -> AppResult<()> {
        info!("Engine still alive, creating stop sentinel");
        self.sentinel.create();

        if self.poll_until_exit(engine, self.config.sentinel_grace()).await {
            info!(tier = "sentinel", "Engine shut down cooperatively");
            return Ok(());
        }

        self.transition(SessionState::Terminating);
        engine.terminate();
        if engine
            .wait_timeout(self.config.terminate_grace())
            .await?
            .is_some()
        {
            info!(tier = "terminate", "Engine exited after SIGTERM");
            return Ok(());
        }

        self.transition(SessionState::Killed);
        engine.force_kill().await?;
        warn!(tier = "kill", "Engine did not terminate gracefully, killed");
        Ok(())
    }

    /// Re-polling bounded wait on engine liveness. Returns true when the
    /// engine exited within the grace period.
    async fn poll_until_exit(&self, engine: &mut ChildProcessHandle, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        loop {
            if !engine.is_alive() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(LIVENESS_POLL.min(deadline - now)).await;
        }
    }

    /// Cancel the feeder task and wait for it to wind down. A feeder that
    /// already died of a socket write error is normal teardown here, not a
    /// session failure.
    async fn stop_feeder(
        &self,
        feeder: Option<JoinHandle<runsess_feed::FeedResult<runsess_feed::FeedSummary>>>,
        cancel: CancellationToken,
    ) {
        cancel.cancel();
        let Some(handle) = feeder else { return };

        match tokio::time::timeout(FEEDER_JOIN_TIMEOUT, handle).await {
            Ok(Ok(Ok(summary))) => {
                info!(
                    ticks_sent = summary.ticks_sent,
                    flushes = summary.flushes,
                    "Feeder stopped"
                );
            }
            Ok(Ok(Err(e))) => {
                info!(%e, "Feeder had already exited with an I/O error");
            }
            Ok(Err(e)) => {
                warn!(?e, "Feeder task panicked");
            }
            Err(_) => {
                warn!("Feeder did not stop within the join timeout, detaching");
            }
        }
    }

    /// Terminate-then-kill the monitor, regardless of its own state.
    async fn stop_monitor(&self, monitor: Option<ChildProcessHandle>) {
        let Some(mut monitor) = monitor else { return };
        match monitor
            .shutdown_graceful(self.config.terminate_grace())
            .await
        {
            Ok(tier) => info!(tier = %tier, "Monitor stopped"),
            Err(e) => warn!(%e, "Monitor teardown failed"),
        }
    }
}
