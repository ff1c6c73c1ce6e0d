//! Interval task runner with single-flight execution and host awareness.
//!
//! A [`PollScheduler`] owns one actor task. The actor holds the timer and
//! every piece of mutable scheduling state, and applies commands, timer
//! ticks, task settlements and host signal changes one at a time. Handles
//! only send commands and read the published [`SchedulerStatus`].
//!
//! The next tick is armed only after the previous run settles (success,
//! failure or timeout). A launch after stop/restart waits for a run from the
//! previous epoch to settle, so runs never overlap; only a run abandoned by
//! its timeout can still be executing alongside the next one.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::host::{HostSignals, HostState};
use crate::polling::types::{
    PollTask, SchedulerConfig, SchedulerError, SchedulerStatus, TaskError,
};

#[derive(Debug)]
enum Command {
    Start { immediate: Option<bool> },
    Stop,
    Restart,
    PollNow,
    SetInterval(std::time::Duration),
    SetEnabled(bool),
    SetBackgroundAllowed(bool),
    Shutdown,
}

struct Envelope {
    command: Command,
    ack: oneshot::Sender<()>,
}

#[derive(Debug)]
enum RunOutcome {
    Completed,
    Failed(TaskError),
    TimedOut,
}

struct Settled {
    epoch: u64,
    outcome: RunOutcome,
}

/// Cloneable control handle for a running scheduler.
///
/// Every control method resolves once the actor has applied the command,
/// so [`SchedulerHandle::status`] reflects it immediately afterwards.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Envelope>,
    status: watch::Receiver<SchedulerStatus>,
}

impl SchedulerHandle {
    async fn send(&self, command: Command) -> Result<(), SchedulerError> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Envelope { command, ack })
            .map_err(|_| SchedulerError::Stopped)?;
        done.await.map_err(|_| SchedulerError::Stopped)
    }

    /// Start polling. No-op when disabled or already running.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        self.send(Command::Start { immediate: None }).await
    }

    /// Start polling, overriding the configured `immediate` behavior.
    pub async fn start_with(&self, immediate: bool) -> Result<(), SchedulerError> {
        self.send(Command::Start {
            immediate: Some(immediate),
        })
        .await
    }

    /// Clear the timer and the in-flight flag. Idempotent.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        self.send(Command::Stop).await
    }

    pub async fn restart(&self) -> Result<(), SchedulerError> {
        self.send(Command::Restart).await
    }

    /// Run the task now, outside the normal cadence. Skipped if a run is
    /// already in flight.
    pub async fn poll_now(&self) -> Result<(), SchedulerError> {
        self.send(Command::PollNow).await
    }

    /// Change the interval; a running scheduler restarts to apply it.
    pub async fn set_interval(
        &self,
        interval: std::time::Duration,
    ) -> Result<(), SchedulerError> {
        self.send(Command::SetInterval(interval)).await
    }

    /// Disabling also stops the scheduler. Enabling does not start it.
    pub async fn set_enabled(&self, enabled: bool) -> Result<(), SchedulerError> {
        self.send(Command::SetEnabled(enabled)).await
    }

    pub async fn set_background_allowed(&self, allowed: bool) -> Result<(), SchedulerError> {
        self.send(Command::SetBackgroundAllowed(allowed)).await
    }

    pub fn status(&self) -> SchedulerStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.clone()
    }

    pub fn running(&self) -> bool {
        self.status.borrow().running
    }

    pub fn last_run_at(&self) -> Option<Instant> {
        self.status.borrow().last_run_at
    }

    pub fn time_until_next_run(&self) -> Option<std::time::Duration> {
        self.status.borrow().time_until_next_run()
    }
}

/// Owner of a scheduler actor.
///
/// Call [`PollScheduler::shutdown`] to tear it down; dropping the owner
/// aborts the actor without waiting.
pub struct PollScheduler {
    handle: SchedulerHandle,
    actor: Option<JoinHandle<()>>,
}

impl PollScheduler {
    /// Spawn the scheduler actor. Must be called within a Tokio runtime.
    ///
    /// The scheduler starts stopped; call `start()` to begin polling.
    pub fn new(config: SchedulerConfig, host: Arc<dyn HostSignals>, task: PollTask) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let host_rx = host.subscribe();
        let host_state = HostState {
            hidden: host.is_hidden(),
            focused: host.is_focused(),
        };

        let actor = Actor {
            config,
            task,
            host_state,
            running: false,
            in_flight: false,
            run_outstanding: false,
            deferred: None,
            epoch: 0,
            last_run_at: None,
            next_run_at: None,
            settled_tx,
            status_tx: watch::Sender::new(SchedulerStatus {
                enabled: config.enabled,
                running: false,
                last_run_at: None,
                next_run_at: None,
                interval: config.interval,
                timeout: config.timeout,
                task_in_flight: false,
            }),
        };
        let status_rx = actor.status_tx.subscribe();

        debug!(
            event = "core.scheduler.create_completed",
            interval_ms = config.interval.as_millis() as u64,
            timeout_ms = config.timeout.as_millis() as u64,
            background_allowed = config.background_allowed,
        );

        let join = tokio::spawn(actor.run(command_rx, settled_rx, host_rx));

        Self {
            handle: SchedulerHandle {
                commands: command_tx,
                status: status_rx,
            },
            actor: Some(join),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub async fn start(&self) -> Result<(), SchedulerError> {
        self.handle.start().await
    }

    pub async fn stop(&self) -> Result<(), SchedulerError> {
        self.handle.stop().await
    }

    pub async fn restart(&self) -> Result<(), SchedulerError> {
        self.handle.restart().await
    }

    pub async fn poll_now(&self) -> Result<(), SchedulerError> {
        self.handle.poll_now().await
    }

    pub fn status(&self) -> SchedulerStatus {
        self.handle.status()
    }

    /// Stop polling, drop host subscriptions and wait for the actor to exit.
    ///
    /// Consumes the scheduler, so teardown happens exactly once. An in-flight
    /// task is left to finish on its own; its result is ignored.
    pub async fn shutdown(mut self) {
        if self.handle.send(Command::Shutdown).await.is_err() {
            debug!(event = "core.scheduler.shutdown_skipped", reason = "actor gone");
        }
        if let Some(actor) = self.actor.take() {
            if let Err(e) = actor.await {
                warn!(event = "core.scheduler.shutdown_failed", error = %e);
            }
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(actor) = self.actor.take() {
            actor.abort();
        }
    }
}

struct Actor {
    config: SchedulerConfig,
    task: PollTask,
    host_state: HostState,
    running: bool,
    /// Reported to observers; cleared by `stop`.
    in_flight: bool,
    /// A launched run has not settled yet, whatever its epoch.
    run_outstanding: bool,
    /// Launch requested while a run from an older epoch was outstanding.
    deferred: Option<&'static str>,
    /// Bumped by every stop; settlements from an older epoch are ignored.
    epoch: u64,
    last_run_at: Option<Instant>,
    next_run_at: Option<Instant>,
    settled_tx: mpsc::UnboundedSender<Settled>,
    status_tx: watch::Sender<SchedulerStatus>,
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Envelope>,
        mut settled: mpsc::UnboundedReceiver<Settled>,
        mut host: watch::Receiver<HostState>,
    ) {
        let mut host_connected = true;

        loop {
            let deadline = self.next_run_at;
            tokio::select! {
                biased;

                envelope = commands.recv() => {
                    let Some(Envelope { command, ack }) = envelope else {
                        break;
                    };
                    let shutdown = matches!(command, Command::Shutdown);
                    self.handle_command(command);
                    self.publish();
                    let _ = ack.send(());
                    if shutdown {
                        break;
                    }
                }

                Some(result) = settled.recv() => {
                    self.on_settled(result);
                }

                changed = host.changed(), if host_connected => {
                    match changed {
                        Ok(()) => {
                            let next = *host.borrow_and_update();
                            self.on_host_change(next);
                        }
                        Err(_) => {
                            debug!(event = "core.scheduler.host_disconnected");
                            host_connected = false;
                        }
                    }
                }

                () = wait_until(deadline) => {
                    self.next_run_at = None;
                    self.launch("tick");
                }
            }
            self.publish();
        }

        debug!(event = "core.scheduler.actor_exited");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start { immediate } => {
                self.start(immediate.unwrap_or(self.config.immediate));
            }
            Command::Stop => self.stop("requested"),
            Command::Restart => self.restart(),
            Command::PollNow => self.poll_now("requested"),
            Command::SetInterval(interval) => {
                if interval == self.config.interval {
                    return;
                }
                self.config.interval = interval;
                info!(
                    event = "core.scheduler.interval_changed",
                    interval_ms = interval.as_millis() as u64,
                );
                if self.running {
                    self.restart();
                }
            }
            Command::SetEnabled(enabled) => {
                if !enabled {
                    self.stop("disabled");
                }
                self.config.enabled = enabled;
            }
            Command::SetBackgroundAllowed(allowed) => {
                self.config.background_allowed = allowed;
                if !allowed && self.host_state.hidden {
                    self.stop("host_hidden");
                }
            }
            Command::Shutdown => {
                self.stop("shutdown");
                info!(event = "core.scheduler.shutdown_completed");
            }
        }
    }

    fn start(&mut self, immediate: bool) {
        if !self.config.enabled {
            debug!(event = "core.scheduler.start_skipped", reason = "disabled");
            return;
        }
        if self.running {
            return;
        }
        if self.host_state.hidden && !self.config.background_allowed {
            debug!(event = "core.scheduler.start_skipped", reason = "host hidden");
            return;
        }

        self.running = true;
        info!(
            event = "core.scheduler.started",
            interval_ms = self.config.interval.as_millis() as u64,
            immediate = immediate,
        );

        if immediate {
            self.launch("start");
        } else if !self.in_flight {
            self.next_run_at = Some(Instant::now() + self.config.interval);
        }
    }

    fn stop(&mut self, reason: &'static str) {
        if self.running || self.in_flight {
            info!(event = "core.scheduler.stopped", reason = reason);
        }
        self.running = false;
        self.in_flight = false;
        self.deferred = None;
        self.next_run_at = None;
        self.epoch += 1;
    }

    fn restart(&mut self) {
        self.stop("restart");
        self.start(self.config.immediate);
    }

    fn poll_now(&mut self, trigger: &'static str) {
        if !self.config.enabled {
            debug!(event = "core.scheduler.poll_now_skipped", reason = "disabled");
            return;
        }
        self.launch(trigger);
    }

    /// Spawn one run of the task, raced against the timeout.
    ///
    /// The task runs in its own Tokio task so a timeout only detaches it;
    /// its eventual result is dropped. A run left over from before the last
    /// stop delays the launch until it settles.
    fn launch(&mut self, trigger: &'static str) {
        if self.in_flight {
            debug!(
                event = "core.scheduler.tick_skipped",
                reason = "task in flight",
                trigger = trigger,
            );
            return;
        }
        if self.run_outstanding {
            debug!(
                event = "core.scheduler.launch_deferred",
                reason = "previous run not settled",
                trigger = trigger,
            );
            self.deferred = Some(trigger);
            self.next_run_at = None;
            return;
        }

        self.in_flight = true;
        self.run_outstanding = true;
        self.next_run_at = None;
        debug!(event = "core.scheduler.task_started", trigger = trigger);

        let epoch = self.epoch;
        let timeout = self.config.timeout;
        let settled = self.settled_tx.clone();
        let work = tokio::spawn((self.task)());

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, work).await {
                Ok(Ok(Ok(()))) => RunOutcome::Completed,
                Ok(Ok(Err(e))) => RunOutcome::Failed(e),
                Ok(Err(join_error)) => {
                    RunOutcome::Failed(TaskError::new(format!("task panicked: {}", join_error)))
                }
                Err(_) => RunOutcome::TimedOut,
            };
            // The actor may have shut down meanwhile.
            let _ = settled.send(Settled { epoch, outcome });
        });
    }

    fn on_settled(&mut self, result: Settled) {
        self.run_outstanding = false;

        if result.epoch != self.epoch {
            debug!(
                event = "core.scheduler.result_discarded",
                reason = "stopped since launch",
                outcome = ?result.outcome,
            );
            if let Some(trigger) = self.deferred.take() {
                self.launch(trigger);
            }
            return;
        }

        self.in_flight = false;
        self.last_run_at = Some(Instant::now());

        match result.outcome {
            RunOutcome::Completed => {
                debug!(event = "core.scheduler.task_completed");
            }
            RunOutcome::Failed(e) => {
                warn!(event = "core.scheduler.task_failed", error = %e);
            }
            RunOutcome::TimedOut => {
                warn!(
                    event = "core.scheduler.task_timed_out",
                    timeout_ms = self.config.timeout.as_millis() as u64,
                );
            }
        }

        if self.running {
            self.next_run_at = Some(Instant::now() + self.config.interval);
        }
    }

    fn on_host_change(&mut self, next: HostState) {
        let previous = self.host_state;
        self.host_state = next;

        if previous.hidden != next.hidden {
            if next.hidden {
                if !self.config.background_allowed {
                    self.stop("host_hidden");
                }
            } else if self.config.enabled {
                if self.config.background_allowed {
                    self.poll_now("host_visible");
                } else {
                    // Resume a full interval from now rather than firing at once.
                    self.last_run_at = Some(Instant::now());
                    self.start(false);
                }
            }
        }

        if next.focused && !previous.focused && !self.running && self.config.enabled {
            debug!(event = "core.scheduler.focus_regained");
            self.start(self.config.immediate);
        }
    }

    fn publish(&self) {
        let status = SchedulerStatus {
            enabled: self.config.enabled,
            running: self.running,
            last_run_at: self.last_run_at,
            next_run_at: self.next_run_at,
            interval: self.config.interval,
            timeout: self.config.timeout,
            task_in_flight: self.in_flight,
        };
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
