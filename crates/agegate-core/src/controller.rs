//! The age display controller.
//!
//! One Tokio task owns all session state: the displayed bucket, the
//! identity label, the typing and cooldown flags and the debounce timer.
//! Every input (age events, identity edits, debounce expiry, write
//! completions) is handled to completion inside that task, so the write
//! gate always sees a consistent snapshot.
//!
//! ```text
//!   AgeEventChannel ──┐
//!   ControllerHandle ─┤  select!  ┌─► watch<SessionView>
//!   write completions ┤ ────────► ├─► broadcast<Diagnostic>
//!   debounce expiry ──┘           └─► spawned store writes
//! ```
//!
//! Writes run on their own tasks and report back with a [`WriteTicket`].
//! A completion for a window that has since expired is logged and
//! otherwise ignored; a completion arriving after teardown finds the
//! channel closed and is dropped.

use std::sync::Arc;
use std::time::Duration;

use agegate_types::{AgeEvent, DisplayBucket, NewReading, ReadingAck, ReadingId, SessionView};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::bucket::bucket;
use crate::channel::{AgeEventChannel, AgeEventSubscription};
use crate::config::{AgegateConfig, GateConfig};
use crate::debounce::DebounceTimer;
use crate::diagnostic::Diagnostic;
use crate::gate::{Admission, GateDecision, GateInputs, WriteGate};
use crate::store::{ReadingStore, StoreError};

/// Buffered session commands before `ControllerHandle` senders wait.
const COMMAND_CAPACITY: usize = 32;

/// Buffered diagnostics per subscriber before it starts lagging.
const DIAGNOSTIC_CAPACITY: usize = 256;

/// Errors returned by [`ControllerHandle`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    /// The controller task has stopped.
    #[error("age controller has stopped")]
    Stopped,
}

/// Controller settings, usually derived from [`AgegateConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Write gate policy.
    pub gate: GateConfig,
    /// Quiet period before the display resets.
    pub debounce_delay: Duration,
    /// Upper bound on a single store write. `None` waits indefinitely.
    pub write_timeout: Option<Duration>,
}

impl ControllerConfig {
    /// Extract the controller settings from the full configuration.
    pub const fn from_config(config: &AgegateConfig) -> Self {
        Self {
            gate: config.gate,
            debounce_delay: config.debounce.delay(),
            write_timeout: config.store.write_timeout(),
        }
    }

    /// Replace the gate policy.
    #[must_use]
    pub const fn with_gate(mut self, gate: GateConfig) -> Self {
        self.gate = gate;
        self
    }

    /// Replace the debounce delay.
    #[must_use]
    pub const fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// Replace the write timeout.
    #[must_use]
    pub const fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_config(&AgegateConfig::default())
    }
}

/// Identifies an in-flight write and the debounce window it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteTicket {
    /// Key of the reading being written.
    pub reading_id: ReadingId,
    /// Window generation current when the write started.
    pub window: u64,
}

/// Outcome of a spawned store write, sent back to the controller.
#[derive(Debug)]
struct WriteCompletion {
    ticket: WriteTicket,
    result: Result<ReadingAck, StoreError>,
}

/// Inputs from the identity field.
#[derive(Debug)]
enum Command {
    EditName(String),
    Focus,
    Blur,
    Shutdown,
}

/// Cloneable handle to a running controller.
///
/// The controller stops when [`ControllerHandle::shutdown`] is called or
/// when every handle has been dropped.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<SessionView>,
    diagnostics: broadcast::Sender<Diagnostic>,
}

impl ControllerHandle {
    /// Replace the identity label. The field counts as being edited until
    /// [`ControllerHandle::blur`].
    pub async fn edit_name(&self, name: impl Into<String>) -> Result<(), ControllerError> {
        self.send(Command::EditName(name.into())).await
    }

    /// The identity field gained focus.
    pub async fn focus(&self) -> Result<(), ControllerError> {
        self.send(Command::Focus).await
    }

    /// The identity field lost focus.
    pub async fn blur(&self) -> Result<(), ControllerError> {
        self.send(Command::Blur).await
    }

    /// The most recently published session view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// A receiver notified on every published session view.
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Wait until the published view satisfies `predicate`.
    ///
    /// Checks the current view first.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<SessionView, ControllerError>
    where
        F: FnMut(&SessionView) -> bool,
    {
        let mut rx = self.view.clone();
        let view = rx
            .wait_for(|view| predicate(view))
            .await
            .map_err(|_closed| ControllerError::Stopped)?;
        Ok(view.clone())
    }

    /// Subscribe to controller diagnostics from this point on.
    pub fn diagnostics(&self) -> broadcast::Receiver<Diagnostic> {
        self.diagnostics.subscribe()
    }

    /// Whether the controller task is still running.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Stop the controller and wait until it has released its channel
    /// subscription. Calling it on a stopped controller returns at once.
    pub async fn shutdown(&self) {
        if self.commands.send(Command::Shutdown).await.is_err() {
            debug!("shutdown requested for a stopped age controller");
        }
        self.stopped().await;
    }

    /// Wait until the controller task has finished.
    pub async fn stopped(&self) {
        let mut rx = self.view.clone();
        while rx.changed().await.is_ok() {}
    }

    async fn send(&self, command: Command) -> Result<(), ControllerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_closed| ControllerError::Stopped)
    }
}

/// The controller task's state.
pub struct AgeController<S> {
    store: Arc<S>,
    gate: WriteGate,
    timer: DebounceTimer,
    write_timeout: Option<Duration>,
    bucket: DisplayBucket,
    user_name: String,
    typing: bool,
    cooldown: bool,
    window: u64,
    writes_in_flight: u32,
    view_tx: watch::Sender<SessionView>,
    diagnostics: broadcast::Sender<Diagnostic>,
    completions_tx: mpsc::UnboundedSender<WriteCompletion>,
}

impl<S: ReadingStore> AgeController<S> {
    /// Subscribe to `channel` and start the controller on the current Tokio
    /// runtime.
    ///
    /// The subscription is taken before this returns, so events published
    /// afterwards are never missed.
    pub fn spawn(
        channel: &AgeEventChannel,
        store: Arc<S>,
        config: ControllerConfig,
    ) -> ControllerHandle {
        let events = channel.subscribe();
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (diagnostics, _) = broadcast::channel(DIAGNOSTIC_CAPACITY);
        let (view_tx, view_rx) = watch::channel(SessionView::default());

        let controller = Self {
            store,
            gate: WriteGate::new(config.gate),
            timer: DebounceTimer::new(config.debounce_delay),
            write_timeout: config.write_timeout,
            bucket: DisplayBucket::IDLE,
            user_name: String::new(),
            typing: false,
            cooldown: false,
            window: 0,
            writes_in_flight: 0,
            view_tx,
            diagnostics: diagnostics.clone(),
            completions_tx,
        };

        info!(
            channel = channel.name(),
            store = controller.store.backend(),
            identity_required = config.gate.identity_required,
            cooldown_enabled = config.gate.cooldown_enabled,
            debounce_ms = u64::try_from(config.debounce_delay.as_millis()).unwrap_or(u64::MAX),
            "age controller started"
        );

        tokio::spawn(controller.run(events, commands_rx, completions_rx));

        ControllerHandle {
            commands: commands_tx,
            view: view_rx,
            diagnostics,
        }
    }

    async fn run(
        mut self,
        mut events: AgeEventSubscription,
        mut commands: mpsc::Receiver<Command>,
        mut completions: mpsc::UnboundedReceiver<WriteCompletion>,
    ) {
        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::EditName(name)) => self.on_edit_name(&name),
                    Some(Command::Focus) => self.on_typing(true),
                    Some(Command::Blur) => self.on_typing(false),
                    Some(Command::Shutdown) => {
                        info!("age controller shutdown requested");
                        break;
                    }
                    None => {
                        info!("all controller handles dropped");
                        break;
                    }
                },

                Some(completion) = completions.recv() => self.on_write_complete(completion),

                () = self.timer.wait() => self.on_expiry(),

                event = events.next() => {
                    if let Some(event) = event {
                        self.on_event(&event);
                    } else {
                        info!(channel = events.channel(), "age event channel closed");
                        break;
                    }
                }
            }
        }

        // Release the listener and close the command queue before the view
        // sender (inside `self`) is dropped, so anyone awaiting `stopped()`
        // sees both gone.
        drop(events);
        drop(commands);
        self.timer.cancel();
        info!(
            writes_in_flight = self.writes_in_flight,
            "age controller stopped"
        );
    }

    fn on_event(&mut self, event: &AgeEvent) {
        let inputs = GateInputs {
            user_name: &self.user_name,
            typing: self.typing,
            cooldown: self.cooldown,
        };
        match self.gate.evaluate(event, &inputs) {
            GateDecision::Reject(reason) => {
                warn!(
                    reason = %reason,
                    numeric_age = ?event.numeric_age,
                    "age event rejected"
                );
                self.emit(Diagnostic::Rejected {
                    reason,
                    numeric_age: event.numeric_age,
                });
            }
            GateDecision::Accept(admission) => self.accept(admission),
        }
    }

    fn accept(&mut self, admission: Admission) {
        let malformed = admission.raw_age.is_none();
        self.bucket = bucket(admission.raw_age);
        self.timer.rearm();

        let reading = NewReading::new(admission.user_name, self.bucket.value);
        if malformed {
            warn!(reading_id = %reading.id, "age event carried no usable age, displaying 0");
        }
        info!(
            reading_id = %reading.id,
            age = self.bucket.value,
            lower = self.bucket.lower,
            upper = self.bucket.upper,
            user_name = reading.user_name.as_deref().unwrap_or(""),
            "age event accepted"
        );

        self.emit(Diagnostic::Accepted {
            bucket: self.bucket,
            reading: reading.clone(),
            malformed,
        });
        self.start_write(reading);
        self.publish_view();
    }

    fn start_write(&mut self, reading: NewReading) {
        let ticket = WriteTicket {
            reading_id: reading.id,
            window: self.window,
        };
        self.writes_in_flight = self.writes_in_flight.saturating_add(1);

        let store = Arc::clone(&self.store);
        let completions = self.completions_tx.clone();
        let limit = self.write_timeout;
        tokio::spawn(async move {
            let result = match limit {
                Some(limit) => tokio::time::timeout(limit, store.append(reading))
                    .await
                    .unwrap_or_else(|_elapsed| {
                        Err(StoreError::Timeout {
                            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        })
                    }),
                None => store.append(reading).await,
            };
            if completions.send(WriteCompletion { ticket, result }).is_err() {
                debug!(
                    reading_id = %ticket.reading_id,
                    "write finished after controller teardown, ignoring"
                );
            }
        });
    }

    fn on_write_complete(&mut self, completion: WriteCompletion) {
        let WriteCompletion { ticket, result } = completion;
        self.writes_in_flight = self.writes_in_flight.saturating_sub(1);

        if ticket.window != self.window {
            match &result {
                Ok(ack) => info!(
                    reading_id = %ack.id,
                    issued_window = ticket.window,
                    current_window = self.window,
                    "reading stored after its window expired"
                ),
                Err(e) => error!(
                    reading_id = %ticket.reading_id,
                    issued_window = ticket.window,
                    current_window = self.window,
                    error = %e,
                    "failed to store age reading from an expired window"
                ),
            }
            self.emit(Diagnostic::StaleCompletion {
                reading_id: ticket.reading_id,
                issued_window: ticket.window,
                current_window: self.window,
                committed: result.is_ok(),
            });
            self.publish_view();
            return;
        }

        match result {
            Ok(ack) => {
                info!(
                    reading_id = %ack.id,
                    timestamp = %ack.timestamp,
                    "age reading stored"
                );
                if self.gate.config().cooldown_enabled {
                    self.cooldown = true;
                }
                self.timer.rearm();
                self.emit(Diagnostic::WriteSucceeded { ack });
            }
            Err(e) => {
                error!(
                    reading_id = %ticket.reading_id,
                    error = %e,
                    "failed to store age reading"
                );
                self.emit(Diagnostic::WriteFailed {
                    reading_id: ticket.reading_id,
                    error: e,
                });
            }
        }
        self.publish_view();
    }

    fn on_expiry(&mut self) {
        if !self.timer.fire() {
            return;
        }
        self.window = self.window.saturating_add(1);
        self.bucket = DisplayBucket::IDLE;
        self.cooldown = false;
        if self.gate.config().reset_typing_on_expiry {
            self.typing = false;
        }
        info!(window = self.window, "debounce window expired, display reset");
        self.emit(Diagnostic::Expired {
            window: self.window,
        });
        self.publish_view();
    }

    fn on_edit_name(&mut self, name: &str) {
        name.trim().clone_into(&mut self.user_name);
        self.typing = true;
        debug!(user_name = %self.user_name, "identity label edited");
        self.publish_view();
    }

    fn on_typing(&mut self, typing: bool) {
        self.typing = typing;
        debug!(typing, "identity field focus changed");
        self.publish_view();
    }

    fn emit(&self, diagnostic: Diagnostic) {
        let kind = diagnostic.kind();
        // No subscribers is normal.
        let receivers = self.diagnostics.send(diagnostic).unwrap_or(0);
        debug!(kind, receivers, "controller diagnostic published");
    }

    fn publish_view(&self) {
        self.view_tx.send_replace(self.snapshot());
    }

    fn snapshot(&self) -> SessionView {
        SessionView {
            bucket: self.bucket,
            user_name: self.user_name.clone(),
            typing: self.typing,
            cooldown: self.cooldown,
            timer_armed: self.timer.is_armed(),
            writes_in_flight: self.writes_in_flight,
            window: self.window,
        }
    }
}

impl<S> std::fmt::Debug for AgeController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgeController")
            .field("bucket", &self.bucket)
            .field("user_name", &self.user_name)
            .field("typing", &self.typing)
            .field("cooldown", &self.cooldown)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
