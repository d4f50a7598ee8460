//! Event loop driving the transport client
//!
//! One tokio task owns the [`TransportClient`] and the [`AudioPipeline`] and
//! selects over transport events, capture chunks, control commands and the
//! next timer deadline. Nothing else touches engine state; other tasks go
//! through a cloneable [`EngineHandle`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::audio::AudioChunk;
use crate::engine::{
    ChannelObserver, ClientConfig, ClientSnapshot, Clock, ConnectionState, Notification,
    ReconnectionPolicy, StopOutcome, TransportClient,
};
use crate::error::EngineError;
use crate::pipeline::AudioPipeline;
use crate::transport::{Transport, TransportEvent};

const COMMAND_CAPACITY: usize = 32;
const NOTIFICATION_CAPACITY: usize = 256;

enum Command {
    StartRecording(oneshot::Sender<Result<String, EngineError>>),
    StopRecording(oneshot::Sender<StopOutcome>),
    ForceReconnect,
    Disconnect,
    Shutdown,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Start a fresh session after every successful connect
    pub auto_start: bool,
}

/// Cloneable control surface of a running engine
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<ClientSnapshot>,
    notifications: broadcast::Sender<Notification>,
}

impl EngineHandle {
    pub async fn start_recording(&self) -> Result<String, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::StartRecording(tx)).await?;
        rx.await.map_err(|_| EngineError::RuntimeStopped)?
    }

    pub async fn stop_recording(&self) -> Result<StopOutcome, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::StopRecording(tx)).await?;
        rx.await.map_err(|_| EngineError::RuntimeStopped)
    }

    pub async fn force_reconnect(&self) -> Result<(), EngineError> {
        self.send(Command::ForceReconnect).await
    }

    pub async fn disconnect(&self) -> Result<(), EngineError> {
        self.send(Command::Disconnect).await
    }

    /// Disconnect and end the event loop
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.send(Command::Shutdown).await
    }

    /// Latest published client snapshot
    pub fn snapshot(&self) -> ClientSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ClientSnapshot> {
        self.snapshot.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::RuntimeStopped)
    }
}

/// Single-task owner of the engine
pub struct EngineRuntime {
    client: TransportClient,
    pipeline: AudioPipeline,
    clock: Arc<dyn Clock>,
    transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    notifications: mpsc::UnboundedReceiver<Notification>,
    commands: mpsc::Receiver<Command>,
    snapshot: watch::Sender<ClientSnapshot>,
    broadcast: broadcast::Sender<Notification>,
    options: RuntimeOptions,
}

impl EngineRuntime {
    pub fn new(
        config: ClientConfig,
        transport: Box<dyn Transport>,
        transport_events: mpsc::UnboundedReceiver<TransportEvent>,
        clock: Arc<dyn Clock>,
        policy: Box<dyn ReconnectionPolicy>,
        pipeline: AudioPipeline,
        options: RuntimeOptions,
    ) -> (Self, EngineHandle) {
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let client = TransportClient::new(
            config,
            transport,
            Arc::clone(&clock),
            policy,
            Box::new(ChannelObserver::new(notify_tx)),
        );

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(client.snapshot());
        let (broadcast_tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let handle = EngineHandle {
            commands: command_tx,
            snapshot: snapshot_rx,
            notifications: broadcast_tx.clone(),
        };

        let runtime = Self {
            client,
            pipeline,
            clock,
            transport_events,
            notifications: notify_rx,
            commands: command_rx,
            snapshot: snapshot_tx,
            broadcast: broadcast_tx,
            options,
        };

        (runtime, handle)
    }

    /// Connect and run until shutdown, or until `capture` ends
    ///
    /// When the capture stream closes, the active session is stopped and the
    /// client disconnects normally before returning.
    pub async fn run(mut self, mut capture: Option<mpsc::Receiver<AudioChunk>>) -> Result<()> {
        info!(
            "Engine starting (auto start: {}, capture: {})",
            self.options.auto_start,
            capture.is_some()
        );
        self.client.connect();
        self.publish();

        loop {
            let wait = self
                .client
                .next_timer_deadline()
                .map(|deadline| deadline.saturating_sub(self.clock.now_ms()));

            tokio::select! {
                Some(event) = self.transport_events.recv() => {
                    self.client.handle_transport_event(event);
                }
                chunk = next_chunk(&mut capture), if capture.is_some() => match chunk {
                    Some(chunk) => self.on_chunk(chunk),
                    None => {
                        info!("Capture stream ended, closing session");
                        self.client.stop_recording();
                        self.client.disconnect();
                        self.publish();
                        break;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => {
                        info!("Engine shutting down");
                        self.client.disconnect();
                        self.publish();
                        break;
                    }
                    Some(command) => self.on_command(command),
                },
                _ = sleep_for(wait) => {
                    self.client.poll_timers();
                }
            }

            self.publish();
        }

        Ok(())
    }

    fn on_chunk(&mut self, chunk: AudioChunk) {
        let Some(payload) = self.pipeline.push(&chunk) else {
            return;
        };

        if !self.client.is_recording() {
            debug!("Window {} dropped: no active session", payload.sequence);
            return;
        }
        if let Err(e) = self.client.send_audio_data(payload) {
            debug!("Window not sent: {}", e);
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::StartRecording(reply) => {
                let result = self.start_session();
                let _ = reply.send(result);
            }
            Command::StopRecording(reply) => {
                let _ = reply.send(self.client.stop_recording());
            }
            Command::ForceReconnect => self.client.force_reconnect(),
            Command::Disconnect => self.client.disconnect(),
            Command::Shutdown => {}
        }
    }

    fn start_session(&mut self) -> Result<String, EngineError> {
        let session_id = self.client.start_recording()?;
        self.pipeline.reset();
        Ok(session_id)
    }

    /// Fan out pending notifications and refresh the snapshot
    fn publish(&mut self) {
        while let Ok(notification) = self.notifications.try_recv() {
            if notification == Notification::Connected && self.options.auto_start {
                match self.start_session() {
                    Ok(session_id) => info!("Auto-started session {}", session_id),
                    Err(e) => warn!("Auto-start failed: {}", e),
                }
            }
            if let Notification::ConnectionStateChanged(ConnectionState::Failed) = notification {
                warn!("Engine gave up reconnecting; waiting for a forced reconnect");
            }
            // No subscribers is fine
            let _ = self.broadcast.send(notification);
        }

        self.snapshot.send_replace(self.client.snapshot());
    }
}

async fn next_chunk(capture: &mut Option<mpsc::Receiver<AudioChunk>>) -> Option<AudioChunk> {
    match capture {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_for(wait_ms: Option<u64>) {
    match wait_ms {
        Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        None => std::future::pending().await,
    }
}
