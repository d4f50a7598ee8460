use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{ConnectionId, Transport, TransportEvent};
use crate::error::TransportError;
use crate::protocol::close::ABNORMAL_CLOSURE;

enum Outbound {
    Frame(String),
    Close { code: u16, reason: String },
}

struct Connection {
    conn: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
    open: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// WebSocket transport backed by tokio-tungstenite
///
/// Each `open()` spawns one socket task. The task owns the socket and reports
/// everything that happens on it through the shared event channel; the engine
/// talks back to it through an unbounded outbound channel so `send` never
/// awaits. Must be used from inside a tokio runtime.
pub struct WebSocketTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    current: Option<Connection>,
}

impl WebSocketTransport {
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            events,
            current: None,
        }
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, conn: ConnectionId, url: &str) -> Result<(), TransportError> {
        if let Some(previous) = self.current.take() {
            debug!("Dropping connection {} before opening {}", previous.conn, conn);
            previous.open.store(false, Ordering::SeqCst);
            previous.task.abort();
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_connection(
            conn,
            url.to_string(),
            outbound_rx,
            Arc::clone(&open),
            self.events.clone(),
        ));

        self.current = Some(Connection {
            conn,
            outbound: outbound_tx,
            open,
            task,
        });

        Ok(())
    }

    fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let connection = self.current.as_ref().ok_or(TransportError::NotOpen)?;
        if !connection.open.load(Ordering::SeqCst) {
            return Err(TransportError::NotOpen);
        }

        connection
            .outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::ChannelClosed)
    }

    fn close(&mut self, code: u16, reason: &str) {
        if let Some(connection) = self.current.take() {
            connection.open.store(false, Ordering::SeqCst);
            // The socket task sends the close frame and exits on its own
            let _ = connection.outbound.send(Outbound::Close {
                code,
                reason: reason.to_string(),
            });
        }
    }

    fn is_open(&self) -> bool {
        self.current
            .as_ref()
            .map(|c| c.open.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

async fn run_connection(
    conn: ConnectionId,
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    open: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    info!("Connecting to {} (connection {})", url, conn);

    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(e) => {
            warn!("Connection {} failed: {}", conn, e);
            let _ = events.send(TransportEvent::Error {
                conn,
                message: e.to_string(),
            });
            return;
        }
    };

    open.store(true, Ordering::SeqCst);
    let _ = events.send(TransportEvent::Opened { conn });

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        open.store(false, Ordering::SeqCst);
                        let _ = events.send(TransportEvent::Error {
                            conn,
                            message: e.to_string(),
                        });
                        break;
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    open.store(false, Ordering::SeqCst);
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                        debug!("Close frame on connection {} not delivered: {}", conn, e);
                    }
                    break;
                }
                None => {
                    // Transport dropped this connection
                    open.store(false, Ordering::SeqCst);
                    let _ = sink.close().await;
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Message { conn, text });
                }
                Some(Ok(Message::Close(frame))) => {
                    open.store(false, Ordering::SeqCst);
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    let _ = events.send(TransportEvent::Closed { conn, code, reason });
                    break;
                }
                Some(Ok(_)) => {
                    // Control frames are answered by tungstenite; binary is not part of the protocol
                }
                Some(Err(e)) => {
                    open.store(false, Ordering::SeqCst);
                    let _ = events.send(TransportEvent::Error {
                        conn,
                        message: e.to_string(),
                    });
                    break;
                }
                None => {
                    open.store(false, Ordering::SeqCst);
                    let _ = events.send(TransportEvent::Closed {
                        conn,
                        code: ABNORMAL_CLOSURE,
                        reason: "connection dropped".to_string(),
                    });
                    break;
                }
            }
        }
    }

    debug!("Connection {} task finished", conn);
}
