use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::protocol::{DetectionMessage, Overlay, RecognizedStudent};
use crate::camera::{CameraError, FrameSource};
use crate::config::Config;
use crate::store::DomainStore;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("camera access denied or unavailable: {0}")]
    Camera(#[from] CameraError),

    #[error("could not connect to detection server: {0}")]
    Connection(String),

    #[error("live detection is already running")]
    AlreadyStreaming,

    #[error("malformed detection message: {0}")]
    Protocol(String),

    #[error("live detection was stopped before it started")]
    Cancelled,
}

impl StreamError {
    /// Text of the Warning event raised for a failed start.
    fn warning(&self) -> String {
        match self {
            StreamError::Camera(e) => format!("Camera access denied or unavailable: {e}"),
            StreamError::Connection(e) => format!("Could not connect to detection server: {e}"),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub url: String,
    pub frame_interval: Duration,
    /// Bound on the WebSocket handshake.
    pub connect_timeout: Duration,
}

impl StreamConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.stream_url(),
            frame_interval: config.frame_interval(),
            connect_timeout: config.request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamPhase {
    #[default]
    Idle,
    Starting,
    Streaming,
    Stopping,
}

/// What the live view renders. Reset to `Default` on every stop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveStatus {
    pub phase: StreamPhase,
    pub smoking_detected: bool,
    pub face_detected: bool,
    pub identified: Vec<RecognizedStudent>,
    /// 0..=100
    pub confidence: u8,
    pub overlay: Overlay,
    /// Last frame sent, as a data URL.
    pub frame: Option<String>,
    pub frame_size: Option<(u32, u32)>,
    pub screenshot: Option<String>,
    pub detection_type: Option<String>,
    pub face_recognition_enabled: Option<bool>,
    pub frames_sent: u64,
    pub messages_received: u64,
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Started { source: String },
    Violation { names: Vec<String>, confidence: u8 },
    Warning(String),
    Stopped,
}

/// Identifies one streaming session. Messages carrying an older ticket
/// are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTicket(u64);

struct Shared {
    status: watch::Sender<LiveStatus>,
    events: broadcast::Sender<StreamEvent>,
    ticket: AtomicU64,
    alerts_enabled: AtomicBool,
    store: DomainStore,
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// The slot a controller holds its session in. A start reserves it before
/// touching the camera so `stop` can cancel the handshake.
enum Session {
    Starting(CancellationToken),
    Running(Worker),
}

impl Session {
    fn is_active(&self) -> bool {
        match self {
            Session::Starting(cancel) => !cancel.is_cancelled(),
            Session::Running(w) => !w.cancel.is_cancelled() && !w.handle.is_finished(),
        }
    }

    fn cancel(&self) {
        match self {
            Session::Starting(cancel) => cancel.cancel(),
            Session::Running(w) => w.cancel.cancel(),
        }
    }
}

/// Owns the camera, the detect socket and the frame timer for at most one
/// session at a time.
pub struct DetectionController {
    config: StreamConfig,
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

impl DetectionController {
    pub fn new(config: StreamConfig, store: DomainStore) -> Self {
        let (status, _) = watch::channel(LiveStatus::default());
        let (events, _) = broadcast::channel(32);
        Self {
            config,
            shared: Arc::new(Shared {
                status,
                events,
                ticket: AtomicU64::new(0),
                alerts_enabled: AtomicBool::new(true),
                store,
            }),
            session: Mutex::new(None),
        }
    }

    pub fn status(&self) -> LiveStatus {
        self.shared.status.borrow().clone()
    }

    pub fn phase(&self) -> StreamPhase {
        self.shared.status.borrow().phase
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveStatus> {
        self.shared.status.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<StreamEvent> {
        self.shared.events.subscribe()
    }

    pub fn alerts_enabled(&self) -> bool {
        self.shared.alerts_enabled.load(Ordering::Relaxed)
    }

    pub fn set_alerts_enabled(&self, enabled: bool) {
        self.shared.alerts_enabled.store(enabled, Ordering::Relaxed);
        debug!(enabled, "alerts toggled");
    }

    /// Open the camera, connect the socket and start pushing frames.
    /// On failure everything acquired is released and the phase is Idle.
    /// A `stop` issued meanwhile makes this return `Cancelled`.
    pub async fn start(&self, mut camera: Box<dyn FrameSource>) -> Result<StreamTicket, StreamError> {
        let cancel = CancellationToken::new();
        let ticket = {
            let mut session = self.session.lock().await;
            if session.as_ref().is_some_and(Session::is_active) {
                return Err(StreamError::AlreadyStreaming);
            }
            *session = Some(Session::Starting(cancel.clone()));
            self.shared.set_phase(StreamPhase::Starting);
            StreamTicket(self.shared.ticket.fetch_add(1, Ordering::SeqCst) + 1)
        };
        // Cancels the reservation if this future is dropped part-way.
        let reservation = cancel.clone().drop_guard();

        let source = camera.describe();
        info!(%source, url = %self.config.url, "starting live detection");

        let opened = tokio::select! {
            _ = cancel.cancelled() => Err(StreamError::Cancelled),
            res = self.open_session(camera.as_mut()) => res,
        };
        let mut socket = match opened {
            Ok(socket) => socket,
            Err(e) => {
                camera.release().await;
                if matches!(e, StreamError::Cancelled) {
                    debug!(ticket = ticket.0, "start cancelled");
                } else if self.shared.is_current(ticket) {
                    self.shared.fail(&e.warning());
                }
                return Err(e);
            }
        };

        let mut session = self.session.lock().await;
        if cancel.is_cancelled() || !self.shared.is_current(ticket) {
            drop(session);
            debug!(ticket = ticket.0, "start cancelled after connecting");
            if let Err(e) = socket.close(None).await {
                debug!(error = %e, "closing detect socket");
            }
            camera.release().await;
            return Err(StreamError::Cancelled);
        }
        let _ = reservation.disarm();

        self.shared.status.send_modify(|s| {
            *s = LiveStatus {
                phase: StreamPhase::Streaming,
                ..LiveStatus::default()
            }
        });
        let _ = self.shared.events.send(StreamEvent::Started { source });

        let handle = tokio::spawn(run_stream(
            self.shared.clone(),
            ticket,
            socket,
            camera,
            self.config.frame_interval,
            cancel.clone(),
        ));
        *session = Some(Session::Running(Worker { cancel, handle }));
        Ok(ticket)
    }

    async fn open_session(&self, camera: &mut dyn FrameSource) -> Result<Socket, StreamError> {
        camera.open().await?;
        let limit = self.config.connect_timeout;
        match tokio::time::timeout(limit, connect_async(self.config.url.as_str())).await {
            Ok(Ok((socket, _))) => Ok(socket),
            Ok(Err(e)) => Err(StreamError::Connection(e.to_string())),
            Err(_) => Err(StreamError::Connection(format!(
                "no handshake within {}s",
                limit.as_secs_f32()
            ))),
        }
    }

    /// Stop streaming and reset the status. Safe to call at any time,
    /// including while `start` is still connecting.
    pub async fn stop(&self) {
        let mut slot = self.session.lock().await;
        self.shared.ticket.fetch_add(1, Ordering::SeqCst);

        let session = slot.take();
        let was_active =
            self.phase() != StreamPhase::Idle || session.as_ref().is_some_and(Session::is_active);
        if was_active {
            self.shared.set_phase(StreamPhase::Stopping);
        }
        match session {
            Some(Session::Running(w)) => {
                w.cancel.cancel();
                if let Err(e) = w.handle.await {
                    warn!(error = %e, "stream worker ended abnormally");
                }
            }
            Some(pending) => pending.cancel(),
            None => {}
        }
        self.shared.status.send_replace(LiveStatus::default());
        if was_active {
            info!("live detection stopped");
            let _ = self.shared.events.send(StreamEvent::Stopped);
        }
    }

    /// Apply one inbound payload as if it arrived on the socket for
    /// `ticket`. Returns whether it changed anything.
    pub fn deliver(&self, ticket: StreamTicket, payload: &str) -> bool {
        self.shared.deliver(ticket, payload)
    }
}

impl Drop for DetectionController {
    fn drop(&mut self) {
        self.shared.ticket.fetch_add(1, Ordering::SeqCst);
        if let Some(session) = self.session.get_mut().take() {
            // The worker releases the camera and closes the socket on its way out.
            session.cancel();
        }
        self.shared.status.send_replace(LiveStatus::default());
    }
}

impl Shared {
    fn is_current(&self, ticket: StreamTicket) -> bool {
        self.ticket.load(Ordering::SeqCst) == ticket.0
    }

    fn set_phase(&self, phase: StreamPhase) {
        self.status.send_if_modified(|s| {
            let changed = s.phase != phase;
            s.phase = phase;
            changed
        });
    }

    fn fail(&self, reason: &str) {
        warn!(reason, "live detection failed");
        self.status.send_replace(LiveStatus::default());
        let _ = self.events.send(StreamEvent::Warning(reason.to_string()));
    }

    fn deliver(&self, ticket: StreamTicket, payload: &str) -> bool {
        let msg = match decode(payload) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, "ignoring detection message");
                return false;
            }
        };
        if let Some(err) = &msg.error {
            debug!(error = %err, "backend could not process frame");
        }

        let applied = self.status.send_if_modified(|s| {
            if !self.is_current(ticket) || s.phase != StreamPhase::Streaming {
                return false;
            }
            s.smoking_detected = msg.has_violation();
            s.face_detected = msg.face_detected();
            s.identified = msg.identified_students().into_iter().cloned().collect();
            s.confidence = msg.confidence_pct();
            s.overlay = Overlay::from_detections(&msg.detections);
            s.screenshot = msg.evidence().map(str::to_string);
            s.detection_type = msg.detection_type.clone();
            s.face_recognition_enabled = msg.face_recognition_enabled;
            s.messages_received += 1;
            s.last_message_at = Some(Utc::now());
            true
        });
        if !applied {
            trace!(ticket = ticket.0, "dropped stale detection message");
            return false;
        }

        let alerts = self.alerts_enabled.load(Ordering::Relaxed);
        let records = msg.violation_records(alerts);
        if records.is_empty() {
            return true;
        }
        let names: Vec<String> = records.iter().map(|r| r.name.clone()).collect();
        info!(people = ?names, confidence = msg.confidence_pct(), "smoking violation detected");
        if alerts {
            let _ = self.events.send(StreamEvent::Violation {
                names,
                confidence: msg.confidence_pct(),
            });
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, count = records.len(), "no async runtime, violation not logged");
                return true;
            }
        };
        for record in records {
            let store = self.store.clone();
            runtime.spawn(async move {
                if let Err(e) = store.add_detection(record).await {
                    warn!(error = %e, "failed to log violation");
                }
            });
        }
        true
    }
}

fn decode(payload: &str) -> Result<DetectionMessage, StreamError> {
    DetectionMessage::parse(payload).map_err(|e| StreamError::Protocol(e.to_string()))
}

async fn run_stream(
    shared: Arc<Shared>,
    ticket: StreamTicket,
    socket: Socket,
    mut camera: Box<dyn FrameSource>,
    frame_interval: Duration,
    cancel: CancellationToken,
) {
    let (mut outbound, mut inbound) = socket.split();
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut seq: u64 = 0;

    let failure = loop {
        tokio::select! {
            _ = cancel.cancelled() => break None,

            _ = ticker.tick() => match camera.capture().await {
                Ok(Some(frame)) => {
                    seq += 1;
                    let data_url = frame.to_data_url();
                    trace!(seq, bytes = frame.bytes.len(), "sending frame");
                    if let Err(e) = outbound.send(Message::Text(data_url.clone())).await {
                        break Some(format!("Connection to detection server lost: {e}"));
                    }
                    shared.status.send_if_modified(|s| {
                        if !shared.is_current(ticket) {
                            return false;
                        }
                        s.frame = Some(data_url);
                        s.frame_size = Some((frame.width, frame.height));
                        s.frames_sent = seq;
                        true
                    });
                }
                Ok(None) => {}
                Err(e) => break Some(format!("Camera stopped delivering frames: {e}")),
            },

            msg = inbound.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    shared.deliver(ticket, &text);
                }
                Some(Ok(Message::Close(_))) | None => {
                    break Some("Detection server closed the connection".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break Some(format!("Connection to detection server lost: {e}")),
            },
        }
    };

    if let Err(e) = outbound.close().await {
        debug!(error = %e, "closing detect socket");
    }
    camera.release().await;
    debug!(frames = seq, "stream worker finished");

    if let Some(reason) = failure {
        // Marks the session inactive before anyone sees Stopped.
        cancel.cancel();
        if shared.is_current(ticket) {
            shared.fail(&reason);
            let _ = shared.events.send(StreamEvent::Stopped);
        }
    }
}
