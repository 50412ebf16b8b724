use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::{Mutex, mpsc};

use crate::moderation::{CommunityEvent, Inbound};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngressErrorKind {
    Closed,
    QueueClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressError {
    pub kind: IngressErrorKind,
    pub message: String,
}

impl IngressError {
    fn closed() -> Self {
        Self {
            kind: IngressErrorKind::Closed,
            message: "event ingress gate is closed".to_string(),
        }
    }

    fn queue_closed() -> Self {
        Self {
            kind: IngressErrorKind::QueueClosed,
            message: "event queue receiver is closed".to_string(),
        }
    }
}

impl fmt::Display for IngressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IngressError {}

/// Shared entry point for community events. Once the gate closes, no further
/// events are accepted and a single shutdown marker is queued behind the ones
/// already admitted.
#[derive(Clone)]
pub struct EventIngress {
    gate_open: Arc<AtomicBool>,
    send_lock: Arc<Mutex<()>>,
    tx: mpsc::Sender<Inbound>,
}

impl EventIngress {
    pub fn new(tx: mpsc::Sender<Inbound>) -> Self {
        Self {
            gate_open: Arc::new(AtomicBool::new(true)),
            send_lock: Arc::new(Mutex::new(())),
            tx,
        }
    }

    pub fn is_open(&self) -> bool {
        self.gate_open.load(Ordering::Acquire)
    }

    pub async fn send(&self, event: CommunityEvent) -> Result<(), IngressError> {
        let _guard = self.send_lock.lock().await;
        if !self.gate_open.load(Ordering::Acquire) {
            return Err(IngressError::closed());
        }
        self.tx
            .send(Inbound::Event(event))
            .await
            .map_err(|_| IngressError::queue_closed())
    }

    /// Closes the gate and enqueues the shutdown marker. Repeated calls are no-ops.
    pub async fn shutdown(&self) -> Result<(), IngressError> {
        let _guard = self.send_lock.lock().await;
        if !self.gate_open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.tx
            .send(Inbound::Shutdown)
            .await
            .map_err(|_| IngressError::queue_closed())
    }
}
