use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast::{Receiver, error::RecvError};

use crate::{
    error::AppError,
    services::grid::PixelId,
    types::{Address, Color, Owner},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerMode {
    Remote,
    Simulated,
}

/// Whether a read came from the ledger or was substituted locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoSource {
    Ledger,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelInfo {
    pub owner: Owner,
    pub color: Color,
    pub source: InfoSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PixelClaimed,
    PixelColorChanged,
    PixelTransferred,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::PixelClaimed,
        EventKind::PixelColorChanged,
        EventKind::PixelTransferred,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LedgerEvent {
    PixelClaimed {
        owner: Address,
        pixel_id: PixelId,
        x: u32,
        y: u32,
    },
    PixelColorChanged {
        pixel_id: PixelId,
        color: Color,
    },
    PixelTransferred {
        from: Address,
        to: Address,
        pixel_id: PixelId,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PixelClaimed { .. } => EventKind::PixelClaimed,
            Self::PixelColorChanged { .. } => EventKind::PixelColorChanged,
            Self::PixelTransferred { .. } => EventKind::PixelTransferred,
        }
    }

    pub fn pixel_id(&self) -> PixelId {
        match self {
            Self::PixelClaimed { pixel_id, .. }
            | Self::PixelColorChanged { pixel_id, .. }
            | Self::PixelTransferred { pixel_id, .. } => *pixel_id,
        }
    }
}

/// Live feed of ledger events filtered to the requested kinds.
///
/// An inert subscription never delivers; dropping or closing a subscription
/// unsubscribes it.
pub struct EventSubscription {
    receiver: Option<Receiver<LedgerEvent>>,
    kinds: Vec<EventKind>,
}

impl EventSubscription {
    pub fn new(receiver: Receiver<LedgerEvent>, kinds: &[EventKind]) -> Self {
        Self {
            receiver: Some(receiver),
            kinds: kinds.to_vec(),
        }
    }

    pub fn inert() -> Self {
        Self {
            receiver: None,
            kinds: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    /// Next matching event, or `None` once the feed is closed or inert.
    pub async fn recv(&mut self) -> Option<LedgerEvent> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(event) if self.kinds.contains(&event.kind()) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Ledger event subscription lagged");
                }
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    pub fn close(&mut self) {
        self.receiver = None;
    }
}

/// Failure reported by a concrete ledger binding. Never leaves the gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("signer rejected the request - {0}")]
    Rejected(String),

    #[error("ledger call failed - {0}")]
    Rpc(String),

    #[error("ledger call timed out")]
    Timeout,

    #[error("ledger unavailable")]
    Unavailable,
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

impl From<TransportError> for AppError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Rejected(msg) => AppError::TransactionRejected(msg),
            other => AppError::TransactionRejected(other.to_string()),
        }
    }
}
