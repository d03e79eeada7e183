use serde::Serialize;
use thiserror::Error;

pub mod types;

pub use types::ErrorNotice;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error - {0}")]
    Validation(String),

    #[error("Precondition failed - {0}")]
    PreconditionFailed(String),

    #[error("Not authorized - {0}")]
    Authorization(String),

    #[error("Transaction rejected - {0}")]
    TransactionRejected(String),

    /// Ledger read failure. Never surfaced: the gateway logs it and
    /// substitutes fallback data.
    #[error("Transport failure - {0}")]
    TransportFailure(String),

    #[error("Wallet connection failed - {0}")]
    ConnectionFailed(String),

    #[error("Invalid params - {0}")]
    InvalidParams(String),

    #[error("Serialization error - {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error - {0}")]
    IoError(#[from] std::io::Error),

    #[error("PNG encoding error - {0}")]
    PngError(String),

    #[error("TryInitError - {0}")]
    TryInitError(#[from] tracing_subscriber::util::TryInitError),
}

/// Machine-readable classification used by the error banner and by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    PreconditionFailed,
    Authorization,
    TransactionRejected,
    Transport,
    Connection,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::TransactionRejected(_) => ErrorKind::TransactionRejected,
            Self::TransportFailure(_) => ErrorKind::Transport,
            Self::ConnectionFailed(_) => ErrorKind::Connection,
            Self::InvalidParams(_)
            | Self::SerializationError(_)
            | Self::IoError(_)
            | Self::PngError(_)
            | Self::TryInitError(_) => ErrorKind::Internal,
        }
    }

    /// Stable banner code. The thousands digit groups codes by [`ErrorKind`]
    /// so callers can branch on the number alone.
    pub fn code(&self) -> i32 {
        match self {
            Self::Validation(_) => 1001,
            Self::PreconditionFailed(_) => 2001,
            Self::Authorization(_) => 3001,
            Self::TransactionRejected(_) => 4001,
            Self::TransportFailure(_) => 5001,
            Self::ConnectionFailed(_) => 6001,
            Self::SerializationError(_) => 9001,
            Self::IoError(_) => 9002,
            Self::PngError(_) => 9003,
            Self::TryInitError(_) => 9004,
            Self::InvalidParams(_) => 9005,
        }
    }

    /// Message shown in the error banner. Internal failures are logged and
    /// replaced with a generic message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::PreconditionFailed(msg)
            | Self::Authorization(msg)
            | Self::ConnectionFailed(msg)
            | Self::InvalidParams(msg) => msg.clone(),
            Self::TransactionRejected(msg) => {
                tracing::error!(error = %msg, "Transaction rejected");
                format!("Transaction rejected: {msg}")
            }
            Self::TransportFailure(error) => {
                tracing::error!(error = %error, "Ledger transport failure");
                "Network error reaching the ledger. Please try again.".to_string()
            }
            Self::SerializationError(error) => {
                tracing::error!(error = %error, "Serialization error");
                "Internal error".to_string()
            }
            Self::IoError(error) => {
                tracing::error!(error = %error, "IO error");
                "Internal error".to_string()
            }
            Self::PngError(error) => {
                tracing::error!(error = %error, "PNG encoding error");
                "Internal error".to_string()
            }
            Self::TryInitError(error) => {
                tracing::error!(error = %error, "TryInitError");
                "Internal error".to_string()
            }
        }
    }

    pub fn notice(&self) -> ErrorNotice {
        ErrorNotice {
            code: self.code(),
            kind: self.kind(),
            message: self.user_message(),
        }
    }
}

impl From<&AppError> for ErrorNotice {
    fn from(error: &AppError) -> Self {
        error.notice()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
