use std::{fmt, future::Future, time::Duration};

use futures::future::BoxFuture;

use crate::{
    error::{AppError, Result},
    services::ledger::types::{TransportError, TransportResult},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub hash: String,
}

/// A submitted transaction. `wait` resolves once it is mined.
pub struct TransactionHandle {
    hash: String,
    confirmation: BoxFuture<'static, TransportResult<()>>,
}

impl TransactionHandle {
    pub fn new(
        hash: impl Into<String>,
        confirmation: impl Future<Output = TransportResult<()>> + Send + 'static,
    ) -> Self {
        Self {
            hash: hash.into(),
            confirmation: Box::pin(confirmation),
        }
    }

    /// Confirms after a fixed delay.
    pub fn simulated(delay: Duration) -> Self {
        Self::new(random_tx_hash(), async move {
            tokio::time::sleep(delay).await;
            Ok(())
        })
    }

    pub fn failed(error: TransportError) -> Self {
        Self::new(random_tx_hash(), async move { Err(error) })
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub async fn wait(self, timeout: Duration) -> Result<TransactionReceipt> {
        let hash = self.hash;
        match tokio::time::timeout(timeout, self.confirmation).await {
            Ok(Ok(())) => {
                tracing::debug!(tx_hash = %hash, "Transaction confirmed");
                Ok(TransactionReceipt { hash })
            }
            Ok(Err(error)) => {
                tracing::error!(tx_hash = %hash, error = %error, "Transaction failed");
                Err(error.into())
            }
            Err(_) => {
                tracing::error!(tx_hash = %hash, timeout_ms = timeout.as_millis() as u64, "Transaction confirmation timed out");
                Err(AppError::TransactionRejected(format!(
                    "Transaction {hash} not confirmed within {}s",
                    timeout.as_secs()
                )))
            }
        }
    }
}

impl fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

pub fn random_tx_hash() -> String {
    let bytes: [u8; 32] = rand::random();
    let hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("0x{hex}")
}
