use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::{
    config::ChainParams,
    error::{AppError, Result},
    types::Address,
};

pub mod simulated;

pub use simulated::SimulatedWallet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("User rejected the request")]
    UserRejected,

    #[error("Chain {0} has not been added to the wallet")]
    UnknownChain(u64),

    #[error("Wallet provider error - {0}")]
    Provider(String),
}

impl From<WalletError> for AppError {
    fn from(error: WalletError) -> Self {
        AppError::ConnectionFailed(error.to_string())
    }
}

/// The user's injected wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request_accounts(&self) -> std::result::Result<Vec<Address>, WalletError>;

    async fn chain_id(&self) -> std::result::Result<u64, WalletError>;

    async fn switch_chain(&self, chain_id: u64) -> std::result::Result<(), WalletError>;

    async fn add_chain(&self, params: &ChainParams) -> std::result::Result<(), WalletError>;

    /// Account and chain change notifications, if the wallet emits them.
    fn events(&self) -> Option<broadcast::Receiver<WalletEvent>>;
}

/// Moves the wallet onto `params.chain_id`, adding the network first if the
/// wallet does not know it. Returns the chain the wallet ends up on.
pub async fn ensure_network(wallet: &dyn WalletProvider, params: &ChainParams) -> Result<u64> {
    let current = wallet.chain_id().await?;
    if current == params.chain_id {
        return Ok(current);
    }

    tracing::info!(
        current_chain = current,
        target_chain = params.chain_id,
        "Requesting network switch"
    );

    match wallet.switch_chain(params.chain_id).await {
        Ok(()) => {}
        Err(WalletError::UnknownChain(_)) => {
            tracing::info!(chain = %params.chain_name, chain_id = %params.chain_id_hex(), "Adding network to wallet");
            wallet.add_chain(params).await.map_err(|error| {
                tracing::error!(error = %error, chain = %params.chain_name, "Failed to add network");
                AppError::ConnectionFailed(format!(
                    "Failed to add {} to your wallet. Please add it manually.",
                    params.chain_name
                ))
            })?;
        }
        Err(error) => {
            tracing::error!(error = %error, chain = %params.chain_name, "Failed to switch network");
            return Err(AppError::ConnectionFailed(format!(
                "Failed to switch to {}. Please switch manually in your wallet.",
                params.chain_name
            )));
        }
    }

    let active = wallet.chain_id().await?;
    if active != params.chain_id {
        return Err(AppError::ConnectionFailed(format!(
            "Wallet is still on chain {active}, expected {}",
            params.chain_name
        )));
    }
    Ok(active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn account() -> Address {
        Address::parse("0xABCD").unwrap()
    }

    #[tokio::test]
    async fn matching_chain_needs_no_switch() {
        let params = Config::default().network.chain;
        let wallet = SimulatedWallet::new(vec![account()], params.chain_id);
        assert_eq!(ensure_network(&wallet, &params).await.unwrap(), params.chain_id);
    }

    #[tokio::test]
    async fn switches_to_known_chain() {
        let params = Config::default().network.chain;
        let wallet = SimulatedWallet::new(vec![account()], 1).with_known_chains(&[params.chain_id]);
        assert_eq!(ensure_network(&wallet, &params).await.unwrap(), params.chain_id);
        assert_eq!(wallet.added_chains().await, Vec::<u64>::new());
    }

    #[tokio::test]
    async fn adds_unknown_chain_then_lands_on_it() {
        let params = Config::default().network.chain;
        let wallet = SimulatedWallet::new(vec![account()], 1);
        assert_eq!(ensure_network(&wallet, &params).await.unwrap(), params.chain_id);
        assert_eq!(wallet.added_chains().await, vec![params.chain_id]);
    }

    #[tokio::test]
    async fn declined_add_fails_connection() {
        let params = Config::default().network.chain;
        let wallet = SimulatedWallet::new(vec![account()], 1);
        wallet.set_declining_add(true);
        let err = ensure_network(&wallet, &params).await.unwrap_err();
        assert!(matches!(err, AppError::ConnectionFailed(msg) if msg.contains("add it manually")));
    }

    #[tokio::test]
    async fn declined_switch_fails_connection() {
        let params = Config::default().network.chain;
        let wallet = SimulatedWallet::new(vec![account()], 1).with_known_chains(&[params.chain_id]);
        wallet.set_rejecting(true);
        let err = ensure_network(&wallet, &params).await.unwrap_err();
        assert!(matches!(err, AppError::ConnectionFailed(msg) if msg.contains("switch manually")));
    }
}
