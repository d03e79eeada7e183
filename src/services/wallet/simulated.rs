use std::{
    collections::HashSet,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use crate::{
    config::ChainParams,
    services::wallet::{WalletError, WalletEvent, WalletProvider},
    types::Address,
};

/// In-memory wallet with scripted accounts and networks.
pub struct SimulatedWallet {
    accounts: RwLock<Vec<Address>>,
    chain_id: AtomicU64,
    known_chains: RwLock<HashSet<u64>>,
    added_chains: RwLock<Vec<u64>>,
    rejecting: AtomicBool,
    declining_add: AtomicBool,
    events: broadcast::Sender<WalletEvent>,
}

impl SimulatedWallet {
    pub fn new(accounts: Vec<Address>, chain_id: u64) -> Self {
        const EVENT_BUFFER_SIZE: usize = 16;

        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            accounts: RwLock::new(accounts),
            chain_id: AtomicU64::new(chain_id),
            known_chains: RwLock::new(HashSet::from([chain_id])),
            added_chains: RwLock::new(Vec::new()),
            rejecting: AtomicBool::new(false),
            declining_add: AtomicBool::new(false),
            events,
        }
    }

    pub fn with_known_chains(self, chains: &[u64]) -> Self {
        let known = self.known_chains.into_inner();
        Self {
            known_chains: RwLock::new(known.into_iter().chain(chains.iter().copied()).collect()),
            ..self
        }
    }

    /// Makes every user-facing request fail as if the user declined it.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Makes `add_chain` fail as if the user declined adding the network.
    pub fn set_declining_add(&self, declining: bool) {
        self.declining_add.store(declining, Ordering::SeqCst);
    }

    pub async fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.write().await = accounts.clone();
        let _ = self.events.send(WalletEvent::AccountsChanged(accounts));
    }

    pub async fn added_chains(&self) -> Vec<u64> {
        self.added_chains.read().await.clone()
    }

    fn check_rejecting(&self) -> Result<(), WalletError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }
        Ok(())
    }

    fn set_chain(&self, chain_id: u64) {
        if self.chain_id.swap(chain_id, Ordering::SeqCst) != chain_id {
            let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
        }
    }
}

#[async_trait]
impl WalletProvider for SimulatedWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.check_rejecting()?;
        Ok(self.accounts.read().await.clone())
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        self.check_rejecting()?;
        if !self.known_chains.read().await.contains(&chain_id) {
            return Err(WalletError::UnknownChain(chain_id));
        }
        self.set_chain(chain_id);
        Ok(())
    }

    async fn add_chain(&self, params: &ChainParams) -> Result<(), WalletError> {
        self.check_rejecting()?;
        if self.declining_add.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }
        if params.rpc_urls.is_empty() {
            return Err(WalletError::Provider("rpcUrls must not be empty".into()));
        }
        self.known_chains.write().await.insert(params.chain_id);
        self.added_chains.write().await.push(params.chain_id);
        self.set_chain(params.chain_id);
        Ok(())
    }

    fn events(&self) -> Option<broadcast::Receiver<WalletEvent>> {
        Some(self.events.subscribe())
    }
}
